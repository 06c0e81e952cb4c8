//! Orchestrator configuration

use std::time::Duration;

use titan_common::{InvokeOptions, DEFAULT_COMMAND_TIMEOUT, DEFAULT_MAX_OUTPUT_BYTES};
use titan_tool_zap::DEFAULT_ZAP_API;

use crate::progress::RetentionPolicy;

/// Fixed request quota per client and window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(15 * 60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub command_timeout: Duration,
    pub max_output_bytes: usize,
    pub retention: RetentionPolicy,
    pub sweep_interval: Duration,
    pub rate_limit: RateLimitConfig,
    pub zap_base_url: String,
}

impl OrchestratorConfig {
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn with_max_output_bytes(mut self, limit: usize) -> Self {
        self.max_output_bytes = limit;
        self
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn with_zap_base_url(mut self, url: impl Into<String>) -> Self {
        self.zap_base_url = url.into();
        self
    }

    /// Per-invocation limits handed to every adapter.
    #[must_use]
    pub fn invoke_options(&self) -> InvokeOptions {
        InvokeOptions {
            timeout: self.command_timeout,
            max_output_bytes: self.max_output_bytes,
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            retention: RetentionPolicy::default(),
            sweep_interval: Duration::from_secs(60),
            rate_limit: RateLimitConfig::default(),
            zap_base_url: DEFAULT_ZAP_API.to_string(),
        }
    }
}
