//! ZAP spider / active scan adapter

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::instrument;

use titan_common::{
    sanitize_output, InvokeOptions, ScanTarget, TitanError, TitanResult, ToolAdapter, ToolId,
};

use crate::client::ZapClient;
use crate::error::ZapError;
use crate::poll::{PollConfig, PollDriver, RemoteScan};

/// Which ZAP scan to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZapMode {
    /// Crawl only; returns discovered URLs.
    Spider,
    /// Attack scan; returns alerts.
    Active,
}

impl ZapMode {
    pub fn poll_config(&self) -> PollConfig {
        match self {
            ZapMode::Spider => PollConfig::SHALLOW,
            ZapMode::Active => PollConfig::DEEP,
        }
    }

    pub fn tool(&self) -> ToolId {
        match self {
            ZapMode::Spider => ToolId::ZapSpider,
            ZapMode::Active => ToolId::ZapActive,
        }
    }
}

impl fmt::Display for ZapMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ZapMode::Spider => "spider",
            ZapMode::Active => "active",
        })
    }
}

impl FromStr for ZapMode {
    type Err = TitanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spider" => Ok(ZapMode::Spider),
            "active" => Ok(ZapMode::Active),
            other => Err(TitanError::Validation(format!("unknown ZAP scan type: {}", other))),
        }
    }
}

struct ZapScan<'a> {
    client: &'a ZapClient,
    mode: ZapMode,
}

#[async_trait]
impl<'a> RemoteScan for ZapScan<'a> {
    type Item = Value;

    async fn start(&self, target: &str) -> Result<String, ZapError> {
        match self.mode {
            ZapMode::Spider => self.client.spider_scan(target).await,
            ZapMode::Active => self.client.active_scan(target).await,
        }
    }

    async fn status(&self, handle: &str) -> Result<u8, ZapError> {
        match self.mode {
            ZapMode::Spider => self.client.spider_status(handle).await,
            ZapMode::Active => self.client.active_status(handle).await,
        }
    }

    async fn results(&self, handle: &str, target: &str) -> Result<Vec<Value>, ZapError> {
        match self.mode {
            ZapMode::Spider => self.client.spider_results(handle).await,
            // active scan findings live in the alerts view, keyed by target
            ZapMode::Active => self.client.alerts(target).await,
        }
    }
}

/// Remote-polled adapter over one ZAP scan mode.
#[derive(Debug, Clone)]
pub struct ZapAdapter {
    client: ZapClient,
    mode: ZapMode,
    driver: PollDriver,
}

impl ZapAdapter {
    pub fn new(client: ZapClient, mode: ZapMode) -> Self {
        Self {
            client,
            mode,
            driver: PollDriver::new(mode.poll_config()),
        }
    }

    pub fn with_poll_config(mut self, config: PollConfig) -> Self {
        self.driver = PollDriver::new(config);
        self
    }

    pub fn mode(&self) -> ZapMode {
        self.mode
    }

    /// Run the scan and return the raw result list (best effort).
    #[instrument(skip(self, target), fields(mode = %self.mode, scan_target = %target))]
    pub async fn fetch(&self, target: &ScanTarget) -> TitanResult<Vec<Value>> {
        let scan = ZapScan {
            client: &self.client,
            mode: self.mode,
        };
        Ok(self.driver.run(&scan, target.as_str()).await?)
    }
}

#[async_trait]
impl ToolAdapter for ZapAdapter {
    fn tool(&self) -> ToolId {
        self.mode.tool()
    }

    async fn invoke(&self, target: &ScanTarget, _options: &InvokeOptions) -> TitanResult<String> {
        let results = self.fetch(target).await?;
        let rendered = serde_json::to_string_pretty(&results)
            .map_err(|e| TitanError::Remote(format!("cannot render ZAP results: {}", e)))?;
        Ok(sanitize_output(&rendered))
    }
}
