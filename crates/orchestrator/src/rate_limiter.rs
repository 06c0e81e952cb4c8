//! Per-client request quota

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use titan_common::{TitanError, TitanResult};

use crate::config::RateLimitConfig;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

impl Window {
    fn elapsed(&self, window: Duration, now: Instant) -> bool {
        now.duration_since(self.started) >= window
    }
}

/// Fixed-window counter: each client gets `max_requests` per `window`,
/// counted from its first request in that window.
pub struct ClientRateLimiter {
    windows: DashMap<String, Window>,
    config: RateLimitConfig,
}

impl ClientRateLimiter {
    pub fn new(config: RateLimitConfig) -> TitanResult<Self> {
        if config.max_requests == 0 {
            return Err(TitanError::Config(
                "rate limit must allow at least one request".into(),
            ));
        }
        if config.window.is_zero() {
            return Err(TitanError::Config("rate limit window must be non-zero".into()));
        }
        Ok(Self {
            windows: DashMap::new(),
            config,
        })
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Consume one request for `client`.
    pub fn check(&self, client: &str) -> TitanResult<()> {
        let now = Instant::now();
        let mut slot = self.windows.entry(client.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if slot.elapsed(self.config.window, now) {
            *slot = Window {
                started: now,
                count: 0,
            };
        }
        if slot.count >= self.config.max_requests {
            drop(slot);
            warn!(client, "rate limit exceeded");
            return Err(TitanError::RateLimitExceeded);
        }
        slot.count += 1;
        Ok(())
    }

    /// Forget clients whose window has run out; returns how many were dropped.
    pub fn retain_recent(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows
            .retain(|_, w| !w.elapsed(self.config.window, now));
        before.saturating_sub(self.windows.len())
    }

    /// Run [`retain_recent`](Self::retain_recent) every `interval`.
    pub fn spawn_pruner(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let limiter = Arc::downgrade(&self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(limiter) = limiter.upgrade() else {
                    break;
                };
                let dropped = limiter.retain_recent();
                if dropped > 0 {
                    debug!(dropped, "pruned idle rate limit clients");
                }
            }
        })
    }

    #[inline]
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}
