//! Bounded polling of asynchronous remote scans
//!
//! Remote scanners hand back a scan handle, expose a completion percentage
//! and finally a result list. The driver never fails because it ran out of
//! attempts: it fetches whatever the scanner holds at that point.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::ZapError;

/// One remote scan flavour: how to start it, watch it and collect it.
#[async_trait]
pub trait RemoteScan: Send + Sync {
    type Item: Send;

    /// Start a scan and return the remote-assigned handle.
    async fn start(&self, target: &str) -> Result<String, ZapError>;

    /// Completion percentage (0-100) for a running scan.
    async fn status(&self, handle: &str) -> Result<u8, ZapError>;

    /// Results held by the scanner right now; may be partial or empty.
    async fn results(&self, handle: &str, target: &str) -> Result<Vec<Self::Item>, ZapError>;
}

/// Poll cadence and ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollConfig {
    /// Fast/shallow scans (spider): ~20s ceiling.
    pub const SHALLOW: PollConfig = PollConfig {
        interval: Duration::from_secs(1),
        max_attempts: 20,
    };

    /// Slow/deep scans (active): ~120s ceiling.
    pub const DEEP: PollConfig = PollConfig {
        interval: Duration::from_secs(2),
        max_attempts: 60,
    };

    /// Upper bound on time spent polling.
    pub fn ceiling(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

/// Transient state of one driver run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollState {
    pub handle: String,
    pub attempts: u32,
    pub last_percent: u8,
}

impl PollState {
    fn new(handle: String) -> Self {
        Self {
            handle,
            attempts: 0,
            last_percent: 0,
        }
    }

    fn finished(&self) -> bool {
        self.last_percent >= 100
    }
}

/// Start → poll → fetch state machine.
#[derive(Debug, Clone, Copy)]
pub struct PollDriver {
    config: PollConfig,
}

impl PollDriver {
    pub fn new(config: PollConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> PollConfig {
        self.config
    }

    #[instrument(skip(self, scan), fields(max_attempts = self.config.max_attempts))]
    pub async fn run<S: RemoteScan>(&self, scan: &S, target: &str) -> Result<Vec<S::Item>, ZapError> {
        let handle = scan.start(target).await?;
        let mut state = PollState::new(handle);
        debug!(handle = %state.handle, "remote scan started");

        while !state.finished() && state.attempts < self.config.max_attempts {
            tokio::time::sleep(self.config.interval).await;
            state.attempts += 1;
            titan_telemetry::record_remote_poll();

            match scan.status(&state.handle).await {
                Ok(percent) => state.last_percent = percent.min(100),
                // a failed status call uses up an attempt; keep polling
                Err(e) => warn!(handle = %state.handle, attempt = state.attempts, error = %e, "status poll failed"),
            }
        }

        if state.finished() {
            debug!(handle = %state.handle, attempts = state.attempts, "remote scan complete");
        } else {
            info!(
                handle = %state.handle,
                attempts = state.attempts,
                percent = state.last_percent,
                "remote scan still running, fetching partial results"
            );
        }

        scan.results(&state.handle, target).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Reports `percents[i]` on the i-th status call, then repeats the last one.
    struct ScriptedScan {
        percents: Vec<Result<u8, ()>>,
        status_calls: AtomicU32,
        results_calls: AtomicU32,
        fail_start: bool,
    }

    impl ScriptedScan {
        fn new(percents: Vec<Result<u8, ()>>) -> Self {
            Self {
                percents,
                status_calls: AtomicU32::new(0),
                results_calls: AtomicU32::new(0),
                fail_start: false,
            }
        }
    }

    #[async_trait]
    impl RemoteScan for ScriptedScan {
        type Item = String;

        async fn start(&self, _target: &str) -> Result<String, ZapError> {
            if self.fail_start {
                return Err(ZapError::Malformed("no scan id".into()));
            }
            Ok("42".to_string())
        }

        async fn status(&self, handle: &str) -> Result<u8, ZapError> {
            assert_eq!(handle, "42");
            let n = self.status_calls.fetch_add(1, Ordering::SeqCst) as usize;
            let step = self.percents.get(n).or_else(|| self.percents.last()).cloned().unwrap_or(Ok(0));
            step.map_err(|_| ZapError::Api { status: 500, body: "busy".into() })
        }

        async fn results(&self, _handle: &str, target: &str) -> Result<Vec<String>, ZapError> {
            self.results_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![format!("{target}/partial")])
        }
    }

    fn fast(max_attempts: u32) -> PollDriver {
        PollDriver::new(PollConfig {
            interval: Duration::from_millis(1),
            max_attempts,
        })
    }

    #[tokio::test]
    async fn exhausts_attempts_then_fetches_best_effort() {
        let scan = ScriptedScan::new(vec![Ok(40)]);
        let results = fast(20).run(&scan, "https://example.com").await.unwrap();

        assert_eq!(scan.status_calls.load(Ordering::SeqCst), 20);
        assert_eq!(scan.results_calls.load(Ordering::SeqCst), 1);
        assert_eq!(results, vec!["https://example.com/partial".to_string()]);
    }

    #[tokio::test]
    async fn stops_polling_at_completion() {
        let scan = ScriptedScan::new(vec![Ok(10), Ok(60), Ok(100)]);
        fast(20).run(&scan, "https://example.com").await.unwrap();
        assert_eq!(scan.status_calls.load(Ordering::SeqCst), 3);
        assert_eq!(scan.results_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn status_errors_consume_attempts() {
        let scan = ScriptedScan::new(vec![Err(()), Err(()), Ok(100)]);
        fast(5).run(&scan, "https://example.com").await.unwrap();
        assert_eq!(scan.status_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn start_failure_is_an_error() {
        let mut scan = ScriptedScan::new(vec![Ok(100)]);
        scan.fail_start = true;
        assert!(fast(5).run(&scan, "https://example.com").await.is_err());
        assert_eq!(scan.status_calls.load(Ordering::SeqCst), 0);
        assert_eq!(scan.results_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn preset_ceilings() {
        assert_eq!(PollConfig::SHALLOW.ceiling(), Duration::from_secs(20));
        assert_eq!(PollConfig::DEEP.ceiling(), Duration::from_secs(120));
    }
}
