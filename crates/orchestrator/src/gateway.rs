//! Client-facing boundary: rate limiting in front of the orchestrator

use std::sync::Arc;
use uuid::Uuid;

use titan_common::{ProgressSnapshot, ScanRecord, ScanSummary, TitanResult};
use titan_tool_zap::ZapMode;

use crate::aggregate::{AggregateReport, ZapReport};
use crate::orchestrator::Orchestrator;
use crate::rate_limiter::ClientRateLimiter;

/// Scan-starting calls count against the caller's quota; reads do not.
pub struct ScanGateway {
    orchestrator: Orchestrator,
    limiter: Arc<ClientRateLimiter>,
}

impl ScanGateway {
    pub fn new(orchestrator: Orchestrator, limiter: Arc<ClientRateLimiter>) -> Self {
        Self { orchestrator, limiter }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn start_scan(&self, client: &str, tool: &str, target: &str) -> TitanResult<Uuid> {
        self.limiter.check(client)?;
        self.orchestrator.create_job(tool, target)
    }

    pub fn progress(&self, id: Uuid) -> Option<ProgressSnapshot> {
        self.orchestrator.progress(id)
    }

    pub async fn run_scans(&self, client: &str, target: &str, tools: &[String]) -> TitanResult<AggregateReport> {
        self.limiter.check(client)?;
        self.orchestrator.run_aggregate(target, tools).await
    }

    pub async fn zap_scan(&self, client: &str, target: &str, mode: ZapMode) -> TitanResult<ZapReport> {
        self.limiter.check(client)?;
        self.orchestrator.run_zap(target, mode).await
    }

    pub async fn history(&self, limit: u32) -> TitanResult<Vec<ScanSummary>> {
        self.orchestrator.history(limit).await
    }

    pub async fn scan_record(&self, id: i64) -> TitanResult<Option<ScanRecord>> {
        self.orchestrator.scan_record(id).await
    }
}
