//! Core traits for Titan components
//!
//! Each external collaborator of the orchestrator sits behind one of these
//! seams so that the engine can be driven by real tools or by test doubles.

use crate::error::TitanResult;
use crate::types::{
    CommandInvocation, Insights, InvokeOptions, ScanRecord, ScanSummary, ScanTarget, ToolId,
};
use anyhow::Result;
use async_trait::async_trait;

/// Uniform interface over one scanning capability.
#[async_trait]
pub trait ToolAdapter: Send + Sync {
    /// Tool this adapter runs.
    fn tool(&self) -> ToolId;

    /// Run the tool against `target`, returning sanitized text output.
    async fn invoke(&self, target: &ScanTarget, options: &InvokeOptions) -> TitanResult<String>;
}

/// Command execution sink used by local adapters.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion within `options.timeout`, capturing at most
    /// `options.max_output_bytes` per stream. Returns stdout, or stderr when
    /// stdout is empty.
    async fn run(&self, command: &CommandInvocation, options: &InvokeOptions) -> TitanResult<String>;
}

/// Turns raw scan text into structured findings.
///
/// Callers must degrade errors to empty insights rather than fail a scan.
#[async_trait]
pub trait InsightAnalyzer: Send + Sync {
    async fn analyze(&self, raw: &str) -> Result<Insights>;
}

/// Persistence for finished aggregate scans.
#[async_trait]
pub trait ScanStore: Send + Sync {
    /// Store a scan and return its assigned record id.
    async fn save(&self, target: &str, raw_output: &str, metadata: &serde_json::Value) -> Result<i64>;

    /// Most recent scans first.
    async fn list_history(&self, limit: u32) -> Result<Vec<ScanSummary>>;

    async fn get_by_id(&self, id: i64) -> Result<Option<ScanRecord>>;
}

/// Analyzer that never finds anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAnalyzer;

#[async_trait]
impl InsightAnalyzer for NullAnalyzer {
    async fn analyze(&self, _raw: &str) -> Result<Insights> {
        Ok(Insights::default())
    }
}
