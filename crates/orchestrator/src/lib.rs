//! Orchestrator - job lifecycle, progress tracking and aggregation
//!
//! - `Orchestrator`: async single-tool jobs, sequential multi-tool runs
//!   and direct ZAP scans
//! - `ProgressStore`: in-memory snapshots with bounded retention
//! - `ToolRegistry`: adapters keyed by `ToolId`
//! - `ScanGateway`: per-client rate limiting in front of it all

mod aggregate;
mod config;
mod gateway;
mod orchestrator;
mod progress;
mod rate_limiter;
mod registry;

pub use aggregate::{AggregateBuilder, AggregateReport, ZapReport};
pub use config::{OrchestratorConfig, RateLimitConfig};
pub use gateway::ScanGateway;
pub use orchestrator::Orchestrator;
pub use progress::{ProgressEvent, ProgressStore, RetentionPolicy};
pub use rate_limiter::ClientRateLimiter;
pub use registry::ToolRegistry;
