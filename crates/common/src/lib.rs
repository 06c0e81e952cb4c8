//! Titan Common - Shared types, traits and errors
//!
//! This crate provides the data model, error taxonomy and collaborator
//! traits used across the Titan scan orchestration engine.

pub mod error;
pub mod sanitize;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{TitanError, TitanResult};
pub use sanitize::sanitize_output;
pub use traits::{CommandRunner, InsightAnalyzer, NullAnalyzer, ScanStore, ToolAdapter};
pub use types::{
    CommandInvocation, Finding, Insights, InvokeOptions, JobState, ProgressSnapshot, ScanJob,
    ScanRecord, ScanSummary, ScanTarget, Severity, ToolId, ToolInvocationResult, ToolKind,
    ToolOutcome, DEFAULT_COMMAND_TIMEOUT, DEFAULT_MAX_OUTPUT_BYTES,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
