//! Error types for Titan
//!
//! One taxonomy shared by adapters, the orchestrator and the CLI.

use std::io;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TitanError {
    /// Bad or disallowed target. Raised before any job or adapter runs.
    #[error("Invalid target: {0}")]
    Validation(String),

    #[error("Command timed out after {}s", .after.as_secs())]
    AdapterTimeout { after: Duration },

    /// Tool produced nothing usable and its empty policy treats that as failure.
    #[error("{0}")]
    EmptyResult(String),

    #[error("Unknown tool selected: {0}")]
    UnknownTool(String),

    /// Aggregate mode only: one entry per requested tool.
    #[error("All scans failed: {}", .0.join("; "))]
    AllToolsFailed(Vec<String>),

    #[error("Command failed: {0}")]
    Command(String),

    #[error("Output exceeded the {limit} byte capture limit")]
    OutputTooLarge { limit: usize },

    #[error("Remote scanner error: {0}")]
    Remote(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Too many scan requests, please try again later")]
    RateLimitExceeded,
}

impl TitanError {
    /// Errors a caller caused, as opposed to failures of the scan itself.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TitanError::Validation(_) | TitanError::UnknownTool(_) | TitanError::RateLimitExceeded
        )
    }
}

/// Result type alias for Titan operations
pub type TitanResult<T> = Result<T, TitanError>;
