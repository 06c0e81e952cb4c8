//! Telemetry - logging setup and metric names
//!
//! Metrics go through the `metrics` facade; without an installed recorder
//! the calls are no-ops.

use tracing_subscriber::{fmt, EnvFilter};

pub const JOBS_TOTAL: &str = "titan_jobs_total";
pub const TOOL_INVOCATIONS_TOTAL: &str = "titan_tool_invocations_total";
pub const REMOTE_POLLS_TOTAL: &str = "titan_remote_polls_total";

/// Initialise the global tracing subscriber.
///
/// `RUST_LOG` wins over the verbosity flag when set.
pub fn init_logging(verbose: u8, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for(verbose)));

    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    // try_init: tests and embedders may already have a subscriber installed
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };
}

fn level_for(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// A job reached a terminal state ("done" or "error").
pub fn record_job_finished(state: &'static str) {
    metrics::counter!(JOBS_TOTAL, "state" => state).increment(1);
}

/// One tool invocation finished.
pub fn record_tool_invocation(tool: &'static str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!(TOOL_INVOCATIONS_TOTAL, "tool" => tool, "outcome" => outcome).increment(1);
}

/// One status poll against a remote scanner.
pub fn record_remote_poll() {
    metrics::counter!(REMOTE_POLLS_TOTAL).increment(1);
}
