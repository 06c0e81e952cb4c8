use clap::{Parser, Subcommand};

use titan_storage::DEFAULT_DATABASE_URL;
use titan_tool_zap::DEFAULT_ZAP_API;

#[derive(Parser)]
#[command(name = "titan")]
#[command(version)]
#[command(about = "Security scan orchestration engine", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Scan store location
    #[arg(long, global = true, env = "TITAN_DB", default_value = DEFAULT_DATABASE_URL)]
    pub db: String,

    /// ZAP API base URL
    #[arg(long, global = true, env = "ZAP_API", default_value = DEFAULT_ZAP_API)]
    pub zap_api: String,

    /// ZAP API key, if the instance requires one
    #[arg(long, global = true, env = "ZAP_API_KEY", hide_env_values = true)]
    pub zap_api_key: Option<String>,

    /// Output format
    #[arg(short, long, global = true, default_value = "text", value_parser = ["text", "json"])]
    pub output: String,

    /// Per-tool timeout in seconds
    #[arg(long, global = true, default_value = "600")]
    pub timeout: u64,

    /// Run privileged tools (nmap) without `sudo -n`
    #[arg(long, global = true)]
    pub no_sudo: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start one tool as a tracked job and follow its progress
    Scan {
        /// Tool id, e.g. nikto, nuclei, nmap-sV
        #[arg(long)]
        tool: String,

        /// Target URL (http:// or https://)
        #[arg(short = 't', long)]
        target: String,

        /// Progress poll interval in milliseconds
        #[arg(long, default_value = "1000")]
        poll_ms: u64,
    },
    /// Run several tools in sequence and store the combined result
    Run {
        #[arg(short = 't', long)]
        target: String,

        /// Comma-separated tool ids
        #[arg(long, value_delimiter = ',', required = true)]
        tools: Vec<String>,
    },
    /// Run a ZAP spider or active scan directly
    Zap {
        #[arg(short = 't', long)]
        target: String,

        #[arg(long, default_value = "spider", value_parser = ["spider", "active"])]
        mode: String,
    },
    /// List stored scans, newest first
    History {
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },
    /// Show one stored scan
    Show { id: i64 },
    /// List available tools
    Tools,
}
