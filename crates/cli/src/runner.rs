use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use titan_common::{ToolId, ToolKind};
use titan_insights::HeuristicAnalyzer;
use titan_orchestrator::{
    ClientRateLimiter, Orchestrator, OrchestratorConfig, ProgressStore, ScanGateway, ToolRegistry,
};
use titan_storage::SqliteScanStore;
use titan_tool_local::TokioCommandRunner;
use titan_tool_zap::{ZapClient, ZapMode};

use crate::args::Cli;
use crate::output::{self, Format};

/// Rate-limit key for requests made from this process.
const CLI_CLIENT: &str = "cli";

pub struct App {
    gateway: ScanGateway,
    format: Format,
}

impl App {
    pub async fn from_cli(cli: &Cli) -> Result<Self> {
        let config = OrchestratorConfig::default()
            .with_command_timeout(Duration::from_secs(cli.timeout))
            .with_zap_base_url(cli.zap_api.clone());

        let mut zap = ZapClient::new(config.zap_base_url.clone()).context("Failed to build ZAP client")?;
        if let Some(key) = &cli.zap_api_key {
            zap = zap.with_api_key(key.clone());
        }
        let registry = ToolRegistry::standard(Arc::new(TokioCommandRunner::new()), zap, !cli.no_sudo);

        let store = SqliteScanStore::connect(&cli.db).await?;
        let progress = Arc::new(ProgressStore::new(config.retention));
        progress.clone().spawn_sweeper(config.sweep_interval);

        let orchestrator = Orchestrator::new(
            registry,
            progress,
            Arc::new(HeuristicAnalyzer::new()),
            Arc::new(store),
            &config,
        );
        let limiter = Arc::new(ClientRateLimiter::new(config.rate_limit)?);
        limiter.clone().spawn_pruner(config.sweep_interval);

        Ok(Self {
            gateway: ScanGateway::new(orchestrator, limiter),
            format: Format::parse(&cli.output),
        })
    }

    /// Start a job and print every new snapshot until it finishes.
    pub async fn scan(&self, tool: &str, target: &str, poll: Duration) -> Result<()> {
        let id = self.gateway.start_scan(CLI_CLIENT, tool, target)?;
        info!(job_id = %id, tool, target, "scan started");

        let mut last = None;
        let snapshot = loop {
            let snapshot = self
                .gateway
                .progress(id)
                .ok_or_else(|| anyhow!("job {} disappeared", id))?;
            if last.as_ref() != Some(&snapshot) {
                if self.format == Format::Text {
                    eprintln!("{}", output::render_progress(&snapshot));
                }
                last = Some(snapshot.clone());
            }
            if snapshot.is_terminal() {
                break snapshot;
            }
            tokio::time::sleep(poll).await;
        };

        print!("{}", output::render_job(&snapshot, self.format)?);
        match snapshot.error {
            Some(error) => Err(anyhow!(error)),
            None => Ok(()),
        }
    }

    pub async fn run(&self, target: &str, tools: &[String]) -> Result<()> {
        let report = self.gateway.run_scans(CLI_CLIENT, target, tools).await?;
        print!("{}", output::render_report(&report, self.format)?);
        Ok(())
    }

    pub async fn zap(&self, target: &str, mode: &str) -> Result<()> {
        let mode: ZapMode = mode.parse()?;
        let report = self.gateway.zap_scan(CLI_CLIENT, target, mode).await?;
        print!("{}", output::render_zap(&report, self.format)?);
        Ok(())
    }

    pub async fn history(&self, limit: u32) -> Result<()> {
        let history = self.gateway.history(limit).await?;
        print!("{}", output::render_history(&history, self.format)?);
        Ok(())
    }

    pub async fn show(&self, id: i64) -> Result<()> {
        let record = self
            .gateway
            .scan_record(id)
            .await?
            .ok_or_else(|| anyhow!("Scan #{} not found", id))?;
        print!("{}", output::render_record(&record, self.format)?);
        Ok(())
    }

    pub fn tools(&self) {
        for tool in self.gateway.orchestrator().registry().tools() {
            println!("{:<18} {}", tool, kind_label(tool));
        }
    }
}

fn kind_label(tool: ToolId) -> &'static str {
    match tool.kind() {
        ToolKind::Local => "local",
        ToolKind::RemotePolled => "remote",
    }
}
