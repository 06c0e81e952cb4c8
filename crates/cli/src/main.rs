mod args;
mod output;
mod runner;

use anyhow::Result;
use clap::Parser;
use std::time::Duration;

use args::{Cli, Commands};
use runner::App;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    titan_telemetry::init_logging(cli.verbose, cli.json_logs);

    let app = App::from_cli(&cli).await?;
    match &cli.command {
        Commands::Scan { tool, target, poll_ms } => {
            app.scan(tool, target, Duration::from_millis(*poll_ms)).await?
        }
        Commands::Run { target, tools } => app.run(target, tools).await?,
        Commands::Zap { target, mode } => app.zap(target, mode).await?,
        Commands::History { limit } => app.history(*limit).await?,
        Commands::Show { id } => app.show(*id).await?,
        Commands::Tools => app.tools(),
    }

    Ok(())
}
