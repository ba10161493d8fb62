use anyhow::{Context, Result};
use clap::Parser;
use vmbatch_cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    vmbatch_monitoring::init(cli.monitoring_config())
        .context("Failed to initialize monitoring")?;

    let csv = cli.csv.clone();
    let result = vmbatch_cli::run(cli)
        .await
        .with_context(|| format!("Batch from {} aborted", csv.display()));

    vmbatch_monitoring::shutdown();

    // Per-record failures are reported, not fatal.
    result.map(|_| ())
}
