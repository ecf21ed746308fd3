use anyhow::Context;
use clap::Parser;
use smc_signals::utils::init_from_config;
use smc_signals::{Config, OhlcvSeries, SignalOrchestrator};
use std::path::PathBuf;
use tracing::info;

/// Evaluate one symbol from a CSV of OHLCV bars and print the report as JSON
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// CSV with timestamp,open,high,low,close,volume rows
    #[arg(short, long)]
    input: PathBuf,

    /// Symbol the bars belong to
    #[arg(short, long)]
    symbol: String,

    /// TOML configuration (defaults to CONFIG_FILE / config/default.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::load()?,
    };
    init_from_config(&config.logging)?;
    info!(environment = %config.general.environment, feature_set = %config.features.feature_set, "Configuration loaded");

    let series = OhlcvSeries::from_csv_path(&args.input)
        .with_context(|| format!("reading bars from {}", args.input.display()))?;
    info!(symbol = %args.symbol, rows = series.len(), "Bars loaded");

    let orchestrator = SignalOrchestrator::from_config(&config)?;
    let report = orchestrator.evaluate(&args.symbol, &series)?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
