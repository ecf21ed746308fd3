use anyhow::Context;
use clap::Parser;
use smc_signals::utils::init_from_config;
use smc_signals::{Config, OhlcvSeries, RadarScanner, SnapshotStore};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Scan the watch-list from `<data-dir>/<SYMBOL>.csv` files and print the
/// resulting snapshot as JSON
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding one CSV per watch-list symbol
    #[arg(short, long)]
    data_dir: PathBuf,

    /// TOML configuration (defaults to CONFIG_FILE / config/default.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::load()?,
    };
    init_from_config(&config.logging)?;

    let scanner = RadarScanner::from_config(&config.scan);
    let store = SnapshotStore::new();
    let pacing = Duration::from_millis(config.scan.pacing_ms);

    info!(symbols = config.scan.watchlist.len(), data_dir = %args.data_dir.display(), "Scanning market");

    let mut entries = Vec::new();
    for (i, symbol) in config.scan.watchlist.iter().enumerate() {
        if i > 0 && !pacing.is_zero() {
            tokio::time::sleep(pacing).await;
        }

        let path = args.data_dir.join(format!("{}.csv", symbol));
        let series = match OhlcvSeries::from_csv_path(&path) {
            Ok(series) => series,
            Err(e) => {
                warn!(symbol = %symbol, path = %path.display(), error = %e, "Skipping symbol");
                continue;
            }
        };

        match scanner.scan_symbol(symbol, &series) {
            Ok(Some(entry)) => {
                info!(symbol = %symbol, signal = %entry.signal, "Radar hit");
                entries.push(entry);
            }
            Ok(None) => {}
            Err(e) => warn!(symbol = %symbol, error = %e, "Scan failed for symbol"),
        }
    }

    let snapshot = store.publish(entries);
    println!("{}", serde_json::to_string_pretty(snapshot.as_ref())?);
    Ok(())
}
