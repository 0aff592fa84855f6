//! Quoter - Entry Point
//!
//! Runs the ladder market-making strategy against the paper exchange,
//! optionally fed by a JSON-lines replay file.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Single-instrument ladder market maker
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via QUOTER_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// JSON-lines file of market updates to replay
    #[arg(short, long)]
    replay: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    quoter_telemetry::init_logging()?;

    info!("Starting quoter v{}", env!("CARGO_PKG_VERSION"));

    // CLI arg > QUOTER_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("QUOTER_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");
    let mut config = quoter_bot::AppConfig::from_file(&config_path)?;
    if let Some(replay) = args.replay {
        config.replay.path = Some(replay);
    }
    info!(
        instrument = %config.strategy.instrument_name,
        tick_interval_ms = config.tick_interval_ms,
        replay = ?config.replay.path,
        "Configuration loaded"
    );

    let app = quoter_bot::Application::new(config)?;
    let summary = app.run().await?;

    info!(?summary, "Exiting");
    Ok(())
}
