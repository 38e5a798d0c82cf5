//! fairmm entry point.

use anyhow::Result;
use clap::Parser;
use fairmm_telemetry::Metrics;
use tracing::{debug, info};

/// Fair-price perpetual market maker
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via FAIRMM_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Must run before any WS connection
    fairmm_feed::init_crypto();

    let args = Args::parse();

    fairmm_telemetry::init_logging()?;

    info!("Starting fairmm v{}", env!("CARGO_PKG_VERSION"));

    // CLI arg > FAIRMM_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("FAIRMM_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");

    let config = fairmm_bot::AppConfig::from_file(&config_path)?;
    info!(
        exchange = %config.exchange,
        symbol = %config.symbol,
        price_source = %config.price_source,
        "Configuration loaded"
    );

    let app = fairmm_bot::Application::new(config)?;
    let result = app.run().await;

    if let Ok(text) = Metrics::render() {
        debug!(metrics = %text, "Final metrics");
    }

    result?;
    Ok(())
}
