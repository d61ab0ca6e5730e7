//! Sentinel signal admission and execution service - entry point.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Sentinel signal admission and execution service
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via SENTINEL_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    sentinel_bot::logging::init_logging();

    info!("Starting sentinel v{}", env!("CARGO_PKG_VERSION"));

    // Config path: CLI arg > SENTINEL_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("SENTINEL_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");
    let config = sentinel_bot::AppConfig::from_file(&config_path)?;

    let mut app = sentinel_bot::Application::new(config).await?;
    app.run().await?;

    Ok(())
}
