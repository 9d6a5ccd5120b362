//! Live Dashboard CLI
//!
//! Command-line interface for the live measurements dashboard.

use std::path::PathBuf;

use clap::Parser;
use live_dashboard::{load_config, Config};
use tracing::Level;

#[derive(Parser)]
#[command(name = "live-dashboard")]
#[command(about = "Live dashboard for a Supabase measurements table")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dashboard port (overrides config file)
    #[arg(long)]
    dashboard_port: Option<u16>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    tracing::debug!(
        "Parsed command line arguments: config={:?}, dashboard_port={:?}, log_level={:?}",
        args.config,
        args.dashboard_port,
        args.log_level
    );

    let mut config = if let Some(config_path) = &args.config {
        tracing::debug!("Loading configuration from {:?}", config_path);
        load_config(config_path)?
    } else {
        tracing::debug!("Using default configuration");
        Config::default()
    };

    if let Some(dashboard_port) = args.dashboard_port {
        config.dashboard.port = dashboard_port;
    }

    tracing::info!("Starting live dashboard");
    tracing::debug!(
        "Table: {}, snapshot limit: {}, view capacity: {}",
        config.table.qualified_name(),
        config.table.snapshot_limit,
        config.table.view_capacity
    );

    live_dashboard::run(config).await?;

    Ok(())
}
