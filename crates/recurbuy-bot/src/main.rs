//! Recurring buy service - entry point.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Scheduled recurring crypto purchases with a management API.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via RECURBUY_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Execute a single run, print the report and exit
    #[arg(long)]
    run_once: bool,

    /// Simulate the brokerage; no order is ever sent
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Determine config path: CLI arg > RECURBUY_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("RECURBUY_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    let config = recurbuy_bot::AppConfig::load(&config_path)?;

    recurbuy_telemetry::init_logging(&config.telemetry.log_filter)?;
    info!("Starting recurbuy v{}", env!("CARGO_PKG_VERSION"));
    info!(
        config_path = %config_path,
        cron = %config.schedule.cron,
        quote_currency = %config.engine.quote_currency,
        api_enabled = config.api.enabled,
        "Configuration loaded"
    );

    let dry_run = args.dry_run || config.dry_run.enabled;
    let app = recurbuy_bot::Application::new(config, dry_run)?;

    if args.run_once {
        let report = app.run_once().await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    app.run().await?;

    Ok(())
}
