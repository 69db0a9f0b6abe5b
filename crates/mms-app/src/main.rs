//! Market-map sync - Entry Point
//!
//! Simulate mode: build and sign upsert transactions, print them
//! Dispatch mode: submit them in order, waiting for each to be included

use anyhow::Result;
use clap::Parser;
use mms_app::{AppConfig, Application, Components, OperatingMode};
use mms_dispatch::SignerRegistry;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Reconcile a generated market map with the chain and upsert the difference
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via MMS_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Print signed transactions instead of submitting them
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    mms_telemetry::init_logging()?;

    info!("Starting mms v{}", env!("CARGO_PKG_VERSION"));

    // CLI arg > MMS_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("MMS_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");

    let mut config = AppConfig::from_file(&config_path)?;
    if args.dry_run {
        config.mode = OperatingMode::Simulate;
    }
    config.validate()?;
    info!(
        mode = ?config.mode,
        chain_id = %config.chain.chain_id,
        signer = %config.dispatch.signing.signer_type,
        "Configuration loaded"
    );

    let signers = SignerRegistry::with_defaults();
    let components = Components::from_config(&config, &signers)?;
    let app = Application::new(config, components);

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Shutdown signal received");
            shutdown.cancel();
        }
    });

    let report = app.run(&cancel).await?;

    if app.config().is_simulate_mode() {
        for tx in &report.txs {
            let printed = serde_json::json!({
                "tx": tx.tx,
                "tx_bytes": tx.encoded(),
            });
            println!("{}", serde_json::to_string_pretty(&printed)?);
        }
    }

    info!(
        upserts = report.upserts.len(),
        removals = report.removals.len(),
        txs = report.txs.len(),
        "Run complete"
    );
    Ok(())
}
