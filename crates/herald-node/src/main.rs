//! # Herald Node
//!
//! Entry point for the Herald admin broadcast service.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use herald_node::{build_gateway, load_config, DryRunSender};
use herald_telemetry::{init_telemetry, TelemetryConfig};

#[tokio::main]
async fn main() -> Result<()> {
    init_telemetry(&TelemetryConfig::from_env()).context("initializing telemetry")?;

    let config = load_config()?;

    info!("===========================================");
    info!("  Herald Node v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let gateway = build_gateway(&config, Arc::new(DryRunSender::new()))?;

    gateway
        .start(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            }
            info!("Shutdown signal received");
        })
        .await
        .context("admin gateway")?;

    Ok(())
}
