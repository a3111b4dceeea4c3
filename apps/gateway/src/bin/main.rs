//! Orca gateway binary entry point.
//!
//! Loads TOML configuration, builds the provider registry and engine,
//! and runs the axum server with graceful shutdown on ctrl-c.

use anyhow::Result;
use orca_gateway::{GatewayConfig, serve};
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing from RUST_LOG (default: info).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration.
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "gateway.toml".to_string());
    let config = GatewayConfig::load(&config_path)?;
    tracing::info!("loaded configuration from {config_path}");

    let handle = serve(&config).await?;

    shutdown_signal().await;
    handle.shutdown().await?;
    tracing::info!("gateway shut down");
    Ok(())
}

/// Wait for ctrl-c signal for graceful shutdown.
async fn shutdown_signal() {
    signal::ctrl_c()
        .await
        .expect("failed to install ctrl-c handler");
    tracing::info!("received shutdown signal");
}
