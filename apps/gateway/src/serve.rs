//! Gateway serve entrypoint — used by the binary and by tests.

use crate::config::GatewayConfig;
use crate::policy::PolicyGuard;
use crate::retrieval::Retriever;
use crate::state::{AppState, GatewayEngine};
use anyhow::{Context, Result, bail};
use ocore::Registry;
use runtime::Engine;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Handle returned by [`serve`] — holds the bound port and shutdown
/// trigger.
pub struct ServeHandle {
    /// The port the gateway is listening on.
    pub port: u16,
    /// Send a value to trigger graceful shutdown.
    shutdown_tx: Option<oneshot::Sender<()>>,
    /// Join handle for the server task.
    join: Option<tokio::task::JoinHandle<Result<(), std::io::Error>>>,
}

impl ServeHandle {
    /// Trigger graceful shutdown and wait for the server to stop.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(join) = self.join.take() {
            join.await??;
        }
        Ok(())
    }
}

/// Build the engine from config.
pub fn build_engine(config: &GatewayConfig) -> Result<GatewayEngine> {
    if config.providers.is_empty() {
        bail!("at least one provider entry is required");
    }

    let client = reqwest::Client::new();
    let default = &config.providers[0];
    let mut registry = Registry::new(
        default.name(),
        provider::build_provider(&default.config, client.clone())
            .with_context(|| format!("failed to build provider '{}'", default.name()))?,
    );
    for entry in &config.providers[1..] {
        registry = registry.with(
            entry.name(),
            provider::build_provider(&entry.config, client.clone())
                .with_context(|| format!("failed to build provider '{}'", entry.name()))?,
        );
    }

    let catalog = config.catalog()?;
    let guardrail = PolicyGuard::from_url(client.clone(), &config.guardrail.url);
    let retriever = Retriever::from_url(client, &config.retrieval.url);

    Ok(Engine::new(
        registry,
        catalog,
        config.selection.analysis_model.clone(),
        guardrail,
    )
    .with_augmenter(retriever))
}

/// Build the engine, bind the axum server, and start serving.
///
/// The server runs in a spawned task — call `handle.shutdown()` to stop
/// it.
pub async fn serve(config: &GatewayConfig) -> Result<ServeHandle> {
    let engine = build_engine(config)?;
    let state = AppState {
        engine: Arc::new(engine),
        webhook_secret: Arc::from(config.webhook.secret.as_str()),
    };

    let app = crate::api::router(state);
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    let port = listener.local_addr()?.port();
    tracing::info!("gateway listening on {} (port {port})", config.server.bind);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let join = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("received shutdown signal");
            })
            .await
    });

    Ok(ServeHandle {
        port,
        shutdown_tx: Some(shutdown_tx),
        join: Some(join),
    })
}
