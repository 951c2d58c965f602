//! imagegen-gateway server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use imagegen_gateway::api;
use imagegen_gateway::app_state::AppState;
use imagegen_gateway::config::{GatewayConfig, GeneratorBackend, LogFormat, StorageBackend};
use imagegen_gateway::domain::EventBus;
use imagegen_gateway::generator::{ImageGenerator, PlaceholderGenerator, ReplicateGenerator};
use imagegen_gateway::persistence::{LedgerStore, MemoryLedgerStore, PostgresLedgerStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration; a missing credential aborts before anything binds
    let config = GatewayConfig::from_env().context("invalid configuration")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(addr = %config.listen_addr, "starting imagegen-gateway");

    // Build persistence layer
    let store: Arc<dyn LedgerStore> = match (config.storage, &config.database) {
        (StorageBackend::Postgres, Some(db)) => {
            let store = PostgresLedgerStore::connect(db).await?;
            store.migrate().await?;
            Arc::new(store)
        }
        (StorageBackend::Postgres, None) => anyhow::bail!("DATABASE_URL is not set"),
        (StorageBackend::Memory, _) => {
            tracing::warn!("using in-memory ledger store; balances are lost on restart");
            Arc::new(MemoryLedgerStore::new())
        }
    };

    // Build generator
    let generator: Arc<dyn ImageGenerator> = match (config.generator, &config.replicate) {
        (GeneratorBackend::Replicate, Some(settings)) => {
            tracing::info!(model = %settings.model, "using Replicate generator");
            Arc::new(ReplicateGenerator::new(settings.client_config())?)
        }
        (GeneratorBackend::Replicate, None) => anyhow::bail!("REPLICATE_API_KEY is not set"),
        (GeneratorBackend::Placeholder, _) => {
            tracing::warn!("using placeholder generator");
            Arc::new(PlaceholderGenerator::new())
        }
    };

    // Build application state and router
    let event_bus = EventBus::new(config.event_bus_capacity);
    let app_state = AppState::new(
        Arc::clone(&store),
        generator,
        config.rules.clone(),
        event_bus,
    );
    let app = api::build_app(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    tracing::info!("shutdown complete");
    Ok(())
}

/// Resolves on SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received SIGINT, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
