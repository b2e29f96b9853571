//! setforge - DJ set preparation service
//!
//! Upload a folder of tracks, analyze tempo, key and energy, then download
//! the ordered playlist as a ZIP archive.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use setforge::analysis::SignalEngine;
use setforge::config::{Cli, ServiceConfig};
use setforge::services::FsTrackStore;
use setforge::{build_router, AppState};
use setforge_common::events::EventBus;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ServiceConfig::resolve(&cli).context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("setforge={0},setforge_common={0},tower_http=info", config.log_level).into()
            }),
        )
        .init();

    // Build identification first, before any filesystem work
    info!(
        "Starting setforge v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let layout = config.layout();
    layout
        .ensure_directory_exists()
        .map_err(|e| anyhow::anyhow!("Failed to initialize root folder: {}", e))?;
    info!("Root folder: {}", layout.root_folder().display());

    let event_bus = EventBus::new(256);
    let store = Arc::new(FsTrackStore::new(layout.sessions_dir()));
    let engine = Arc::new(SignalEngine::new());

    let state = AppState::new(&config, store, engine, event_bus);
    info!(
        workers = config.analysis_workers,
        timeout_seconds = config.analysis_timeout.as_secs(),
        idle_timeout_seconds = config.idle_timeout.as_secs(),
        order = ?config.export_order,
        "Pipeline configured"
    );

    let shutdown = CancellationToken::new();
    let reaper = Arc::clone(&state.reaper).spawn(config.reap_interval, shutdown.clone());

    let app = build_router(state);

    let address = config.listen_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Listening on http://{}", address);
    info!("Health check: http://{}/health", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown.cancel();
    let _ = reaper.await;
    info!("setforge stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
