//! setforge library interface
//!
//! Exposes the application state and router for the binary and for
//! integration tests.

pub mod analysis;
pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult, PipelineError};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use setforge_common::events::EventBus;

use crate::analysis::AnalysisEngine;
use crate::config::ServiceConfig;
use crate::services::{
    AnalysisOrchestrator, PlaylistExporter, SessionManager, SessionReaper, TrackStore,
    UploadFilter, UploadIngestor,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionManager,
    pub upload_filter: Arc<UploadFilter>,
    pub ingestor: Arc<UploadIngestor>,
    pub orchestrator: Arc<AnalysisOrchestrator>,
    pub exporter: Arc<PlaylistExporter>,
    pub reaper: Arc<SessionReaper>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Wire the pipeline services around a track store and analysis engine
    pub fn new(
        config: &ServiceConfig,
        store: Arc<dyn TrackStore>,
        engine: Arc<dyn AnalysisEngine>,
        event_bus: EventBus,
    ) -> Self {
        let sessions = SessionManager::new(config.idle_timeout, event_bus.clone());

        let ingestor = UploadIngestor::new(sessions.clone(), Arc::clone(&store), event_bus.clone());
        let orchestrator = AnalysisOrchestrator::new(
            sessions.clone(),
            Arc::clone(&store),
            engine,
            event_bus.clone(),
            config.analysis_workers,
            config.analysis_timeout,
        );
        let exporter = Arc::new(PlaylistExporter::new(
            sessions.clone(),
            Arc::clone(&store),
            event_bus.clone(),
            config.layout().exports_dir(),
            config.export_order,
        ));
        let reaper = SessionReaper::new(
            sessions.clone(),
            store,
            Arc::clone(&exporter),
            event_bus.clone(),
        );

        Self {
            sessions,
            upload_filter: Arc::new(UploadFilter::new(&config.extensions)),
            ingestor: Arc::new(ingestor),
            orchestrator: Arc::new(orchestrator),
            exporter,
            reaper: Arc::new(reaper),
            event_bus,
            startup_time: Utc::now(),
            max_upload_bytes: config.max_upload_bytes,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    let body_limit = state.max_upload_bytes;

    Router::new()
        .merge(api::session_routes())
        .merge(api::pipeline_routes())
        .merge(api::health_routes())
        .route("/events", get(api::event_stream))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
