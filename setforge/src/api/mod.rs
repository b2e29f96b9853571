//! HTTP API handlers for setforge
//!
//! Every failure is returned as `{"error": "<message>"}` with a status code
//! derived from the error kind.

pub mod analyze;
pub mod export;
pub mod health;
pub mod sessions;
pub mod sse;
pub mod upload;

pub use health::health_routes;
pub use sse::event_stream;

use axum::routing::{get, post};
use axum::Router;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::SessionId;
use crate::AppState;

/// Session lifecycle routes
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(sessions::create_session))
        .route("/sessions/:session_id", get(sessions::get_session))
        .route("/cleanup/:session_id", post(sessions::cleanup_session))
}

/// Upload, analyze, export and download routes
pub fn pipeline_routes() -> Router<AppState> {
    Router::new()
        .route("/upload/:session_id", post(upload::upload_tracks))
        .route(
            "/analyze/:session_id",
            get(analyze::analyze_session).post(analyze::analyze_session),
        )
        .route("/export/:session_id", post(export::export_playlist))
        .route("/download/:folder", get(export::download_archive))
}

/// Parse a session id path segment
///
/// Extracting `Path<Uuid>` directly would answer malformed ids with axum's
/// plain-text rejection instead of the JSON error body.
pub(crate) fn parse_session_id(raw: &str) -> Result<SessionId, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid session id: {}", raw)))
}
