//! Session handlers
//!
//! POST /sessions, GET /sessions/{id}, POST /cleanup/{id}

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ApiResult;
use crate::models::{AnalysisProgress, SessionId, SessionState, Track};
use crate::AppState;

use super::parse_session_id;

/// POST /sessions response
#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: SessionId,
}

/// GET /sessions/{id} response
#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub session_id: SessionId,
    pub state: SessionState,
    pub tracks: Vec<Track>,
    pub progress: AnalysisProgress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

/// POST /cleanup/{id} response
#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub message: String,
}

/// POST /sessions
pub async fn create_session(State(state): State<AppState>) -> Json<CreateSessionResponse> {
    let session_id = state.sessions.create_session().await;
    Json(CreateSessionResponse { session_id })
}

/// GET /sessions/{id}
///
/// Snapshot for polling analysis progress.
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<SessionStatusResponse>> {
    let session_id = parse_session_id(&session_id)?;
    let session = state.sessions.get_session(session_id).await?;

    Ok(Json(SessionStatusResponse {
        session_id: session.session_id,
        state: session.state,
        folder: session.export.as_ref().map(|a| a.folder_id.clone()),
        tracks: session.tracks,
        progress: session.progress,
        created_at: session.created_at,
        last_activity: session.last_activity,
    }))
}

/// POST /cleanup/{id}
///
/// Releases stored tracks and any exported archive. Unknown ids succeed.
pub async fn cleanup_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<CleanupResponse>> {
    let session_id = parse_session_id(&session_id)?;
    let removed = state.reaper.close_session(session_id).await?;

    let message = if removed {
        "Session cleaned up".to_string()
    } else {
        "Nothing to clean up".to_string()
    };
    Ok(Json(CleanupResponse { message }))
}
