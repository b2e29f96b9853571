//! Analyze handler

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::models::AnalysisResult;
use crate::AppState;

use super::parse_session_id;

/// GET|POST /analyze/{id} response
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    /// One entry per track, in upload order
    pub results: Vec<AnalysisResult>,
}

/// GET|POST /analyze/{id}
///
/// Blocks until the pass completes. The pass itself runs on its own task and
/// finishes even if this request is dropped; progress can be followed on
/// GET /sessions/{id} or GET /events.
pub async fn analyze_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<AnalyzeResponse>> {
    let session_id = parse_session_id(&session_id)?;

    let results = state
        .orchestrator
        .spawn_analysis(session_id)
        .await
        .map_err(|e| ApiError::Internal(format!("Analysis task failed: {}", e)))??;

    Ok(Json(AnalyzeResponse { results }))
}
