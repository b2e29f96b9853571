//! Upload handler
//!
//! POST /upload/{id} accepts multipart fields named "folder" (a directory
//! picker upload) or "files". Other fields are ignored.

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde::Serialize;
use tracing::debug;

use crate::error::{ApiError, ApiResult, PipelineError};
use crate::services::UploadedFile;
use crate::AppState;

use super::parse_session_id;

/// Multipart field names that carry audio files
const FILE_FIELDS: [&str; 2] = ["folder", "files"];

/// POST /upload/{id} response
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    /// Names registered by this call, in upload order
    pub tracks: Vec<String>,
}

/// POST /upload/{id}
pub async fn upload_tracks(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let session_id = parse_session_id(&session_id)?;

    // Reject unknown or closed sessions before reading the body
    let session = state.sessions.get_session(session_id).await?;
    if !session.state.accepts_uploads() {
        return Err(PipelineError::UploadsClosed {
            state: session.state,
        }
        .into());
    }

    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed upload: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if !FILE_FIELDS.contains(&name.as_str()) {
            debug!(field = %name, "Ignoring multipart field");
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let content = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read {}: {}", filename, e)))?;
        files.push(UploadedFile { filename, content });
    }

    let accepted = state.upload_filter.select(files)?;
    let outcome = state.ingestor.ingest(session_id, accepted).await?;

    Ok(Json(UploadResponse {
        message: outcome.message,
        tracks: outcome.track_names,
    }))
}
