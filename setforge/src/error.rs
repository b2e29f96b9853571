//! Error types for setforge
//!
//! `PipelineError` is the request-level taxonomy shared by every stage.
//! Per-track analysis failures never appear here; they are recorded on the
//! track itself. `ApiError` maps both onto the uniform `{"error": "..."}` body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::models::SessionState;

/// Request-level pipeline failure
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Session id unknown or idle past its timeout
    #[error("Invalid session: {0}")]
    SessionNotFound(Uuid),

    /// Upload carried no files at all
    #[error("No folder uploaded")]
    NoFilesProvided,

    /// Files were uploaded but none had an accepted extension
    #[error("No supported audio files ({extensions}) found")]
    NoSupportedFiles { extensions: String },

    /// A file could not be stored; the whole upload was rolled back
    #[error("Failed to store {file}: {reason}")]
    StorageError { file: String, reason: String },

    /// Upload attempted after analysis started
    #[error("Uploads are closed for this session (state: {state})")]
    UploadsClosed { state: SessionState },

    /// A second analysis request arrived while one is running
    #[error("Analysis already in progress")]
    AnalysisInProgress,

    /// Export attempted before every track reached a terminal status
    #[error("Analyze tracks first (state: {state})")]
    NotAnalyzed { state: SessionState },

    /// Export attempted with zero successfully analyzed tracks
    #[error("No successfully analyzed tracks to export")]
    NoEligibleTracks,

    /// Archive construction failed
    #[error("Export failed: {0}")]
    ExportFailed(String),

    /// Folder identifier is not one this service could have produced
    #[error("Invalid folder: {0}")]
    InvalidFolder(String),

    /// No archive exists for the folder identifier
    #[error("ZIP file not found: {0}.zip")]
    ArtifactNotFound(String),

    /// Illegal state transition requested
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: SessionState, to: SessionState },
}

impl PipelineError {
    fn status_code(&self) -> StatusCode {
        match self {
            PipelineError::SessionNotFound(_) | PipelineError::ArtifactNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            PipelineError::NoFilesProvided
            | PipelineError::NoSupportedFiles { .. }
            | PipelineError::NotAnalyzed { .. }
            | PipelineError::NoEligibleTracks
            | PipelineError::InvalidFolder(_) => StatusCode::BAD_REQUEST,
            PipelineError::UploadsClosed { .. }
            | PipelineError::AnalysisInProgress
            | PipelineError::InvalidTransition { .. } => StatusCode::CONFLICT,
            PipelineError::StorageError { .. } | PipelineError::ExportFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Stage failure
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// Malformed request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Pipeline(err) => err.status_code(),
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) | ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "Request failed");
        } else {
            tracing::debug!(status = %status, error = %self, "Request rejected");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            PipelineError::SessionNotFound(Uuid::nil()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            PipelineError::NoFilesProvided.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PipelineError::AnalysisInProgress.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            PipelineError::StorageError {
                file: "a.wav".into(),
                reason: "disk full".into()
            }
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_messages_are_human_readable() {
        let err = PipelineError::NotAnalyzed {
            state: SessionState::Uploading,
        };
        assert_eq!(err.to_string(), "Analyze tracks first (state: UPLOADING)");

        let err = PipelineError::NoSupportedFiles {
            extensions: ".mp3, .wav".into(),
        };
        assert_eq!(err.to_string(), "No supported audio files (.mp3, .wav) found");
    }
}
