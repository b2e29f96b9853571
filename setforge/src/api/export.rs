//! Export and download handlers

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tokio_util::io::ReaderStream;

use crate::error::ApiResult;
use crate::models::{ExportArtifact, SkippedTrack};
use crate::AppState;

use super::parse_session_id;

/// Playlist row as reported to clients
#[derive(Debug, Serialize)]
pub struct PlaylistItem {
    /// Zero-padded playlist position ("01")
    pub index: String,
    pub file: String,
    pub bpm: f64,
    pub key: String,
    pub energy: f64,
}

/// POST /export/{id} response
#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub message: String,
    pub folder: String,
    pub zip_file: String,
    pub playlist: Vec<PlaylistItem>,
    pub skipped: Vec<SkippedTrack>,
}

impl From<ExportArtifact> for ExportResponse {
    fn from(artifact: ExportArtifact) -> Self {
        let zip_file = artifact.archive_file_name();
        let playlist = artifact
            .entries
            .iter()
            .map(|entry| PlaylistItem {
                index: entry.display_index(),
                file: entry.file.clone(),
                bpm: entry.bpm,
                key: entry.key.clone(),
                energy: entry.energy,
            })
            .collect();

        Self {
            message: "Playlist exported as ZIP".to_string(),
            folder: artifact.folder_id,
            zip_file,
            playlist,
            skipped: artifact.skipped,
        }
    }
}

/// POST /export/{id}
pub async fn export_playlist(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<ExportResponse>> {
    let session_id = parse_session_id(&session_id)?;
    let artifact = state.exporter.export(session_id).await?;
    Ok(Json(ExportResponse::from(artifact)))
}

/// GET /download/{folder}
///
/// Streams the archive as an attachment. The archive stays available for
/// repeated downloads until its session is cleaned up.
pub async fn download_archive(
    State(state): State<AppState>,
    Path(folder): Path<String>,
) -> ApiResult<Response> {
    let path = state.exporter.archive_path(&folder)?;
    let file = tokio::fs::File::open(&path).await?;
    let length = file.metadata().await?.len();

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("{}.zip", folder));

    let body = Body::from_stream(ReaderStream::new(file));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
            (header::CONTENT_LENGTH, length.to_string()),
        ],
        body,
    )
        .into_response())
}
