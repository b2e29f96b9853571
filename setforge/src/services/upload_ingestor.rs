//! Upload ingestion
//!
//! Files are filtered by extension, stored through the TrackStore and
//! registered as tracks in upload order. An upload call either registers
//! every file it stored or none of them.

use axum::body::Bytes;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use setforge_common::events::{EventBus, SetforgeEvent};

use crate::error::PipelineError;
use crate::models::{SessionId, SessionState, Track};

use super::session_manager::SessionManager;
use super::track_store::TrackStore;

/// A file received from the client
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client-supplied name, possibly with a relative folder path
    pub filename: String,
    pub content: Bytes,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }
}

/// Result of one upload call
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub message: String,
    /// Names registered by this call, in upload order
    pub track_names: Vec<String>,
}

/// Accepts files by extension and skips metadata entries
#[derive(Debug, Clone)]
pub struct UploadFilter {
    extensions: Vec<String>,
}

impl UploadFilter {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect(),
        }
    }

    /// Human-readable extension list (".mp3, .wav")
    pub fn describe(&self) -> String {
        self.extensions
            .iter()
            .map(|ext| format!(".{}", ext))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn accepts(&self, filename: &str) -> bool {
        let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
        if base.is_empty() || base.starts_with("._") {
            return false;
        }

        let lower = base.to_ascii_lowercase();
        match lower.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => self.extensions.iter().any(|e| e == ext),
            _ => false,
        }
    }

    /// Keep only acceptable files, preserving order
    ///
    /// Fails with NoFilesProvided when nothing was uploaded and with
    /// NoSupportedFiles when every file was filtered out.
    pub fn select(&self, files: Vec<UploadedFile>) -> Result<Vec<UploadedFile>, PipelineError> {
        if files.iter().all(|f| f.filename.is_empty()) {
            return Err(PipelineError::NoFilesProvided);
        }

        let received = files.len();
        let accepted: Vec<UploadedFile> =
            files.into_iter().filter(|f| self.accepts(&f.filename)).collect();

        if accepted.is_empty() {
            return Err(PipelineError::NoSupportedFiles {
                extensions: self.describe(),
            });
        }

        if accepted.len() < received {
            info!(
                received,
                accepted = accepted.len(),
                "Skipped unsupported files in upload"
            );
        }

        Ok(accepted)
    }
}

/// Replace path separators so a client name maps to a single file name
pub fn sanitize_filename(filename: &str) -> String {
    let cleaned: String = filename
        .trim()
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();

    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned
    }
}

/// Stores uploads and registers them on the session
pub struct UploadIngestor {
    sessions: SessionManager,
    store: Arc<dyn TrackStore>,
    event_bus: EventBus,
}

impl UploadIngestor {
    pub fn new(sessions: SessionManager, store: Arc<dyn TrackStore>, event_bus: EventBus) -> Self {
        Self {
            sessions,
            store,
            event_bus,
        }
    }

    /// Store `files` and append them to the session's track list
    ///
    /// The session lock is held for the whole call, so concurrent uploads to
    /// one session serialize and positions stay contiguous.
    pub async fn ingest(
        &self,
        session_id: SessionId,
        files: Vec<UploadedFile>,
    ) -> Result<IngestOutcome, PipelineError> {
        let mut session = self.sessions.lock_session(session_id).await?;

        if !session.state.accepts_uploads() {
            return Err(PipelineError::UploadsClosed {
                state: session.state,
            });
        }
        if files.is_empty() {
            return Err(PipelineError::NoFilesProvided);
        }

        let base = session.tracks.len();
        let mut stored: Vec<Track> = Vec::with_capacity(files.len());

        for (offset, file) in files.iter().enumerate() {
            let position = base + offset;
            let filename = sanitize_filename(&file.filename);

            match self
                .store
                .store(session_id, position, &filename, &file.content)
                .await
            {
                Ok(handle) => stored.push(Track::new(position, filename, handle)),
                Err(e) => {
                    warn!(
                        session_id = %session_id,
                        file = %filename,
                        error = %e,
                        "Upload storage failed, rolling back batch"
                    );
                    self.discard(&stored).await;
                    return Err(PipelineError::StorageError {
                        file: filename,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if session.state == SessionState::Created {
            session.transition_to(SessionState::Uploading)?;
        }

        let track_names: Vec<String> = stored.iter().map(|t| t.filename.clone()).collect();
        session.tracks.extend(stored);
        let total_tracks = session.tracks.len();
        drop(session);

        info!(
            session_id = %session_id,
            uploaded = track_names.len(),
            total_tracks,
            "Tracks uploaded"
        );
        self.event_bus.emit_lossy(SetforgeEvent::TracksUploaded {
            session_id,
            uploaded: track_names.len(),
            total_tracks,
            timestamp: Utc::now(),
        });

        Ok(IngestOutcome {
            message: format!("Uploaded {} valid audio files", track_names.len()),
            track_names,
        })
    }

    async fn discard(&self, tracks: &[Track]) {
        for track in tracks {
            if let Err(e) = self.store.discard(&track.storage_handle).await {
                warn!(handle = %track.storage_handle, error = %e, "Failed to discard stored file");
            }
        }
    }
}
