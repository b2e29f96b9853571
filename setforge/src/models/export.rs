//! Export artifact model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use setforge_common::config::ExportOrder;

use super::session::SessionId;

/// Folder identifier prefix for exported playlists
pub const FOLDER_PREFIX: &str = "SortedPlaylist_";

/// One track in the exported playlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    /// 1-based playlist position
    pub index: usize,
    /// 0-based upload position of the source track
    pub position: usize,
    pub file: String,
    pub bpm: f64,
    pub key: String,
    pub energy: f64,
    /// Entry name inside the archive (`NN.<safe name>`)
    pub archive_name: String,
}

impl PlaylistEntry {
    /// Index zero-padded to two digits ("01" .. "99", then "100" ...)
    pub fn display_index(&self) -> String {
        format!("{:02}", self.index)
    }
}

/// Track left out of the archive because its analysis failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedTrack {
    pub file: String,
    pub message: String,
}

/// Packaged playlist produced by a successful export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportArtifact {
    pub folder_id: String,
    pub order: ExportOrder,
    pub entries: Vec<PlaylistEntry>,
    pub skipped: Vec<SkippedTrack>,
    #[serde(skip)]
    pub archive_path: PathBuf,
    pub created_at: DateTime<Utc>,
}

impl ExportArtifact {
    /// Folder identifier derived from the session id
    pub fn folder_for(session_id: SessionId) -> String {
        format!("{}{}", FOLDER_PREFIX, session_id.simple())
    }

    /// Download name for the archive
    pub fn archive_file_name(&self) -> String {
        format!("{}.zip", self.folder_id)
    }
}
