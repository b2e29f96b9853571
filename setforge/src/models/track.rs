//! Track records and their analysis projection

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::analysis::TrackFeatures;

/// Opaque reference to a stored file, owned by the TrackStore
///
/// The string is a store-relative location. Nothing outside the store
/// should interpret it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageHandle(String);

impl StorageHandle {
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Analysis status of a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackStatus {
    Pending,
    Success,
    Failed,
}

/// One uploaded audio file registered in a session
///
/// Identity is (session, position): filenames may repeat within a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    /// 0-based upload position
    pub position: usize,
    pub filename: String,
    #[serde(skip)]
    pub storage_handle: StorageHandle,
    pub status: TrackStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bpm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,
}

impl Track {
    pub fn new(position: usize, filename: String, storage_handle: StorageHandle) -> Self {
        Self {
            position,
            filename,
            storage_handle,
            status: TrackStatus::Pending,
            bpm: None,
            key: None,
            energy: None,
            failure_message: None,
        }
    }

    /// Record successful analysis
    ///
    /// Returns false (and changes nothing) if the track already has a
    /// terminal status.
    pub fn mark_success(&mut self, features: &TrackFeatures) -> bool {
        if self.status != TrackStatus::Pending {
            return false;
        }
        self.status = TrackStatus::Success;
        self.bpm = Some(features.bpm);
        self.key = Some(features.key.clone());
        self.energy = Some(features.energy);
        true
    }

    /// Record failed analysis
    ///
    /// Returns false (and changes nothing) if the track already has a
    /// terminal status.
    pub fn mark_failed(&mut self, message: String) -> bool {
        if self.status != TrackStatus::Pending {
            return false;
        }
        self.status = TrackStatus::Failed;
        self.failure_message = Some(message);
        true
    }

    pub fn is_terminal(&self) -> bool {
        self.status != TrackStatus::Pending
    }

    pub fn is_eligible(&self) -> bool {
        self.status == TrackStatus::Success
    }
}

/// Per-track analysis result as reported to callers
///
/// Wire shape: `{file, status: "success"|"error", bpm?, key?, energy?, message?}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub file: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bpm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AnalysisResult {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

impl From<&Track> for AnalysisResult {
    fn from(track: &Track) -> Self {
        match track.status {
            TrackStatus::Success => Self {
                file: track.filename.clone(),
                status: "success".to_string(),
                bpm: track.bpm,
                key: track.key.clone(),
                energy: track.energy,
                message: None,
            },
            // Pending only appears if a pass was interrupted
            TrackStatus::Failed | TrackStatus::Pending => Self {
                file: track.filename.clone(),
                status: "error".to_string(),
                bpm: None,
                key: None,
                energy: None,
                message: Some(
                    track
                        .failure_message
                        .clone()
                        .unwrap_or_else(|| format!("{} was not analyzed", track.filename)),
                ),
            },
        }
    }
}
