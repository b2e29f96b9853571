//! Session state machine
//!
//! A session progresses through five states, never backwards:
//! CREATED → UPLOADING → ANALYZING → ANALYZED → EXPORTED
//!
//! CREATED may go straight to ANALYZING (a session with no tracks analyzes
//! to an empty result set).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

use super::export::ExportArtifact;
use super::track::{AnalysisResult, Track};
use crate::error::PipelineError;

/// Session identifier
pub type SessionId = Uuid;

/// Session workflow state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionState {
    /// Allocated, nothing uploaded yet
    Created,
    /// At least one upload accepted; more may follow
    Uploading,
    /// Analysis pass running; track list frozen
    Analyzing,
    /// Every track has a terminal status
    Analyzed,
    /// Playlist archive produced
    Exported,
}

impl SessionState {
    /// Whether `next` is a legal successor of `self`
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Created, Uploading)
                | (Created, Analyzing)
                | (Uploading, Analyzing)
                | (Analyzing, Analyzed)
                | (Analyzed, Exported)
        )
    }

    pub fn accepts_uploads(self) -> bool {
        matches!(self, SessionState::Created | SessionState::Uploading)
    }

    pub fn is_analyzed(self) -> bool {
        matches!(self, SessionState::Analyzed | SessionState::Exported)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Created => "CREATED",
            SessionState::Uploading => "UPLOADING",
            SessionState::Analyzing => "ANALYZING",
            SessionState::Analyzed => "ANALYZED",
            SessionState::Exported => "EXPORTED",
        };
        f.write_str(name)
    }
}

/// State transition record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub session_id: SessionId,
    pub old_state: SessionState,
    pub new_state: SessionState,
    pub transitioned_at: DateTime<Utc>,
}

/// Analysis progress for polling callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisProgress {
    /// Tracks with a terminal status
    pub completed: usize,
    pub total: usize,
    /// 0.0 - 100.0
    pub percentage: f64,
    /// Last track that completed
    pub current_file: Option<String>,
}

impl Default for AnalysisProgress {
    fn default() -> Self {
        Self {
            completed: 0,
            total: 0,
            percentage: 0.0,
            current_file: None,
        }
    }
}

impl AnalysisProgress {
    /// Percentage for `completed` of `total`; an empty batch is complete
    pub fn percentage_of(completed: usize, total: usize) -> f64 {
        if total == 0 {
            100.0
        } else {
            (completed as f64 / total as f64) * 100.0
        }
    }
}

/// One user's upload/analyze/export workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    pub state: SessionState,
    /// Upload order; append-only while uploading, frozen afterwards
    pub tracks: Vec<Track>,
    pub progress: AnalysisProgress,
    pub export: Option<ExportArtifact>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4(),
            state: SessionState::Created,
            tracks: Vec::new(),
            progress: AnalysisProgress::default(),
            export: None,
            created_at: now,
            last_activity: now,
        }
    }

    /// Transition to new state, rejecting anything but a forward step
    pub fn transition_to(
        &mut self,
        new_state: SessionState,
    ) -> Result<StateTransition, PipelineError> {
        if !self.state.can_transition_to(new_state) {
            return Err(PipelineError::InvalidTransition {
                from: self.state,
                to: new_state,
            });
        }

        let transition = StateTransition {
            session_id: self.session_id,
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;
        Ok(transition)
    }

    pub fn update_progress(&mut self, completed: usize, total: usize, current_file: Option<String>) {
        self.progress.completed = completed;
        self.progress.total = total;
        self.progress.percentage = AnalysisProgress::percentage_of(completed, total);
        if current_file.is_some() {
            self.progress.current_file = current_file;
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Idle longer than `idle_timeout` as of `now`
    pub fn is_expired(&self, now: DateTime<Utc>, idle_timeout: Duration) -> bool {
        let idle = now.signed_duration_since(self.last_activity);
        match chrono::Duration::from_std(idle_timeout) {
            Ok(limit) => idle > limit,
            Err(_) => false,
        }
    }

    /// All tracks projected as analysis results, in upload order
    pub fn results(&self) -> Vec<AnalysisResult> {
        self.tracks.iter().map(AnalysisResult::from).collect()
    }

    pub fn track_names(&self) -> Vec<String> {
        self.tracks.iter().map(|t| t.filename.clone()).collect()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
