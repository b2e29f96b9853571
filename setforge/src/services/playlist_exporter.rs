//! Playlist export
//!
//! Orders the successfully analyzed tracks of a session and packages them
//! into a ZIP archive together with a plain-text explanation of the order.

use chrono::Utc;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use setforge_common::config::ExportOrder;
use setforge_common::events::{EventBus, SetforgeEvent};

use crate::error::PipelineError;
use crate::models::{
    ExportArtifact, PlaylistEntry, SessionId, SessionState, SkippedTrack, Track, TrackStatus,
};

use super::archive::{write_playlist_archive, ArchiveMember};
use super::session_manager::SessionManager;
use super::track_store::TrackStore;

/// Weight per BPM of tempo difference
const BPM_WEIGHT: f64 = 0.5;
/// Flat penalty when keys differ
const KEY_MISMATCH_PENALTY: f64 = 10.0;
/// Weight per unit of energy difference
const ENERGY_WEIGHT: f64 = 20.0;

/// Playlist order and notes for one export
#[derive(Debug, Clone)]
pub struct PlaylistPlan {
    pub entries: Vec<PlaylistEntry>,
    pub skipped: Vec<SkippedTrack>,
    pub explanation: String,
}

/// Transition cost between two analyzed tracks; lower mixes better
pub fn compatibility_score(from: &Track, to: &Track) -> f64 {
    let bpm_diff = (from.bpm.unwrap_or(0.0) - to.bpm.unwrap_or(0.0)).abs();
    let key_penalty = if from.key == to.key { 0.0 } else { KEY_MISMATCH_PENALTY };
    let energy_diff = (from.energy.unwrap_or(0.0) - to.energy.unwrap_or(0.0)).abs();

    bpm_diff * BPM_WEIGHT + key_penalty + energy_diff * ENERGY_WEIGHT
}

/// Greedy nearest-neighbour walk starting from the first uploaded track
///
/// Ties go to the track uploaded earlier.
fn order_by_compatibility<'a>(tracks: &[&'a Track], notes: &mut String) -> Vec<&'a Track> {
    let mut remaining: Vec<&Track> = tracks.to_vec();
    let mut ordered = Vec::with_capacity(remaining.len());
    if remaining.is_empty() {
        return ordered;
    }

    let first = remaining.remove(0);
    let _ = writeln!(notes, "Playlist starts with track: {}", first.filename);
    ordered.push(first);

    while !remaining.is_empty() {
        let Some(current) = ordered.last().copied() else {
            break;
        };

        let mut best_idx = 0;
        let mut best_score = f64::INFINITY;
        for (idx, candidate) in remaining.iter().enumerate() {
            let score = compatibility_score(current, candidate);
            if score < best_score {
                best_idx = idx;
                best_score = score;
            }
        }

        let next = remaining.remove(best_idx);
        let _ = writeln!(
            notes,
            "{} selected after {} (BPM diff: {:.2}, Key {}, Energy diff: {:.3})",
            next.filename,
            current.filename,
            (current.bpm.unwrap_or(0.0) - next.bpm.unwrap_or(0.0)).abs(),
            if current.key == next.key { "match" } else { "mismatch" },
            (current.energy.unwrap_or(0.0) - next.energy.unwrap_or(0.0)).abs(),
        );
        ordered.push(next);
    }

    ordered
}

/// Archive-safe form of a track name: spaces become underscores, brackets are dropped
pub fn safe_archive_name(filename: &str) -> String {
    filename
        .chars()
        .filter(|c| *c != '[' && *c != ']')
        .map(|c| if c == ' ' { '_' } else { c })
        .collect()
}

/// Decide the playlist for a fully analyzed track list
pub fn plan_playlist(tracks: &[Track], order: ExportOrder) -> Result<PlaylistPlan, PipelineError> {
    let eligible: Vec<&Track> = tracks.iter().filter(|t| t.is_eligible()).collect();
    if eligible.is_empty() {
        return Err(PipelineError::NoEligibleTracks);
    }

    let mut explanation = String::new();
    let ordered = match order {
        ExportOrder::Upload => {
            explanation.push_str("Playlist follows upload order\n");
            eligible
        }
        ExportOrder::Compatibility => order_by_compatibility(&eligible, &mut explanation),
    };

    let entries: Vec<PlaylistEntry> = ordered
        .iter()
        .enumerate()
        .map(|(i, track)| {
            let index = i + 1;
            PlaylistEntry {
                index,
                position: track.position,
                file: track.filename.clone(),
                bpm: track.bpm.unwrap_or(0.0),
                key: track.key.clone().unwrap_or_default(),
                energy: track.energy.unwrap_or(0.0),
                archive_name: format!("{:02}.{}", index, safe_archive_name(&track.filename)),
            }
        })
        .collect();

    explanation.push('\n');
    for entry in &entries {
        let _ = writeln!(
            explanation,
            "{}. {} (BPM {:.2}, Key {}, Energy {:.3})",
            entry.display_index(),
            entry.file,
            entry.bpm,
            entry.key,
            entry.energy
        );
    }

    let skipped: Vec<SkippedTrack> = tracks
        .iter()
        .filter(|t| t.status == TrackStatus::Failed)
        .map(|t| SkippedTrack {
            file: t.filename.clone(),
            message: t
                .failure_message
                .clone()
                .unwrap_or_else(|| format!("Failed to process {}", t.filename)),
        })
        .collect();

    if !skipped.is_empty() {
        explanation.push_str("\nExcluded (analysis failed):\n");
        for track in &skipped {
            let _ = writeln!(explanation, "- {}: {}", track.file, track.message);
        }
    }

    Ok(PlaylistPlan {
        entries,
        skipped,
        explanation,
    })
}

/// Packages analyzed sessions into downloadable archives
pub struct PlaylistExporter {
    sessions: SessionManager,
    store: Arc<dyn TrackStore>,
    event_bus: EventBus,
    exports_dir: PathBuf,
    order: ExportOrder,
}

impl PlaylistExporter {
    pub fn new(
        sessions: SessionManager,
        store: Arc<dyn TrackStore>,
        event_bus: EventBus,
        exports_dir: PathBuf,
        order: ExportOrder,
    ) -> Self {
        Self {
            sessions,
            store,
            event_bus,
            exports_dir,
            order,
        }
    }

    pub fn exports_dir(&self) -> &Path {
        &self.exports_dir
    }

    /// Export the session's playlist
    ///
    /// Repeating an export returns the recorded artifact, rebuilding the
    /// archive file only if it has gone missing.
    pub async fn export(&self, session_id: SessionId) -> Result<ExportArtifact, PipelineError> {
        let mut session = self.sessions.lock_session(session_id).await?;

        match session.state {
            SessionState::Analyzed => {}
            SessionState::Exported => {
                let artifact = session.export.clone().ok_or_else(|| {
                    PipelineError::ExportFailed("exported session has no artifact".to_string())
                })?;
                if !artifact.archive_path.exists() {
                    warn!(
                        session_id = %session_id,
                        folder = %artifact.folder_id,
                        "Archive missing, rebuilding"
                    );
                    let plan = plan_playlist(&session.tracks, artifact.order)?;
                    self.build_archive(&session.tracks, &plan, &artifact.archive_path)
                        .await?;
                }
                return Ok(artifact);
            }
            state => return Err(PipelineError::NotAnalyzed { state }),
        }

        let plan = plan_playlist(&session.tracks, self.order)?;
        let folder_id = ExportArtifact::folder_for(session_id);
        let archive_path = self.exports_dir.join(format!("{}.zip", folder_id));

        self.build_archive(&session.tracks, &plan, &archive_path)
            .await?;

        let artifact = ExportArtifact {
            folder_id,
            order: self.order,
            entries: plan.entries,
            skipped: plan.skipped,
            archive_path,
            created_at: Utc::now(),
        };

        session.export = Some(artifact.clone());
        session.transition_to(SessionState::Exported)?;
        drop(session);

        info!(
            session_id = %session_id,
            folder = %artifact.folder_id,
            tracks = artifact.entries.len(),
            skipped = artifact.skipped.len(),
            "Playlist exported"
        );
        self.event_bus.emit_lossy(SetforgeEvent::PlaylistExported {
            session_id,
            folder: artifact.folder_id.clone(),
            track_count: artifact.entries.len(),
            timestamp: Utc::now(),
        });

        Ok(artifact)
    }

    async fn build_archive(
        &self,
        tracks: &[Track],
        plan: &PlaylistPlan,
        dest: &Path,
    ) -> Result<(), PipelineError> {
        let members: Vec<ArchiveMember> = plan
            .entries
            .iter()
            .filter_map(|entry| {
                let track = tracks.get(entry.position)?;
                Some(ArchiveMember {
                    source: self.store.path_of(&track.storage_handle),
                    name: entry.archive_name.clone(),
                })
            })
            .collect();

        if members.len() != plan.entries.len() {
            return Err(PipelineError::ExportFailed(
                "playlist refers to tracks missing from the session".to_string(),
            ));
        }

        let dest = dest.to_path_buf();
        let explanation = plan.explanation.clone();
        tokio::task::spawn_blocking(move || write_playlist_archive(&dest, &members, &explanation))
            .await
            .map_err(|e| PipelineError::ExportFailed(format!("archive task failed: {}", e)))?
            .map_err(|e| PipelineError::ExportFailed(format!("{:#}", e)))
    }

    /// Location of an exported archive
    ///
    /// `folder` may carry a trailing ".zip". Only identifiers this service
    /// could have produced are accepted.
    pub fn archive_path(&self, folder: &str) -> Result<PathBuf, PipelineError> {
        let folder = folder.strip_suffix(".zip").unwrap_or(folder);

        let valid = !folder.is_empty()
            && folder
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(PipelineError::InvalidFolder(folder.to_string()));
        }

        let path = self.exports_dir.join(format!("{}.zip", folder));
        if !path.is_file() {
            return Err(PipelineError::ArtifactNotFound(folder.to_string()));
        }
        Ok(path)
    }

    /// Delete the archive recorded on a session, if any
    pub async fn discard_artifact(&self, artifact: &ExportArtifact) {
        match tokio::fs::remove_file(&artifact.archive_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                folder = %artifact.folder_id,
                error = %e,
                "Failed to delete exported archive"
            ),
        }
    }
}
