//! Analysis orchestration
//!
//! Runs the engine over every pending track of a session with bounded
//! parallelism. Results are applied in upload order so progress counts
//! climb monotonically and events arrive in position order.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use setforge_common::events::{EventBus, SetforgeEvent};

use crate::analysis::{AnalysisEngine, TrackFeatures};
use crate::error::PipelineError;
use crate::models::{AnalysisResult, SessionId, SessionState, TrackStatus};

use super::session_manager::SessionManager;
use super::track_store::TrackStore;

/// One track to analyze, captured while the session is locked
#[derive(Debug, Clone)]
struct AnalysisJob {
    position: usize,
    filename: String,
    path: PathBuf,
}

/// How an analyze request proceeds after the state check
enum Start {
    /// Already analyzed; report the recorded results
    Recorded(Vec<AnalysisResult>),
    /// Pass started with these jobs
    Run(Vec<AnalysisJob>),
}

/// Drives the analysis pass for a session
pub struct AnalysisOrchestrator {
    sessions: SessionManager,
    store: Arc<dyn TrackStore>,
    engine: Arc<dyn AnalysisEngine>,
    event_bus: EventBus,
    workers: usize,
    timeout: Duration,
}

impl AnalysisOrchestrator {
    pub fn new(
        sessions: SessionManager,
        store: Arc<dyn TrackStore>,
        engine: Arc<dyn AnalysisEngine>,
        event_bus: EventBus,
        workers: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            sessions,
            store,
            engine,
            event_bus,
            workers: workers.max(1),
            timeout,
        }
    }

    /// Run the analysis pass on a detached task
    ///
    /// The pass finishes even if the caller stops waiting, so a session is
    /// never left in ANALYZING by a dropped request.
    pub fn spawn_analysis(
        self: &Arc<Self>,
        session_id: SessionId,
    ) -> JoinHandle<Result<Vec<AnalysisResult>, PipelineError>> {
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move { orchestrator.analyze(session_id).await })
    }

    /// Analyze every track of the session and return results in upload order
    ///
    /// A session that is already analyzed returns its recorded results
    /// without re-running the engine.
    pub async fn analyze(&self, session_id: SessionId) -> Result<Vec<AnalysisResult>, PipelineError> {
        let jobs = match self.begin(session_id).await? {
            Start::Recorded(results) => return Ok(results),
            Start::Run(jobs) => jobs,
        };

        let total = jobs.len();
        info!(
            session_id = %session_id,
            total,
            workers = self.workers,
            engine = self.engine.name(),
            "Analysis started"
        );
        self.event_bus.emit_lossy(SetforgeEvent::AnalysisStarted {
            session_id,
            total,
            timestamp: Utc::now(),
        });

        let mut outcomes = stream::iter(jobs)
            .map(|job| async move {
                let outcome = self.analyze_track(&job).await;
                (job, outcome)
            })
            .buffered(self.workers);

        let mut completed = 0usize;
        while let Some((job, outcome)) = outcomes.next().await {
            completed += 1;
            self.record(session_id, &job, outcome, completed, total).await?;
        }

        self.finish(session_id, total).await
    }

    /// Validate state and freeze the job list
    async fn begin(&self, session_id: SessionId) -> Result<Start, PipelineError> {
        let mut session = self.sessions.lock_session(session_id).await?;

        match session.state {
            SessionState::Analyzed | SessionState::Exported => {
                debug!(session_id = %session_id, "Analysis already recorded");
                return Ok(Start::Recorded(session.results()));
            }
            SessionState::Analyzing => return Err(PipelineError::AnalysisInProgress),
            SessionState::Created | SessionState::Uploading => {}
        }

        session.transition_to(SessionState::Analyzing)?;

        let jobs: Vec<AnalysisJob> = session
            .tracks
            .iter()
            .filter(|t| t.status == TrackStatus::Pending)
            .map(|t| AnalysisJob {
                position: t.position,
                filename: t.filename.clone(),
                path: self.store.path_of(&t.storage_handle),
            })
            .collect();

        session.update_progress(0, jobs.len(), None);
        Ok(Start::Run(jobs))
    }

    /// Engine call for one track, isolated on its own task with a deadline
    async fn analyze_track(&self, job: &AnalysisJob) -> Result<TrackFeatures, String> {
        let engine = Arc::clone(&self.engine);
        let path = job.path.clone();
        let timeout = self.timeout;

        let task = tokio::spawn(async move {
            tokio::time::timeout(timeout, engine.analyze(&path)).await
        });

        match task.await {
            Ok(Ok(Ok(features))) => Ok(features),
            Ok(Ok(Err(e))) => Err(format!("Failed to process {}: {}", job.filename, e)),
            Ok(Err(_elapsed)) => Err(format!("Analysis timed out after {}s", timeout.as_secs())),
            Err(e) => Err(format!(
                "Failed to process {}: analysis task failed: {}",
                job.filename, e
            )),
        }
    }

    /// Apply one outcome to its track and publish progress
    async fn record(
        &self,
        session_id: SessionId,
        job: &AnalysisJob,
        outcome: Result<TrackFeatures, String>,
        completed: usize,
        total: usize,
    ) -> Result<(), PipelineError> {
        let succeeded = outcome.is_ok();
        {
            let mut session = self.sessions.lock_session(session_id).await?;
            match session.tracks.get_mut(job.position) {
                Some(track) => {
                    let applied = match &outcome {
                        Ok(features) => track.mark_success(features),
                        Err(message) => track.mark_failed(message.clone()),
                    };
                    if !applied {
                        warn!(
                            session_id = %session_id,
                            position = job.position,
                            "Track already had a terminal status"
                        );
                    }
                }
                None => warn!(
                    session_id = %session_id,
                    position = job.position,
                    "Analyzed track missing from session"
                ),
            }
            session.update_progress(completed, total, Some(job.filename.clone()));
        }

        match &outcome {
            Ok(features) => debug!(
                session_id = %session_id,
                file = %job.filename,
                bpm = features.bpm,
                key = %features.key,
                energy = features.energy,
                "Track analyzed"
            ),
            Err(message) => warn!(session_id = %session_id, "{}", message),
        }

        self.event_bus.emit_lossy(SetforgeEvent::AnalysisProgress {
            session_id,
            position: job.position,
            file: job.filename.clone(),
            succeeded,
            completed,
            total,
            percentage: crate::models::AnalysisProgress::percentage_of(completed, total),
            timestamp: Utc::now(),
        });

        Ok(())
    }

    async fn finish(
        &self,
        session_id: SessionId,
        total: usize,
    ) -> Result<Vec<AnalysisResult>, PipelineError> {
        let mut session = self.sessions.lock_session(session_id).await?;
        session.update_progress(total, total, None);
        session.transition_to(SessionState::Analyzed)?;

        let results = session.results();
        drop(session);

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        let failed = results.len() - succeeded;

        info!(session_id = %session_id, succeeded, failed, "Analysis completed");
        self.event_bus.emit_lossy(SetforgeEvent::AnalysisCompleted {
            session_id,
            succeeded,
            failed,
            timestamp: Utc::now(),
        });

        Ok(results)
    }
}
