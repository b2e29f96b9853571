//! Session cleanup
//!
//! Releases stored files and archives for sessions that are closed
//! explicitly or that idle past the timeout.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use setforge_common::events::{EventBus, SetforgeEvent};

use crate::error::PipelineError;
use crate::models::{Session, SessionId};

use super::playlist_exporter::PlaylistExporter;
use super::session_manager::SessionManager;
use super::track_store::TrackStore;

pub struct SessionReaper {
    sessions: SessionManager,
    store: Arc<dyn TrackStore>,
    exporter: Arc<PlaylistExporter>,
    event_bus: EventBus,
}

impl SessionReaper {
    pub fn new(
        sessions: SessionManager,
        store: Arc<dyn TrackStore>,
        exporter: Arc<PlaylistExporter>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            sessions,
            store,
            exporter,
            event_bus,
        }
    }

    /// Close a session on request
    ///
    /// Unknown ids succeed with `false`. A running analysis pass blocks the close.
    pub async fn close_session(&self, session_id: SessionId) -> Result<bool, PipelineError> {
        match self.sessions.close_session(session_id).await? {
            Some(session) => {
                self.release(&session, false).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// One sweep over idle sessions; returns how many were removed
    pub async fn reap_expired(&self) -> usize {
        let expired = self.sessions.take_expired(Utc::now()).await;
        for session in &expired {
            self.release(session, true).await;
        }
        expired.len()
    }

    async fn release(&self, session: &Session, expired: bool) {
        let session_id = session.session_id;

        if let Err(e) = self.store.remove_session(session_id).await {
            warn!(session_id = %session_id, error = %e, "Failed to remove stored tracks");
        }
        if let Some(artifact) = &session.export {
            self.exporter.discard_artifact(artifact).await;
        }

        info!(
            session_id = %session_id,
            expired,
            tracks = session.tracks.len(),
            "Session closed"
        );
        self.event_bus.emit_lossy(SetforgeEvent::SessionClosed {
            session_id,
            expired,
            timestamp: Utc::now(),
        });
    }

    /// Sweep every `interval` until `shutdown` fires
    pub fn spawn(self: Arc<Self>, interval: Duration, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        debug!("Session reaper stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        let reaped = self.reap_expired().await;
                        if reaped > 0 {
                            info!(reaped, "Expired sessions reclaimed");
                        }
                    }
                }
            }
        })
    }
}
