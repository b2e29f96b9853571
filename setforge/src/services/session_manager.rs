//! Session registry
//!
//! The map lock is held only for lookup and insertion. Each session has its
//! own async mutex, so work on one session never blocks another.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::info;

use setforge_common::events::{EventBus, SetforgeEvent};

use crate::error::PipelineError;
use crate::models::{Session, SessionId, SessionState};

/// Exclusive access to one session
pub type SessionGuard = OwnedMutexGuard<Session>;

/// Concurrent-safe registry of live sessions
#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<SessionId, Arc<Mutex<Session>>>>>,
    idle_timeout: Duration,
    event_bus: EventBus,
}

impl SessionManager {
    pub fn new(idle_timeout: Duration, event_bus: EventBus) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout,
            event_bus,
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Allocate a new session in CREATED
    pub async fn create_session(&self) -> SessionId {
        let session = Session::new();
        let session_id = session.session_id;

        self.sessions
            .write()
            .await
            .insert(session_id, Arc::new(Mutex::new(session)));

        info!(session_id = %session_id, "Session created");
        self.event_bus.emit_lossy(SetforgeEvent::SessionCreated {
            session_id,
            timestamp: Utc::now(),
        });

        session_id
    }

    async fn handle(&self, session_id: SessionId) -> Option<Arc<Mutex<Session>>> {
        self.sessions.read().await.get(&session_id).cloned()
    }

    /// Lock a session for exclusive use
    ///
    /// Sessions idle past the timeout are reported as not found (unless an
    /// analysis pass is running on them). The reaper reclaims them.
    ///
    /// A session removed while the caller waited for its lock is also not
    /// found: removal always happens with the session lock held.
    pub async fn lock_session(&self, session_id: SessionId) -> Result<SessionGuard, PipelineError> {
        let handle = self
            .handle(session_id)
            .await
            .ok_or(PipelineError::SessionNotFound(session_id))?;

        let mut session = Arc::clone(&handle).lock_owned().await;
        let registered = self
            .handle(session_id)
            .await
            .is_some_and(|current| Arc::ptr_eq(&current, &handle));
        if !registered {
            return Err(PipelineError::SessionNotFound(session_id));
        }

        if session.state != SessionState::Analyzing
            && session.is_expired(Utc::now(), self.idle_timeout)
        {
            return Err(PipelineError::SessionNotFound(session_id));
        }

        session.touch();
        Ok(session)
    }

    /// Point-in-time copy of a session
    pub async fn get_session(&self, session_id: SessionId) -> Result<Session, PipelineError> {
        let session = self.lock_session(session_id).await?;
        Ok(session.clone())
    }

    /// Remove a session on request
    ///
    /// Returns the removed session, or None if the id was unknown. A session
    /// with a running analysis pass is left in place.
    pub async fn close_session(&self, session_id: SessionId) -> Result<Option<Session>, PipelineError> {
        let Some(handle) = self.handle(session_id).await else {
            return Ok(None);
        };

        let session = handle.lock().await;
        if session.state == SessionState::Analyzing {
            return Err(PipelineError::AnalysisInProgress);
        }

        self.sessions.write().await.remove(&session_id);
        Ok(Some(session.clone()))
    }

    /// Remove every session idle past the timeout as of `now`
    ///
    /// Sessions that are locked or analyzing are skipped; they are in use.
    pub async fn take_expired(&self, now: DateTime<Utc>) -> Vec<Session> {
        let mut sessions = self.sessions.write().await;
        let mut expired = Vec::new();

        sessions.retain(|_, handle| {
            let Ok(session) = handle.try_lock() else {
                return true;
            };
            if session.state == SessionState::Analyzing
                || !session.is_expired(now, self.idle_timeout)
            {
                return true;
            }
            expired.push(session.clone());
            false
        });

        expired
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
