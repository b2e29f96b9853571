//! Event types for the setforge event system
//!
//! Provides the shared event definitions and the EventBus used to fan session
//! progress out to SSE subscribers and tests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Setforge event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SetforgeEvent {
    /// New session allocated
    SessionCreated {
        session_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// A batch of files was stored and registered as tracks
    TracksUploaded {
        session_id: Uuid,
        /// Tracks added by this upload call
        uploaded: usize,
        /// Tracks in the session after the upload
        total_tracks: usize,
        timestamp: DateTime<Utc>,
    },

    /// Analysis pass started
    AnalysisStarted {
        session_id: Uuid,
        total: usize,
        timestamp: DateTime<Utc>,
    },

    /// One track reached a terminal analysis status
    ///
    /// Emitted once per track, in upload order. `completed` never decreases
    /// within one pass.
    AnalysisProgress {
        session_id: Uuid,
        /// 0-based upload position of the track
        position: usize,
        file: String,
        succeeded: bool,
        completed: usize,
        total: usize,
        /// 0.0 - 100.0
        percentage: f64,
        timestamp: DateTime<Utc>,
    },

    /// Analysis pass finished for every track
    AnalysisCompleted {
        session_id: Uuid,
        succeeded: usize,
        failed: usize,
        timestamp: DateTime<Utc>,
    },

    /// Playlist archive produced
    PlaylistExported {
        session_id: Uuid,
        folder: String,
        track_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// Session removed, either explicitly or by idle timeout
    SessionClosed {
        session_id: Uuid,
        expired: bool,
        timestamp: DateTime<Utc>,
    },
}

impl SetforgeEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            SetforgeEvent::SessionCreated { .. } => "SessionCreated",
            SetforgeEvent::TracksUploaded { .. } => "TracksUploaded",
            SetforgeEvent::AnalysisStarted { .. } => "AnalysisStarted",
            SetforgeEvent::AnalysisProgress { .. } => "AnalysisProgress",
            SetforgeEvent::AnalysisCompleted { .. } => "AnalysisCompleted",
            SetforgeEvent::PlaylistExported { .. } => "PlaylistExported",
            SetforgeEvent::SessionClosed { .. } => "SessionClosed",
        }
    }

    /// Session the event belongs to
    pub fn session_id(&self) -> Uuid {
        match self {
            SetforgeEvent::SessionCreated { session_id, .. }
            | SetforgeEvent::TracksUploaded { session_id, .. }
            | SetforgeEvent::AnalysisStarted { session_id, .. }
            | SetforgeEvent::AnalysisProgress { session_id, .. }
            | SetforgeEvent::AnalysisCompleted { session_id, .. }
            | SetforgeEvent::PlaylistExported { session_id, .. }
            | SetforgeEvent::SessionClosed { session_id, .. } => *session_id,
        }
    }
}

/// Central event distribution bus
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use setforge_common::events::{EventBus, SetforgeEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(SetforgeEvent::SessionCreated {
///     session_id: uuid::Uuid::new_v4(),
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SetforgeEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<SetforgeEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: SetforgeEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
