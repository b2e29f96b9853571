//! Server-Sent Events for session progress

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::AppState;

/// GET /events query
#[derive(Debug, Default, Deserialize)]
pub struct EventFilter {
    /// Only forward events of this session
    pub session_id: Option<Uuid>,
}

/// GET /events[?session_id=...]
///
/// Streams every SetforgeEvent as `event: <type>` with a JSON payload.
pub async fn event_stream(
    State(state): State<AppState>,
    Query(filter): Query<EventFilter>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(session_id = ?filter.session_id, "New SSE client connected");

    let mut rx = state.event_bus.subscribe();

    let stream = async_stream::stream! {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "SSE: client lagging, events dropped");
                    continue;
                }
                Err(RecvError::Closed) => {
                    debug!("SSE: event bus closed");
                    break;
                }
            };

            if let Some(wanted) = filter.session_id {
                if event.session_id() != wanted {
                    continue;
                }
            }

            let event_type = event.event_type();
            match serde_json::to_string(&event) {
                Ok(event_json) => {
                    debug!("SSE: Broadcasting event: {}", event_type);
                    yield Ok(Event::default().event(event_type).data(event_json));
                }
                Err(e) => {
                    warn!("SSE: Failed to serialize event {}: {}", event_type, e);
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}
