//! Server-Sent Events (SSE) for teacher dashboards

use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

/// GET /api/events - SSE stream of dashboard events
///
/// Streams events:
/// - FactRecorded
/// - EvaluationUpdated
/// - RelationshipAssigned
/// - RelationshipDeactivated
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to dashboard events");

    let mut rx = state.event_bus.subscribe();

    let stream = async_stream::stream! {
        yield Ok(Event::default().event("ConnectionStatus").data("connected"));

        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("SSE: client lagged, {} events skipped", skipped);
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            let event_type = event.event_type().to_string();
            match serde_json::to_string(&event) {
                Ok(event_json) => {
                    debug!("SSE: Broadcasting {}", event_type);
                    yield Ok(Event::default().event(event_type).data(event_json));
                }
                Err(e) => {
                    warn!("SSE: Failed to serialize event {}: {}", event_type, e);
                }
            }
        }

        debug!("SSE: event bus closed, ending stream");
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}

/// Build SSE routes
pub fn sse_routes() -> Router<AppState> {
    Router::new().route("/api/events", get(event_stream))
}
