//! Server-sent event streams
//!
//! - GET /api/events - every document event
//! - GET /api/events/:doc_id - events for one document
//!
//! Each SSE `data:` line is one JSON event. The stream starts with a
//! `connected` event and runs until the client goes away or the server
//! shuts down; either way the session unregisters from the bus when axum
//! drops the response body.

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures::{Stream, StreamExt};
use std::convert::Infallible;

use crate::events::{DocumentEvent, StreamSession, Topic};
use crate::state::AppState;

/// Create the events router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(global_events))
        .route("/:doc_id", get(document_events))
}

/// GET /api/events
async fn global_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    event_stream(&state, Topic::Global)
}

/// GET /api/events/:doc_id
async fn document_events(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    event_stream(&state, Topic::document(doc_id))
}

fn event_stream(
    state: &AppState,
    topic: Topic,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = StreamSession::open(state.bus(), topic)
        .into_stream()
        .map(|event| Ok(to_sse(&event)));

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn to_sse(event: &DocumentEvent) -> Event {
    Event::default().json_data(event).unwrap_or_else(|e| {
        tracing::warn!(event = %event.event, error = %e, "Failed to encode event");
        Event::default().comment("unencodable event")
    })
}

