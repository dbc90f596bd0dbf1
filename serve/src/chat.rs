//! `POST /chat`: one request, one SSE event stream.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::Stream;
use serde::Deserialize;
use tokio_stream::StreamExt;
use tracing::debug;

use super::app::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Omitted on the first turn; the server mints one.
    pub session_id: Option<String>,
    pub model: Option<String>,
}

/// Streams the turn's events as SSE. The event name is the protocol event
/// type; the data is the full JSON payload (type included).
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session_id = request
        .session_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    debug!(session_id = %session_id, "chat stream opened");

    let events = state
        .agent
        .chat(request.message, session_id, request.model)
        .map(|agent_event| {
            let name = agent_event.event_name();
            let data = agent_event
                .data_payload()
                .map(|v| v.to_string())
                .unwrap_or_else(|_| "{\"error\":\"serialization\"}".to_string());
            Ok(Event::default().event(name).data(data))
        });

    Sse::new(events).keep_alive(KeepAlive::default())
}
