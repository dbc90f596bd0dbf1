//! Axum app: state and router.

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use cadenza::SalesAgent;

use super::chat::chat_handler;
use super::sessions::{
    delete_session, get_conversation, health, list_sessions,
};

/// Shared server state: the one agent instance.
pub struct AppState {
    pub agent: SalesAgent,
}

/// Builds the route table.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/sessions", get(list_sessions))
        .route("/conversations/:session_id", get(get_conversation))
        .route("/session/:session_id", delete(delete_session))
        .route("/health", get(health))
        .with_state(state)
}
