//! HTTP/SSE server for Cadenza (axum).
//!
//! One `POST /chat` request opens one SSE stream of `AgentEvent`s; session
//! CRUD lives beside it. The server owns a single [`cadenza::SalesAgent`].
//!
//! **Public API**: [`run_serve`], [`run_serve_on_listener`], [`router`].

mod app;
mod chat;
mod sessions;

pub use app::{router, AppState};

use std::sync::Arc;

use cadenza::SalesAgent;
use tokio::net::TcpListener;
use tracing::info;

const DEFAULT_ADDR: &str = "127.0.0.1:8000";

/// Runs the server on an existing listener. Used by tests (bind to
/// 127.0.0.1:0 first, then pass the listener).
pub async fn run_serve_on_listener(
    listener: TcpListener,
    agent: SalesAgent,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = listener.local_addr()?;
    info!("server listening on http://{}", addr);
    let state = Arc::new(AppState { agent });
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Binds `addr` (default 127.0.0.1:8000) and serves forever.
pub async fn run_serve(
    addr: Option<&str>,
    agent: SalesAgent,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = addr.unwrap_or(DEFAULT_ADDR);
    let listener = TcpListener::bind(addr).await?;
    run_serve_on_listener(listener, agent).await
}
