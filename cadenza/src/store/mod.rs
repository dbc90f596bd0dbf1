//! Durable conversation storage.
//!
//! A session owns its messages and tool outputs; the store is the sole
//! writer. Merging goes through the dedup reducer: tool messages are equal
//! iff they share a `tool_call_id`, anything else is equal iff its
//! canonical (sorted-key) JSON is identical. This is what keeps resume
//! paths from duplicating history — the same tool messages are emitted by
//! both `execute_step` and the final save.

mod cached;
mod in_memory;
mod sqlite;

pub use cached::CachedStore;
pub use in_memory::InMemoryStore;
pub use sqlite::SqliteStore;

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::message::{Message, Role};

/// Default title until the generator produces one.
pub const DEFAULT_TITLE: &str = "New Chat";

/// Durable record of one executed step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub tool_call_id: String,
    pub tool_name: String,
    pub step_id: String,
    pub plan_id: String,
    /// Arbitrary JSON result (or `{error, status: "failed"}`).
    pub result: Value,
    pub description: String,
}

/// Everything persisted for one session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionRecord {
    pub messages: Vec<Message>,
    pub tool_outputs: Vec<ToolOutput>,
    pub title: String,
    /// Preferred LLM model for the session, when the user picked one.
    pub model: Option<String>,
}

impl Default for SessionRecord {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            tool_outputs: Vec::new(),
            title: DEFAULT_TITLE.to_string(),
            model: None,
        }
    }
}

/// Session id + title, for listings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub title: String,
}

/// Store failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage: {0}")]
    Storage(String),
    #[error("serialization: {0}")]
    Serialization(String),
}

/// Load/save of a session's messages, tool outputs, and title.
///
/// **Interaction**: The agent is the only caller; `load` returns an empty
/// record for unknown sessions (first use creates the session on save).
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn load(&self, user_id: &str, session_id: &str) -> Result<SessionRecord, StoreError>;

    async fn save(
        &self,
        user_id: &str,
        session_id: &str,
        record: &SessionRecord,
    ) -> Result<(), StoreError>;

    async fn delete(&self, session_id: &str) -> Result<(), StoreError>;

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<SessionSummary>, StoreError>;
}

/// Dedup identity for a message: `tool:<id>` for tool messages, canonical
/// JSON for everything else.
fn message_identity(msg: &Message) -> Option<String> {
    if msg.role == Role::Tool {
        msg.tool_call_id.as_ref().map(|id| format!("tool:{id}"))
    } else {
        Some(msg.canonical_json())
    }
}

/// Merges `new` into `existing`, preserving order and dropping messages
/// already present. Idempotent: `merge(a, merge(a, b)) == merge(a, b)`.
pub fn merge_messages(existing: &[Message], new: &[Message]) -> Vec<Message> {
    if new.is_empty() {
        return existing.to_vec();
    }
    let mut seen: HashSet<String> = existing.iter().filter_map(message_identity).collect();
    let mut result = existing.to_vec();
    for msg in new {
        let Some(id) = message_identity(msg) else {
            continue;
        };
        if seen.insert(id) {
            result.push(msg.clone());
        }
    }
    result
}

/// Merges tool outputs, dropping entries whose `tool_call_id` is already
/// recorded. Keeps history append-only across turns.
pub fn merge_tool_outputs(existing: &[ToolOutput], new: &[ToolOutput]) -> Vec<ToolOutput> {
    let mut seen: HashSet<&str> = existing.iter().map(|o| o.tool_call_id.as_str()).collect();
    let mut result = existing.to_vec();
    for output in new {
        if seen.insert(output.tool_call_id.as_str()) {
            result.push(output.clone());
        }
    }
    result
}
