//! Chat message and tool-call types.
//!
//! Messages follow the chat-completions shape: a role, optional content,
//! optional `tool_calls` (assistant only), and `tool_call_id` (tool only).
//! The sequence invariants this crate maintains:
//! - every `tool` message's `tool_call_id` matches a `ToolCall.id` from a
//!   preceding assistant message in the session;
//! - no two `tool` messages share a `tool_call_id`;
//! - a `user` message never directly follows a `tool` message in the
//!   LLM-facing list (a bridging assistant message is inserted).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Prefix for tool-call ids synthesized by the orchestrator rather than the
/// main LLM. Such calls are skipped by LLM-facing validation paths.
pub const AUTO_CALL_PREFIX: &str = "auto_";

/// Bridging assistant text inserted wherever a `user` message would
/// otherwise directly follow a `tool` message. Content-free by design.
pub const BRIDGING_ASSISTANT_TEXT: &str =
    "I have completed the actions. What would you like to do next?";

/// Message role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One tool invocation requested by the LLM (or synthesized by the
/// missing-tool analyzer).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique within the assistant message; `auto_…` when system-generated.
    pub id: String,
    /// Tool identifier as registered in the tool registry.
    pub name: String,
    /// JSON object conforming to the tool's schema.
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// True when this call was synthesized by the orchestrator (id prefixed
    /// `auto_`), not proposed by the main LLM.
    pub fn is_system_generated(&self) -> bool {
        self.id.starts_with(AUTO_CALL_PREFIX)
    }
}

/// One message in a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Present only when role=assistant and the turn requested tools.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Present iff role=tool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Assistant message carrying tool calls. Content is kept (possibly
    /// empty) because chat APIs require the field alongside tool_calls.
    pub fn assistant_with_tool_calls(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: Some(content.into()),
            tool_calls: Some(calls),
            tool_call_id: None,
        }
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    /// The content-free assistant message inserted to keep the sequence
    /// legal for chat-completion APIs.
    pub fn bridging_assistant() -> Self {
        Self::assistant(BRIDGING_ASSISTANT_TEXT)
    }

    pub fn content_str(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }

    /// True for `APPROVE_PLAN:` / `EDIT_PLAN:` user messages, which are
    /// control messages and never shown to the LLM.
    pub fn is_resume_command(&self) -> bool {
        self.role == Role::User
            && (self.content_str().starts_with("APPROVE_PLAN:")
                || self.content_str().starts_with("EDIT_PLAN:"))
    }

    /// Canonical JSON encoding with sorted object keys; the dedup identity
    /// for non-tool messages.
    pub fn canonical_json(&self) -> String {
        // serde_json's default Map is ordered by key, so routing through
        // Value yields a stable, sorted encoding.
        serde_json::to_value(self)
            .map(|v| v.to_string())
            .unwrap_or_default()
    }
}
