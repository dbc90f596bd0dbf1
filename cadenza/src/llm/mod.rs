//! LLM client abstraction.
//!
//! Every LLM-mediated decision in the workflow (agent turn, enum mapping,
//! missing-tool check, dependency analysis, email drafting, title, digest
//! rewrite) goes through one seam: [`LlmClient::complete`]. Callers pass a
//! fallback model list and a purpose label; implementations try models in
//! order and surface typed errors so callers can fall back
//! deterministically. The orchestrator stays correct when every call fails.

pub mod json_repair;

mod mock;
mod open_router;

pub use json_repair::slice_object;
pub use mock::MockLlm;
pub use open_router::OpenRouterClient;

use async_trait::async_trait;
use thiserror::Error;

use crate::message::{Message, ToolCall};
use crate::tools::ToolSpec;

/// Purpose labels attached to each LLM call for logging and mock routing.
pub mod purpose {
    pub const AGENT: &str = "agent";
    pub const PARAMETER_MAPPING: &str = "parameter_mapping";
    pub const CHECK_MISSING_TOOLS: &str = "check_missing_tools";
    pub const ANALYZE_DEPENDENCIES: &str = "analyze_dependencies";
    pub const GENERATE_EMAIL: &str = "generate_email";
    pub const TITLE_GENERATION: &str = "title_generation";
    pub const COMPRESSION: &str = "compression";
}

/// One chat-completion request.
#[derive(Clone, Debug)]
pub struct ChatRequest {
    /// Conversation messages, system prompt first.
    pub messages: Vec<Message>,
    /// Models to try in order; the first success wins.
    pub models: Vec<String>,
    /// Tool schemas to offer (enables tool_calls in the reply).
    pub tools: Option<Vec<ToolSpec>>,
    pub temperature: Option<f32>,
    /// Request a JSON-object response format.
    pub json_mode: bool,
    pub max_tokens: Option<u32>,
    /// Purpose label for logging and mock routing.
    pub purpose: String,
}

impl ChatRequest {
    pub fn new(purpose: &str, models: Vec<String>, messages: Vec<Message>) -> Self {
        Self {
            messages,
            models,
            tools: None,
            temperature: None,
            json_mode: false,
            max_tokens: None,
            purpose: purpose.to_string(),
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Assistant reply: text plus any tool calls.
#[derive(Clone, Debug, Default)]
pub struct ChatOutcome {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    /// Model that actually answered (after fallback).
    pub model: String,
}

impl ChatOutcome {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
            model: String::new(),
        }
    }

    pub fn with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: content.into(),
            tool_calls,
            model: String::new(),
        }
    }
}

/// LLM call failure, aligned with the step-error taxonomy.
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    /// Transport failure or timeout.
    #[error("network: {0}")]
    Network(String),
    /// Malformed response body.
    #[error("decode: {0}")]
    Decode(String),
    /// Structured error from the provider.
    #[error("provider error: {0}")]
    Provider(String),
    /// Empty model list.
    #[error("no models configured")]
    NoModels,
}

/// LLM client: given a request, returns the assistant reply.
///
/// Implementations: [`OpenRouterClient`] (real API with model fallback),
/// [`MockLlm`] (scripted, for tests).
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<ChatOutcome, LlmError>;
}
