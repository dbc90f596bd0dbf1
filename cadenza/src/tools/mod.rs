//! Tool registry and the five prospecting tools.
//!
//! Each tool declares a JSON-Schema parameter object and executes against
//! the CRM client (or the LLM, for email drafting). The orchestrator treats
//! schemas as opaque; the allowed-key sets live in `crate::validate` and
//! the dependency rules in `crate::analyzer`.

mod add_contacts;
mod create_cadence;
mod generate_email;
mod search_companies;
mod search_leads;

pub use add_contacts::AddContactsToCadenceTool;
pub use create_cadence::CreateCadenceTool;
pub use generate_email::GenerateEmailTool;
pub use search_companies::SearchCompaniesTool;
pub use search_leads::SearchLeadsTool;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::crm::{CrmClient, CrmError};
use crate::error::StepError;
use crate::llm::{LlmClient, LlmError};

/// Canonical tool names.
pub const TOOL_SEARCH_LEADS: &str = "search_leads";
pub const TOOL_SEARCH_COMPANIES: &str = "search_companies";
pub const TOOL_GENERATE_EMAIL: &str = "generate_email";
pub const TOOL_CREATE_CADENCE: &str = "create_cadence";
pub const TOOL_ADD_CONTACTS_TO_CADENCE: &str = "add_contacts_to_cadence";

/// Tool specification offered to the LLM.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: Option<String>,
    /// JSON Schema for arguments.
    pub input_schema: Value,
}

/// Errors from executing a tool.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Required arguments missing or malformed; raised before any
    /// outbound call.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error(transparent)]
    Crm(#[from] CrmError),
    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl ToolError {
    /// Maps onto the per-step taxonomy recorded in failed results.
    pub fn to_step_error(&self) -> StepError {
        match self {
            ToolError::InvalidArguments(msg) => StepError::InvalidArguments(msg.clone()),
            ToolError::Crm(CrmError::Network(msg)) => StepError::Network(msg.clone()),
            ToolError::Crm(CrmError::Decode(msg)) => StepError::Decode(msg.clone()),
            ToolError::Crm(CrmError::Api { status, message }) => {
                StepError::Provider(format!("{status}: {message}"))
            }
            ToolError::Llm(LlmError::Network(msg)) => StepError::Network(msg.clone()),
            ToolError::Llm(LlmError::Decode(msg)) => StepError::Decode(msg.clone()),
            ToolError::Llm(LlmError::Provider(msg)) => StepError::Provider(msg.clone()),
            ToolError::Llm(LlmError::NoModels) => {
                StepError::Provider("no models configured".into())
            }
        }
    }
}

/// Per-call context passed to tools.
#[derive(Clone, Debug, Default)]
pub struct ToolContext {
    pub session_id: String,
}

/// One external capability: schema plus async execution.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn spec(&self) -> ToolSpec;
    async fn call(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError>;
}

/// Registry of tools by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) -> &mut Self {
        self.tools.insert(tool.name().to_string(), tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Specs for all registered tools, ordered by name.
    pub fn specs(&self) -> Vec<ToolSpec> {
        let mut specs: Vec<ToolSpec> = self.tools.values().map(|t| t.spec()).collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }
}

/// Builds the standard registry: two searches, email drafting, cadence
/// creation, recipient enrollment.
pub fn default_registry(
    crm: Arc<dyn CrmClient>,
    llm: Arc<dyn LlmClient>,
    email_models: Vec<String>,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry
        .register(Arc::new(SearchLeadsTool::new(crm.clone())))
        .register(Arc::new(SearchCompaniesTool::new(crm.clone())))
        .register(Arc::new(GenerateEmailTool::new(llm, email_models)))
        .register(Arc::new(CreateCadenceTool::new(crm.clone())))
        .register(Arc::new(AddContactsToCadenceTool::new(crm)));
    registry
}

/// Stringifies an id value (backends return numbers and strings).
pub(crate) fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
