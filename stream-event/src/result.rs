//! Final result and per-step progress payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Whether the turn produced tool work or a plain text reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    ToolResponse,
    TextResponse,
}

/// Status of one execution step as reported in `progress` events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Running,
    Completed,
    Failed,
}

/// Progress payload for one step of the execution plan.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StepProgress {
    pub step_id: String,
    pub description: String,
    pub status: StepStatus,
    pub message: String,
    /// Brief counts summary (`contacts_found: 12`), present when completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_summary: Option<Value>,
}

/// Aggregated final result for one turn.
///
/// `tool_outputs` entries are the durable per-step records
/// (`tool_call_id`, `tool_name`, `step_id`, `plan_id`, `result`,
/// `description`), serialized by the core.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FinalResult {
    #[serde(rename = "type")]
    pub kind: ResponseKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_type: Option<String>,
    pub message: String,
    pub data: Value,
    pub suggested_actions: Vec<String>,
    pub tool_outputs: Vec<Value>,
}

impl FinalResult {
    /// Plain text reply with no tool work.
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            kind: ResponseKind::TextResponse,
            execution_type: None,
            message: message.into(),
            data: Value::Object(Default::default()),
            suggested_actions: Vec::new(),
            tool_outputs: Vec::new(),
        }
    }
}
