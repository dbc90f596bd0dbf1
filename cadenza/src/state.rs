//! Workflow state: the single value that flows through the graph.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use stream_event::FinalResult;

use crate::message::{Message, Role};
use crate::plan::ExecutionPlan;
use crate::store::ToolOutput;

/// Per-thread mutable state for one turn. Checkpointed by `plan_id` while
/// a plan is alive, by `session_id` for pre-plan turns.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct WorkflowState {
    pub session_id: String,
    /// Conversation messages, merged through the dedup reducer on save.
    pub messages: Vec<Message>,
    /// Tool outputs produced this turn.
    pub tool_outputs: Vec<ToolOutput>,
    /// step_id → result (success payload or `{error, status: "failed"}`).
    pub step_results: BTreeMap<String, Value>,
    pub completed_steps: Vec<String>,
    pub execution_plan: Option<ExecutionPlan>,
    pub final_result: Option<FinalResult>,
    pub model: String,
    pub plan_id: Option<String>,
    /// Set by the resume path after approval/edit; lets `review_plan`
    /// proceed instead of interrupting again.
    #[serde(default)]
    pub plan_approved: bool,
}

impl WorkflowState {
    /// Content of the chronologically last assistant message, if any.
    pub fn last_assistant_reply(&self) -> Option<String> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.content_str().to_string())
    }

    /// The most recent user message that is not a resume command.
    pub fn last_user_message(&self) -> Option<String> {
        self.messages
            .iter()
            .rev()
            .filter(|m| m.role == Role::User && !m.is_resume_command())
            .map(|m| m.content_str().to_string())
            .next()
    }

    /// True when a step's recorded result carries `status: "failed"`.
    pub fn step_failed(&self, step_id: &str) -> bool {
        self.step_results
            .get(step_id)
            .and_then(|r| r.get("status"))
            .and_then(Value::as_str)
            == Some("failed")
    }
}
