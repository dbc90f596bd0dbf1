//! The workflow engine: six nodes over [`WorkflowState`].
//!
//! ```text
//! agent → plan_execution → review_plan ⟂ → execute_step ↻ → check_completion → respond
//!   └───────────────────────── (no tool calls) ──────────────────────────────────┘
//! ```
//!
//! `review_plan` interrupts on first entry; the resume path re-enters
//! there with `plan_approved` set. `execute_step` self-loops while ready
//! waves remain.

mod agent_node;
mod execute_node;
mod plan_node;
mod respond_node;
mod review_node;

pub use execute_node::prepare_step_args;

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::analyzer::{DependencyAnalyzer, MissingToolAnalyzer};
use crate::compress::{CompressionConfig, TokenCounter};
use crate::enums::EnumMapper;
use crate::graph::{CompilationError, CompiledStateGraph, StateGraph, END, START};
use crate::llm::LlmClient;
use crate::memory::Checkpointer;
use crate::state::WorkflowState;
use crate::store::ConversationStore;
use crate::tools::ToolRegistry;

pub const NODE_AGENT: &str = "agent";
pub const NODE_PLAN_EXECUTION: &str = "plan_execution";
pub const NODE_REVIEW_PLAN: &str = "review_plan";
pub const NODE_EXECUTE_STEP: &str = "execute_step";
pub const NODE_CHECK_COMPLETION: &str = "check_completion";
pub const NODE_RESPOND: &str = "respond";

/// Shared dependencies for every node.
pub struct WorkflowCtx {
    pub llm: Arc<dyn LlmClient>,
    pub registry: ToolRegistry,
    pub store: Arc<dyn ConversationStore>,
    pub user_id: String,
    pub enum_mapper: EnumMapper,
    pub missing_analyzer: MissingToolAnalyzer,
    pub dependency_analyzer: DependencyAnalyzer,
    pub compression: CompressionConfig,
    pub token_counter: TokenCounter,
    /// Models tried after the session's preferred model fails.
    pub fallback_models: Vec<String>,
}

impl WorkflowCtx {
    /// Model list for the agent call: session model first, fallbacks after.
    pub fn agent_models(&self, state_model: &str) -> Vec<String> {
        let mut models = vec![state_model.to_string()];
        for m in &self.fallback_models {
            if m != state_model {
                models.push(m.clone());
            }
        }
        models
    }
}

/// Wires the six nodes into a compiled graph with the given checkpointer.
pub fn build_workflow(
    ctx: Arc<WorkflowCtx>,
    checkpointer: Arc<dyn Checkpointer<WorkflowState>>,
) -> Result<CompiledStateGraph<WorkflowState>, CompilationError> {
    let mut graph = StateGraph::<WorkflowState>::new();
    graph.add_node(NODE_AGENT, Arc::new(agent_node::AgentNode::new(ctx.clone())));
    graph.add_node(
        NODE_PLAN_EXECUTION,
        Arc::new(plan_node::PlanExecutionNode::new(ctx.clone())),
    );
    graph.add_node(NODE_REVIEW_PLAN, Arc::new(review_node::ReviewPlanNode));
    graph.add_node(
        NODE_EXECUTE_STEP,
        Arc::new(execute_node::ExecuteStepNode::new(ctx.clone())),
    );
    graph.add_node(
        NODE_CHECK_COMPLETION,
        Arc::new(respond_node::CheckCompletionNode),
    );
    graph.add_node(NODE_RESPOND, Arc::new(respond_node::RespondNode));

    graph.add_edge(START, NODE_AGENT);
    graph.add_edge(NODE_AGENT, NODE_PLAN_EXECUTION);
    graph.add_edge(NODE_PLAN_EXECUTION, NODE_REVIEW_PLAN);
    graph.add_edge(NODE_REVIEW_PLAN, NODE_EXECUTE_STEP);
    graph.add_edge(NODE_EXECUTE_STEP, NODE_CHECK_COMPLETION);
    graph.add_edge(NODE_CHECK_COMPLETION, NODE_RESPOND);
    graph.add_edge(NODE_RESPOND, END);

    graph.compile_with_checkpointer(checkpointer)
}

/// Brief summary of a tool result: `{key}_found` counts for every list in
/// the result, falling back to the result's message.
pub fn result_summary(result: &Value) -> Value {
    let Some(obj) = result.as_object() else {
        return serde_json::json!({"details": "Result is not an object."});
    };
    let mut summary = Map::new();
    for (key, value) in obj {
        if let Value::Array(list) = value {
            summary.insert(format!("{key}_found"), Value::from(list.len()));
        }
    }
    if summary.is_empty() {
        let details = obj
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Execution completed.");
        summary.insert("details".into(), Value::String(details.to_string()));
    }
    Value::Object(summary)
}
