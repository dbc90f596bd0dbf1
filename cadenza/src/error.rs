//! Workflow execution error types.
//!
//! `WorkflowError` is the graph-level error returned by nodes; `StepError`
//! is the per-step taxonomy recorded into failed step results. Step failures
//! never abort a plan — they are converted to `{error, status: "failed"}`
//! results by the executor.

use thiserror::Error;

use crate::graph::GraphInterrupt;

/// Graph-level execution error.
///
/// Returned by `Node::run` when a node fails outright or requests an
/// interrupt. Per-step tool failures are not surfaced here; they are
/// recorded in `WorkflowState::step_results`.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Execution failed with a message (e.g. empty graph, unknown node).
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// Graph execution was paused for human input (plan review).
    ///
    /// The run loop catches this, saves a checkpoint for the thread, and
    /// stops; the caller resumes later via `resume_from_node_id`.
    #[error("graph interrupted: {0}")]
    Interrupted(GraphInterrupt),
}

impl From<GraphInterrupt> for WorkflowError {
    fn from(interrupt: GraphInterrupt) -> Self {
        WorkflowError::Interrupted(interrupt)
    }
}

/// Per-step failure taxonomy. `kind()` is the stable string recorded in
/// step results and surfaced to clients.
#[derive(Debug, Clone, Error)]
pub enum StepError {
    /// Transport failure calling the LLM or a tool.
    #[error("network: {0}")]
    Network(String),

    /// Malformed JSON from the LLM or a tool.
    #[error("decode: {0}")]
    Decode(String),

    /// Structured error field in an LLM/tool response.
    #[error("provider error: {0}")]
    Provider(String),

    /// Required arguments missing or rejected before any outbound call.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// A `depends_on` step finished with status=failed.
    #[error("dependency failed: {0}")]
    DependencyFailed(String),

    /// The plan referenced a tool the registry does not know.
    #[error("unknown tool: {0}")]
    UnknownTool(String),
}

impl StepError {
    /// Stable taxonomy label for result records and telemetry.
    pub fn kind(&self) -> &'static str {
        match self {
            StepError::Network(_) => "network",
            StepError::Decode(_) => "decode",
            StepError::Provider(_) => "provider-error",
            StepError::InvalidArguments(_) => "invalid-arguments",
            StepError::DependencyFailed(_) => "dependency-failed",
            StepError::UnknownTool(_) => "unknown-tool",
        }
    }
}

/// Errors resolving a resume command (`APPROVE_PLAN:` / `EDIT_PLAN:`).
#[derive(Debug, Error)]
pub enum ResumeError {
    /// The command did not match the resume grammar.
    #[error("invalid resume command: {0}")]
    InvalidCommand(String),

    /// The edited plan JSON was malformed or inconsistent.
    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    /// The referenced plan id had no checkpoint to resume.
    #[error("missing checkpoint for plan {0}")]
    MissingCheckpoint(String),

    /// The checkpoint existed but carried no execution plan.
    #[error("missing plan in checkpoint {0}")]
    MissingPlan(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Display of ExecutionFailed contains the message.
    #[test]
    fn workflow_error_display() {
        let err = WorkflowError::ExecutionFailed("bad".to_string());
        let s = err.to_string();
        assert!(s.contains("execution failed"), "{}", s);
        assert!(s.contains("bad"), "{}", s);
    }

    /// **Scenario**: Each StepError variant maps to its taxonomy label.
    #[test]
    fn step_error_kinds() {
        assert_eq!(StepError::Network("x".into()).kind(), "network");
        assert_eq!(StepError::Decode("x".into()).kind(), "decode");
        assert_eq!(StepError::Provider("x".into()).kind(), "provider-error");
        assert_eq!(
            StepError::InvalidArguments("x".into()).kind(),
            "invalid-arguments"
        );
        assert_eq!(
            StepError::DependencyFailed("x".into()).kind(),
            "dependency-failed"
        );
        assert_eq!(StepError::UnknownTool("x".into()).kind(), "unknown-tool");
    }
}
