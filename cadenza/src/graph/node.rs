//! Graph node trait: one step in a StateGraph.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::error::WorkflowError;

use super::{Next, RunContext};

/// One step in a graph: state in, (state out, next step).
///
/// The graph runner uses `Next` to choose the next node (Continue = linear
/// order, Node(id) = jump, End = stop).
///
/// **Interaction**: Implemented by the workflow nodes; registered with
/// `StateGraph::add_node` and driven by `CompiledStateGraph::invoke`.
#[async_trait]
pub trait Node<S>: Send + Sync
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Node id (e.g. `"agent"`, `"execute_step"`). Unique within a graph.
    fn id(&self) -> &str;

    /// One step: state in, (state out, next step).
    async fn run(&self, state: S) -> Result<(S, Next), WorkflowError>;

    /// Variant with run context (streaming, config). Default ignores the
    /// context and calls `run`.
    async fn run_with_context(
        &self,
        state: S,
        _ctx: &RunContext<S>,
    ) -> Result<(S, Next), WorkflowError> {
        self.run(state).await
    }
}
