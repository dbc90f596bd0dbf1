//! Events emitted while a graph run streams.

use std::fmt::Debug;

use stream_event::StepProgress;

use super::Interrupt;

/// One event from `CompiledStateGraph::stream`.
///
/// `Updates` carries the state after each node; `Progress` is emitted live
/// by nodes through `RunContext` (per-step running/completed/failed);
/// `Interrupted` is sent just before a paused run's stream closes.
#[derive(Debug, Clone)]
pub enum StreamEvent<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// State snapshot after a node completed.
    Updates { node_id: String, state: S },
    /// Live per-step progress from inside a node.
    Progress(StepProgress),
    /// The run paused for human input; a checkpoint was saved.
    Interrupted(Interrupt),
}
