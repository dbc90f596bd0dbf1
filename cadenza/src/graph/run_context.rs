//! Run context passed into nodes for streaming-aware execution.

use std::fmt::Debug;

use stream_event::StepProgress;
use tokio::sync::mpsc;

use crate::memory::RunnableConfig;

use super::StreamEvent;

/// Context for one graph run: config plus an optional event sender.
///
/// **Interaction**: Built by `CompiledStateGraph::invoke`/`stream`; nodes
/// receive it via `Node::run_with_context` and use `emit_progress` to
/// stream per-step updates without waiting for the node to finish.
#[derive(Clone)]
pub struct RunContext<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Config for the current run (thread_id, resume point).
    pub config: RunnableConfig,
    /// Optional sender for streaming events.
    pub stream_tx: Option<mpsc::Sender<StreamEvent<S>>>,
}

impl<S> RunContext<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    pub fn new(config: RunnableConfig) -> Self {
        Self {
            config,
            stream_tx: None,
        }
    }

    /// Emits a per-step progress event. Returns `true` when sent; silently
    /// drops the event when no stream is attached or the receiver is gone.
    pub async fn emit_progress(&self, progress: StepProgress) -> bool {
        match &self.stream_tx {
            Some(tx) => tx.send(StreamEvent::Progress(progress)).await.is_ok(),
            None => false,
        }
    }
}
