//! Checkpointer trait and CheckpointError.

use async_trait::async_trait;

use crate::memory::checkpoint::Checkpoint;
use crate::memory::config::RunnableConfig;

/// Error type for checkpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("thread_id required")]
    ThreadIdRequired,
    #[error("serialization: {0}")]
    Serialization(String),
    #[error("storage: {0}")]
    Storage(String),
}

/// Saves and loads checkpoints by thread id.
///
/// **Interaction**: Injected via `StateGraph::compile_with_checkpointer`;
/// the run loop saves on interrupt and at run end. `delete_thread` supports
/// garbage-collecting pre-plan checkpoints once a plan commits under its
/// own `plan_id`.
#[async_trait]
pub trait Checkpointer<S>: Send + Sync
where
    S: Clone + Send + Sync + 'static,
{
    /// Persist a checkpoint for the thread. Returns the checkpoint id.
    async fn put(
        &self,
        config: &RunnableConfig,
        checkpoint: &Checkpoint<S>,
    ) -> Result<String, CheckpointError>;

    /// Load the latest checkpoint for the thread.
    async fn get_tuple(
        &self,
        config: &RunnableConfig,
    ) -> Result<Option<Checkpoint<S>>, CheckpointError>;

    /// Remove all checkpoints for the thread. Removing an unknown thread is
    /// not an error.
    async fn delete_thread(&self, config: &RunnableConfig) -> Result<(), CheckpointError>;
}
