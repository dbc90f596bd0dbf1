//! Checkpointing: save and resume workflow state by thread id.
//!
//! A thread id is the `plan_id` while a plan is alive, else the
//! `session_id` (pure Q&A turns). `MemorySaver` keeps checkpoints in
//! process memory; paused plans survive across turns of the same process.

mod checkpoint;
mod checkpointer;
mod config;
mod memory_saver;

pub use checkpoint::Checkpoint;
pub use checkpointer::{CheckpointError, Checkpointer};
pub use config::RunnableConfig;
pub use memory_saver::MemorySaver;
