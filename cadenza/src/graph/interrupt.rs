//! Interrupt mechanism for graph execution.
//!
//! A node raises an interrupt to pause execution for human input (plan
//! review). The run loop saves a checkpoint so the thread can be resumed
//! after the human answers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Interrupt value raised during graph execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interrupt {
    /// JSON payload describing what the human must act on (e.g. the plan).
    pub value: serde_json::Value,
    /// Optional id correlating this interrupt (e.g. the plan id).
    pub id: Option<String>,
}

impl Interrupt {
    pub fn new(value: serde_json::Value) -> Self {
        Self { value, id: None }
    }

    pub fn with_id(value: serde_json::Value, id: String) -> Self {
        Self {
            value,
            id: Some(id),
        }
    }
}

/// Error wrapper raised when a graph is interrupted; caught by the run loop.
#[derive(Debug, Clone, Error)]
#[error("graph interrupted: {0:?}")]
pub struct GraphInterrupt(pub Interrupt);

impl From<Interrupt> for GraphInterrupt {
    fn from(interrupt: Interrupt) -> Self {
        GraphInterrupt(interrupt)
    }
}
