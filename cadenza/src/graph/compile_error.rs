//! Compile-time validation errors for StateGraph.

use thiserror::Error;

/// Error building an executable graph from nodes and edges.
#[derive(Debug, Error)]
pub enum CompilationError {
    /// An edge references a node id that was never added.
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// No edge from START.
    #[error("missing START edge")]
    MissingStart,

    /// No edge or jump reaches END.
    #[error("missing END edge")]
    MissingEnd,

    /// Edges do not form a single linear chain (branch, duplicate from,
    /// or cycle).
    #[error("invalid chain: {0}")]
    InvalidChain(String),
}
