//! State graph: nodes + linear edges with node-driven jumps, compile and run.
//!
//! `StateGraph`: add nodes and edges, compile (optionally with a
//! checkpointer), then `invoke` or `stream` with state. Nodes may pause the
//! run by raising an interrupt; the run loop checkpoints and stops, and the
//! caller resumes later via `RunnableConfig::resume_from_node_id`.

mod compile_error;
mod compiled;
mod interrupt;
mod next;
mod node;
mod run_context;
mod state_graph;
mod stream;

pub use compile_error::CompilationError;
pub use compiled::CompiledStateGraph;
pub use interrupt::{GraphInterrupt, Interrupt};
pub use next::Next;
pub use node::Node;
pub use run_context::RunContext;
pub use state_graph::{StateGraph, END, START};
pub use stream::StreamEvent;
