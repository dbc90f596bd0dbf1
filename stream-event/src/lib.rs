//! Streaming protocol for one chat turn: typed events plus the final result shape.
//!
//! One request produces one event stream. The event vocabulary is fixed
//! (`connected`, `title_update_triggered`, `plan_review`, `progress`,
//! `result`, `done`, `error`); state-carrying payloads use `serde_json::Value`
//! so this crate stays dependency-free of the core types that produce them.

mod event;
mod result;

pub use event::AgentEvent;
pub use result::{FinalResult, ResponseKind, StepProgress, StepStatus};
