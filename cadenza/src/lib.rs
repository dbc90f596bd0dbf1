//! # Cadenza
//!
//! A conversational sales-development assistant core: it turns
//! natural-language requests into reviewed, dependency-scheduled tool
//! workflows against a CRM/prospecting backend, streaming progress while
//! persisting a durable conversation history.
//!
//! ## How a turn flows
//!
//! 1. [`SalesAgent::chat`] loads the session, appends the user message,
//!    and runs the workflow graph
//!    (`agent → plan_execution → review_plan → execute_step ↻ →
//!    check_completion → respond`).
//! 2. The `agent` node calls the LLM with assembled history
//!    ([`assemble`]) under the compression gate ([`compress`]).
//! 3. Tool calls are validated ([`validate`]), enum-mapped ([`enums`]),
//!    augmented with missing tools and analyzed for dependencies
//!    ([`analyzer`]), and built into an [`plan::ExecutionPlan`].
//! 4. `review_plan` interrupts; the stream emits `plan_review` and the
//!    checkpointed thread waits for `APPROVE_PLAN:`/`EDIT_PLAN:`
//!    ([`resume`]).
//! 5. On resume, `execute_step` runs ready waves concurrently with
//!    dependency injection and failure isolation; `respond` aggregates the
//!    final result.
//!
//! ## Main modules
//!
//! - [`graph`] + [`memory`]: generic state-graph runtime with interrupts
//!   and checkpointing.
//! - [`workflow`]: the six nodes over [`state::WorkflowState`].
//! - [`plan`]: execution plans, steps, readiness, plan-id grammar.
//! - [`tools`] + [`crm`]: the five prospecting tools and the CRM seam.
//! - [`llm`]: the LLM seam ([`OpenRouterClient`], [`MockLlm`]).
//! - [`validate`], [`enums`], [`context`], [`analyzer`]: argument and
//!   workflow normalization.
//! - [`store`]: durable sessions with the dedup reducer.
//! - [`compress`]: sliding-window + digest compression.
//! - [`agent`]: the [`SalesAgent`] entry point and event stream.
//!
//! Events and final results are the `stream-event` crate's types; the SSE
//! front door lives in the `serve` crate.

pub mod agent;
pub mod analyzer;
pub mod assemble;
pub mod compress;
pub mod context;
pub mod crm;
pub mod enums;
pub mod error;
pub mod graph;
pub mod llm;
pub mod memory;
pub mod message;
pub mod plan;
pub mod prompts;
pub mod resume;
pub mod state;
pub mod store;
pub mod title;
pub mod tools;
pub mod validate;
pub mod workflow;

pub use agent::{AgentConfig, SalesAgent};
pub use analyzer::{
    default_args_for, DependencyAnalysis, DependencyAnalyzer, MissingToolAnalyzer,
    MissingToolsReport,
};
pub use assemble::assemble_llm_messages;
pub use compress::{compress_if_needed, CompressionConfig, TokenCounter};
pub use context::{apply_context_mapping, build_context, ContextInfo, ContextSummary, EmailContent};
pub use crm::{CrmClient, CrmError, HttpCrmClient, MockCrm};
pub use enums::{EnumCatalog, EnumMapper};
pub use error::{ResumeError, StepError, WorkflowError};
pub use graph::{
    CompilationError, CompiledStateGraph, GraphInterrupt, Interrupt, Next, Node, RunContext,
    StateGraph, StreamEvent, END, START,
};
pub use llm::{ChatOutcome, ChatRequest, LlmClient, LlmError, MockLlm, OpenRouterClient};
pub use memory::{Checkpoint, CheckpointError, Checkpointer, MemorySaver, RunnableConfig};
pub use message::{Message, Role, ToolCall};
pub use plan::{
    generate_plan_id, is_valid_plan_id, ExecutionPlan, ExecutionStep, ExecutionType, PlanError,
};
pub use resume::ResumeCommand;
pub use state::WorkflowState;
pub use store::{
    merge_messages, merge_tool_outputs, CachedStore, ConversationStore, InMemoryStore,
    SessionRecord, SessionSummary, SqliteStore, StoreError, ToolOutput,
};
pub use title::TitleGenerator;
pub use tools::{
    default_registry, Tool, ToolContext, ToolError, ToolRegistry, ToolSpec,
    TOOL_ADD_CONTACTS_TO_CADENCE, TOOL_CREATE_CADENCE, TOOL_GENERATE_EMAIL,
    TOOL_SEARCH_COMPANIES, TOOL_SEARCH_LEADS,
};
pub use validate::validate;
pub use workflow::{build_workflow, prepare_step_args, WorkflowCtx};

// Re-export the protocol types alongside the core.
pub use stream_event::{AgentEvent, FinalResult, ResponseKind, StepProgress, StepStatus};

/// When running `cargo test -p cadenza`, initializes tracing from
/// `RUST_LOG` so unit tests can print logs with `--nocapture`.
#[cfg(test)]
mod test_logging {
    use ctor::ctor;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::Layer;

    #[ctor]
    fn init() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_filter(filter),
            )
            .try_init();
    }
}
