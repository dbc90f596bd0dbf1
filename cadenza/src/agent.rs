//! The conversational agent: one `chat` call per turn, streaming events.
//!
//! Thread-id policy: a fresh turn pre-generates its `plan_id` and
//! checkpoints under it, so a paused plan can never be resumed by an
//! unrelated message on the same session. Resume commands carry the
//! `plan_id` explicitly. Turns that end without a plan re-key their final
//! checkpoint under `session_id`; committing a plan garbage-collects that
//! pre-plan checkpoint.

use std::sync::Arc;

use serde_json::Value;
use stream_event::{AgentEvent, FinalResult};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use crate::analyzer::{DependencyAnalyzer, MissingToolAnalyzer};
use crate::compress::{CompressionConfig, TokenCounter};
use crate::crm::CrmClient;
use crate::enums::{EnumCatalog, EnumMapper};
use crate::error::ResumeError;
use crate::graph::{CompilationError, CompiledStateGraph, StreamEvent};
use crate::llm::LlmClient;
use crate::memory::{Checkpoint, Checkpointer, MemorySaver, RunnableConfig};
use crate::message::{Message, Role};
use crate::plan::{generate_plan_id, ExecutionPlan};
use crate::resume::ResumeCommand;
use crate::state::WorkflowState;
use crate::store::{
    merge_messages, merge_tool_outputs, ConversationStore, SessionRecord, SessionSummary,
    StoreError, DEFAULT_TITLE,
};
use crate::title::TitleGenerator;
use crate::tools::default_registry;
use crate::validate::validate;
use crate::workflow::{build_workflow, WorkflowCtx, NODE_EXECUTE_STEP, NODE_REVIEW_PLAN};

/// Keep at most this many messages per session.
const MAX_HISTORY_MESSAGES: usize = 200;

/// Event channel depth; slow consumers apply backpressure to the run.
const EVENT_QUEUE_CAPACITY: usize = 128;

/// Tunables for [`SalesAgent`].
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Default agent model when the session has no preference.
    pub model: String,
    /// Models tried after the preferred one fails.
    pub fallback_models: Vec<String>,
    /// Cheap models for analyzers (enum mapping, missing tools, deps).
    pub analyzer_models: Vec<String>,
    /// Cheap models for title generation.
    pub title_models: Vec<String>,
    /// User scope for the conversation store.
    pub user_id: String,
    pub compression: CompressionConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "openai/gpt-4o-mini".to_string(),
            fallback_models: vec!["anthropic/claude-3.5-sonnet".to_string()],
            analyzer_models: vec![
                "openai/gpt-4o-mini".to_string(),
                "anthropic/claude-3.5-sonnet".to_string(),
            ],
            title_models: vec!["openai/gpt-4o-mini".to_string()],
            user_id: "default".to_string(),
            compression: CompressionConfig::default(),
        }
    }
}

struct AgentInner {
    ctx: Arc<WorkflowCtx>,
    workflow: CompiledStateGraph<WorkflowState>,
    checkpointer: Arc<MemorySaver<WorkflowState>>,
    title: TitleGenerator,
    config: AgentConfig,
}

/// Sales-development assistant: turns user messages into reviewed,
/// dependency-scheduled tool workflows.
#[derive(Clone)]
pub struct SalesAgent {
    inner: Arc<AgentInner>,
}

impl SalesAgent {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        crm: Arc<dyn CrmClient>,
        store: Arc<dyn ConversationStore>,
        config: AgentConfig,
    ) -> Result<Self, CompilationError> {
        Self::with_catalog(llm, crm, store, config, EnumCatalog::default())
    }

    pub fn with_catalog(
        llm: Arc<dyn LlmClient>,
        crm: Arc<dyn CrmClient>,
        store: Arc<dyn ConversationStore>,
        config: AgentConfig,
        catalog: EnumCatalog,
    ) -> Result<Self, CompilationError> {
        let registry = default_registry(crm, llm.clone(), config.analyzer_models.clone());
        let ctx = Arc::new(WorkflowCtx {
            registry,
            store,
            user_id: config.user_id.clone(),
            enum_mapper: EnumMapper::new(llm.clone(), catalog, config.analyzer_models.clone()),
            missing_analyzer: MissingToolAnalyzer::new(
                llm.clone(),
                config.analyzer_models.clone(),
            ),
            dependency_analyzer: DependencyAnalyzer::new(
                llm.clone(),
                config.analyzer_models.clone(),
            ),
            compression: config.compression.clone(),
            token_counter: TokenCounter::new(),
            fallback_models: config.fallback_models.clone(),
            llm: llm.clone(),
        });
        let checkpointer = Arc::new(MemorySaver::<WorkflowState>::new());
        let workflow = build_workflow(ctx.clone(), checkpointer.clone())?;
        let title = TitleGenerator::new(llm, config.title_models.clone());
        Ok(Self {
            inner: Arc::new(AgentInner {
                ctx,
                workflow,
                checkpointer,
                title,
                config,
            }),
        })
    }

    /// One turn: returns the event stream for this request. The stream
    /// ends after `done`, after `plan_review` (awaiting a resume call),
    /// or after `error`.
    pub fn chat(
        &self,
        message: impl Into<String>,
        session_id: impl Into<String>,
        model: Option<String>,
    ) -> ReceiverStream<AgentEvent> {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let inner = self.inner.clone();
        let message = message.into();
        let session_id = session_id.into();

        tokio::spawn(async move {
            let model_hint = model.clone().unwrap_or_else(|| inner.config.model.clone());
            let _ = tx
                .send(AgentEvent::Connected {
                    session_id: session_id.clone(),
                    model: model_hint,
                })
                .await;

            let outcome = if ResumeCommand::is_resume_message(&message) {
                inner.run_resume(&message, &session_id, &tx).await
            } else {
                inner.run_new_turn(&message, &session_id, model, &tx).await
            };
            if let Err(e) = outcome {
                warn!(session_id = %session_id, error = %e, "turn failed");
                let _ = tx
                    .send(AgentEvent::Error {
                        error: e,
                        message: "An error occurred during processing".to_string(),
                    })
                    .await;
            }
        });

        ReceiverStream::new(rx)
    }

    /// Full durable conversation for a session.
    pub async fn get_conversation(&self, session_id: &str) -> Result<SessionRecord, StoreError> {
        self.inner
            .ctx
            .store
            .load(&self.inner.config.user_id, session_id)
            .await
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<(), StoreError> {
        self.inner.ctx.store.delete(session_id).await
    }

    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>, StoreError> {
        self.inner
            .ctx
            .store
            .list_sessions(&self.inner.config.user_id)
            .await
    }
}

impl AgentInner {
    async fn run_new_turn(
        &self,
        message: &str,
        session_id: &str,
        model: Option<String>,
        tx: &mpsc::Sender<AgentEvent>,
    ) -> Result<(), String> {
        let record = self
            .ctx
            .store
            .load(&self.ctx.user_id, session_id)
            .await
            .map_err(|e| e.to_string())?;
        let model = model
            .or_else(|| record.model.clone())
            .unwrap_or_else(|| self.config.model.clone());

        let mut history = merge_messages(&record.messages, &[Message::user(message)]);
        if history.len() > MAX_HISTORY_MESSAGES {
            history = history[history.len() - MAX_HISTORY_MESSAGES..].to_vec();
        }

        let needs_title = history.len() >= 3 && record.title == DEFAULT_TITLE;
        if needs_title {
            let _ = tx
                .send(AgentEvent::TitleUpdateTriggered {
                    session_id: session_id.to_string(),
                })
                .await;
        }
        let user_messages: Vec<String> = history
            .iter()
            .filter(|m| m.role == Role::User && !m.is_resume_command())
            .map(|m| m.content_str().to_string())
            .collect();

        // The plan id doubles as the checkpoint thread id from the start,
        // isolating this turn's pause point from other session traffic.
        let plan_id = generate_plan_id();
        info!(session_id, plan_id = %plan_id, "new workflow turn");
        let state = WorkflowState {
            session_id: session_id.to_string(),
            messages: history,
            model: model.clone(),
            plan_id: Some(plan_id.clone()),
            ..Default::default()
        };
        let config = RunnableConfig {
            thread_id: Some(plan_id),
            resume_from_node_id: None,
        };
        self.run_streaming(state, config, Some(model), session_id, tx)
            .await?;

        // Title refresh runs after the turn so it never races the turn's
        // save; the stream has already closed by the time this writes.
        if needs_title {
            self.update_title(session_id, &user_messages).await;
        }
        Ok(())
    }

    async fn run_resume(
        &self,
        message: &str,
        session_id: &str,
        tx: &mpsc::Sender<AgentEvent>,
    ) -> Result<(), String> {
        let command = ResumeCommand::parse(message).map_err(|e| e.to_string())?;
        let plan_id = command.plan_id().to_string();
        let thread = RunnableConfig {
            thread_id: Some(plan_id.clone()),
            resume_from_node_id: None,
        };
        let checkpoint = self
            .checkpointer
            .get_tuple(&thread)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| ResumeError::MissingCheckpoint(plan_id.clone()).to_string())?;

        let mut state = checkpoint.state;
        if state.execution_plan.is_none() {
            return Err(ResumeError::MissingPlan(plan_id).to_string());
        }
        state.session_id = session_id.to_string();
        state.messages = merge_messages(&state.messages, &[Message::user(message)]);

        if let ResumeCommand::Edit { plan, .. } = &command {
            let edited = parse_edited_plan(plan, &plan_id).map_err(|e| e.to_string())?;
            info!(plan_id = %plan_id, steps = edited.steps.len(), "plan replaced by edit");
            state.execution_plan = Some(edited);
            state.plan_id = Some(plan_id.clone());
            state.completed_steps.clear();
            state.step_results.clear();
        }
        state.plan_approved = true;

        // Persist the updated state before re-entering so a crash between
        // here and the first wave resumes from the approved plan.
        self.checkpointer
            .put(&thread, &Checkpoint::from_state(state.clone()))
            .await
            .map_err(|e| e.to_string())?;

        info!(plan_id = %plan_id, "resuming workflow at review");
        let config = RunnableConfig {
            thread_id: Some(plan_id),
            resume_from_node_id: Some(NODE_REVIEW_PLAN.to_string()),
        };
        self.run_streaming(state, config, None, session_id, tx).await
    }

    /// Drives one graph run, translating stream events to agent events and
    /// finalizing (persist + result + done) unless the run paused.
    async fn run_streaming(
        &self,
        state: WorkflowState,
        config: RunnableConfig,
        model: Option<String>,
        session_id: &str,
        tx: &mpsc::Sender<AgentEvent>,
    ) -> Result<(), String> {
        let mut stream = self.workflow.stream(state, Some(config));
        let mut final_state: Option<WorkflowState> = None;
        let mut paused = false;

        while let Some(event) = stream.next().await {
            match event {
                StreamEvent::Updates { state, .. } => {
                    final_state = Some(state);
                }
                StreamEvent::Progress(progress) => {
                    let _ = tx
                        .send(AgentEvent::Progress {
                            node: NODE_EXECUTE_STEP.to_string(),
                            progress,
                        })
                        .await;
                }
                StreamEvent::Interrupted(interrupt) => {
                    paused = true;
                    let plan = interrupt
                        .value
                        .get("plan")
                        .cloned()
                        .unwrap_or(Value::Null);
                    let plan_id = interrupt.id.clone().unwrap_or_default();
                    let message = interrupt
                        .value
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("Please review the execution plan.")
                        .to_string();
                    let _ = tx
                        .send(AgentEvent::PlanReview {
                            plan,
                            plan_id,
                            message,
                            session_id: session_id.to_string(),
                        })
                        .await;
                }
            }
        }

        if paused {
            // The plan committed under its own thread; the session-keyed
            // pre-plan checkpoint (if any) is now stale.
            let _ = self
                .checkpointer
                .delete_thread(&session_config(session_id))
                .await;
            debug!(session_id, "turn paused for plan review");
            return Ok(());
        }

        let state = final_state.ok_or_else(|| "workflow produced no state".to_string())?;
        self.persist_turn(&state, model).await?;
        self.rekey_planless_checkpoint(&state).await;

        let result = state
            .final_result
            .clone()
            .unwrap_or_else(|| FinalResult::text("Done."));
        let _ = tx.send(AgentEvent::Result { result }).await;
        let _ = tx
            .send(AgentEvent::Done {
                message: "Workflow completed".to_string(),
            })
            .await;
        Ok(())
    }

    /// Merges the turn's messages and tool outputs into the durable record.
    async fn persist_turn(&self, state: &WorkflowState, model: Option<String>) -> Result<(), String> {
        let record = self
            .ctx
            .store
            .load(&self.ctx.user_id, &state.session_id)
            .await
            .map_err(|e| e.to_string())?;
        let updated = SessionRecord {
            messages: merge_messages(&record.messages, &state.messages),
            tool_outputs: merge_tool_outputs(&record.tool_outputs, &state.tool_outputs),
            title: record.title.clone(),
            model: model.or(record.model),
        };
        self.ctx
            .store
            .save(&self.ctx.user_id, &state.session_id, &updated)
            .await
            .map_err(|e| e.to_string())
    }

    /// Pure-Q&A turns keep no plan; move their checkpoint from the
    /// pre-generated plan thread to the session thread.
    async fn rekey_planless_checkpoint(&self, state: &WorkflowState) {
        if state.execution_plan.is_some() {
            return;
        }
        let Some(plan_id) = &state.plan_id else {
            return;
        };
        let _ = self
            .checkpointer
            .put(
                &session_config(&state.session_id),
                &Checkpoint::from_state(state.clone()),
            )
            .await;
        let _ = self
            .checkpointer
            .delete_thread(&RunnableConfig {
                thread_id: Some(plan_id.clone()),
                resume_from_node_id: None,
            })
            .await;
    }

    async fn update_title(&self, session_id: &str, user_messages: &[String]) {
        let title = self.title.generate(user_messages).await;
        match self.ctx.store.load(&self.ctx.user_id, session_id).await {
            Ok(mut record) => {
                record.title = title;
                if let Err(e) = self
                    .ctx
                    .store
                    .save(&self.ctx.user_id, session_id, &record)
                    .await
                {
                    warn!(error = %e, "saving generated title failed");
                }
            }
            Err(e) => warn!(error = %e, "loading session for title failed"),
        }
    }
}

fn session_config(session_id: &str) -> RunnableConfig {
    RunnableConfig {
        thread_id: Some(session_id.to_string()),
        resume_from_node_id: None,
    }
}

/// Parses and sanitizes an edited plan: the plan id is forced back to the
/// paused plan's id, every step's arguments go through the schema filter
/// again (C2; enum mapping and missing-tool analysis are not re-run), and
/// the structure must validate.
fn parse_edited_plan(plan: &Value, plan_id: &str) -> Result<ExecutionPlan, ResumeError> {
    let mut edited: ExecutionPlan = serde_json::from_value(plan.clone())
        .map_err(|e| ResumeError::InvalidPlan(e.to_string()))?;
    edited.plan_id = plan_id.to_string();
    for step in &mut edited.steps {
        step.tool_args = validate(&step.tool_name, &step.tool_args);
    }
    edited
        .validate()
        .map_err(|e| ResumeError::InvalidPlan(e.to_string()))?;
    Ok(edited)
}
