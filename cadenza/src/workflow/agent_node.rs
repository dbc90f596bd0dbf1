//! `agent` node: one LLM turn deciding the next action.

use std::sync::Arc;

use async_trait::async_trait;

use crate::assemble::{assemble_llm_messages, normalize_assistant_message};
use crate::compress::compress_if_needed;
use crate::error::WorkflowError;
use crate::graph::{Next, Node};
use crate::llm::{purpose, ChatRequest, LlmError};
use crate::message::Message;
use crate::state::WorkflowState;
use crate::store::merge_tool_outputs;

use super::{WorkflowCtx, NODE_AGENT, NODE_RESPOND};

/// Calls the LLM with assembled history plus tool schemas and normalizes
/// the reply. Routes to `plan_execution` when tools were requested,
/// straight to `respond` otherwise. LLM failures become a plain assistant
/// reply and end the turn with no plan.
pub struct AgentNode {
    ctx: Arc<WorkflowCtx>,
}

impl AgentNode {
    pub fn new(ctx: Arc<WorkflowCtx>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Node<WorkflowState> for AgentNode {
    fn id(&self) -> &str {
        NODE_AGENT
    }

    async fn run(&self, mut state: WorkflowState) -> Result<(WorkflowState, Next), WorkflowError> {
        let ctx = &self.ctx;
        // Durable outputs are the authoritative source for tool results;
        // merge in anything from the current turn.
        let record = ctx
            .store
            .load(&ctx.user_id, &state.session_id)
            .await
            .unwrap_or_default();
        let all_outputs = merge_tool_outputs(&record.tool_outputs, &state.tool_outputs);

        let api_messages = assemble_llm_messages(&state.model, &state.messages, &all_outputs);
        let (api_messages, _stats) = compress_if_needed(
            api_messages,
            &ctx.llm,
            &ctx.compression,
            &ctx.token_counter,
        )
        .await;

        let request = ChatRequest::new(
            purpose::AGENT,
            ctx.agent_models(&state.model),
            api_messages,
        )
        .with_tools(ctx.registry.specs())
        .with_temperature(0.1);

        match ctx.llm.complete(request).await {
            Ok(outcome) => {
                let has_tools = !outcome.tool_calls.is_empty();
                state
                    .messages
                    .push(normalize_assistant_message(outcome.content, outcome.tool_calls));
                if has_tools {
                    Ok((state, Next::Continue))
                } else {
                    Ok((state, Next::Node(NODE_RESPOND.to_string())))
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "agent LLM call failed");
                let reply = match e {
                    LlmError::Network(_) => "A network error occurred. Please try again.",
                    _ => "An unexpected error occurred. Please try again.",
                };
                state.messages.push(Message::assistant(reply));
                Ok((state, Next::Node(NODE_RESPOND.to_string())))
            }
        }
    }
}
