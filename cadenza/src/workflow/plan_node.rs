//! `plan_execution` node: tool-call normalization and plan creation.
//!
//! Pipeline over the LLM's raw tool calls:
//! validate → enum-map → missing-tool augmentation → validate + context
//! mapping → dependency analysis → plan build. The plan id is generated
//! up front by the agent (it doubles as the checkpoint thread id) and is
//! preserved here when already present.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::context::{apply_context_mapping, build_context};
use crate::error::WorkflowError;
use crate::graph::{Next, Node};
use crate::message::{Message, Role, ToolCall, AUTO_CALL_PREFIX};
use crate::plan::{generate_plan_id, ExecutionPlan};
use crate::state::WorkflowState;
use crate::store::merge_messages;
use crate::validate::validate;

use super::{WorkflowCtx, NODE_PLAN_EXECUTION, NODE_RESPOND};

pub struct PlanExecutionNode {
    ctx: Arc<WorkflowCtx>,
}

impl PlanExecutionNode {
    pub fn new(ctx: Arc<WorkflowCtx>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Node<WorkflowState> for PlanExecutionNode {
    fn id(&self) -> &str {
        NODE_PLAN_EXECUTION
    }

    async fn run(&self, mut state: WorkflowState) -> Result<(WorkflowState, Next), WorkflowError> {
        let ctx = &self.ctx;
        let Some(raw_calls) = state
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant && m.tool_calls.is_some())
            .and_then(|m| m.tool_calls.clone())
        else {
            return Ok((state, Next::Node(NODE_RESPOND.to_string())));
        };

        let record = ctx
            .store
            .load(&ctx.user_id, &state.session_id)
            .await
            .unwrap_or_default();
        let context = build_context(&state.messages, &record.tool_outputs);
        let user_message = state.last_user_message().unwrap_or_default();

        // First validation pass + enum mapping on the LLM's own calls.
        let mut calls: Vec<ToolCall> = Vec::with_capacity(raw_calls.len());
        for call in raw_calls {
            let validated = validate(&call.name, &call.arguments);
            let mapped = ctx.enum_mapper.map_args(&call.name, &validated).await;
            calls.push(ToolCall::new(call.id, call.name, mapped));
        }

        // Missing-tool augmentation.
        let current_tools: Vec<String> = calls.iter().map(|c| c.name.clone()).collect();
        let report = ctx
            .missing_analyzer
            .check(&user_message, &current_tools, &context)
            .await;
        if report.has_missing_tools {
            info!(missing = ?report.missing_tools, "adding system-generated tool calls");
            let mut added = Vec::new();
            for tool_name in &report.missing_tools {
                let args = crate::analyzer::default_args_for(tool_name, &user_message, &context);
                calls.push(ToolCall::new(
                    format!("{AUTO_CALL_PREFIX}{tool_name}_{}", calls.len()),
                    tool_name.clone(),
                    args,
                ));
                added.push(tool_name.clone());
            }

            // Reflect the augmentation in the assistant message so history
            // stays consistent with the executed calls.
            if let Some(msg) = state
                .messages
                .iter_mut()
                .rev()
                .find(|m| m.role == Role::Assistant && m.tool_calls.is_some())
            {
                msg.tool_calls = Some(calls.clone());
            }
            let note = Message {
                role: Role::System,
                content: Some(format!(
                    "System automatically added {} missing tool call(s) to complete the \
                     workflow: {}.",
                    added.len(),
                    added.join(", ")
                )),
                tool_calls: None,
                tool_call_id: None,
            };
            state.messages = merge_messages(&state.messages, &[note]);
        }

        // Second validation pass plus context mapping over the final set.
        for call in &mut calls {
            let validated = validate(&call.name, &call.arguments);
            call.arguments = apply_context_mapping(&call.name, &validated, &context.summary);
        }

        let analysis = ctx
            .dependency_analyzer
            .analyze(&user_message, &calls, &context)
            .await;

        // The pre-generated plan id keeps the checkpoint thread stable
        // across the review interrupt.
        let plan_id = state.plan_id.clone().unwrap_or_else(generate_plan_id);
        let plan = ExecutionPlan::build(
            plan_id.clone(),
            &calls,
            analysis.execution_type,
            &analysis.dependencies,
        );
        debug!(
            plan_id = %plan_id,
            execution_type = plan.execution_type.as_str(),
            steps = plan.steps.len(),
            "execution plan created"
        );

        state.plan_id = Some(plan_id);
        state.execution_plan = Some(plan);
        state.completed_steps.clear();
        state.step_results.clear();
        state.final_result = None;
        // Fresh plans always pause for review; resume sets this flag.
        state.plan_approved = false;

        Ok((state, Next::Continue))
    }
}
