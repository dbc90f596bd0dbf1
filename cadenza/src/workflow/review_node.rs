//! `review_plan` node: the static human-approval interrupt.
//!
//! On first entry the node raises an interrupt carrying the plan; the run
//! loop checkpoints the thread and the stream surfaces a `plan_review`
//! event. The resume path updates the checkpointed state (approval
//! message, edited plan, `plan_approved`) and re-enters here, at which
//! point the node simply passes through to `execute_step`.

use async_trait::async_trait;
use serde_json::json;

use crate::error::WorkflowError;
use crate::graph::{GraphInterrupt, Interrupt, Next, Node};
use crate::state::WorkflowState;

use super::{NODE_RESPOND, NODE_REVIEW_PLAN};

pub struct ReviewPlanNode;

#[async_trait]
impl Node<WorkflowState> for ReviewPlanNode {
    fn id(&self) -> &str {
        NODE_REVIEW_PLAN
    }

    async fn run(&self, state: WorkflowState) -> Result<(WorkflowState, Next), WorkflowError> {
        let Some(plan) = &state.execution_plan else {
            return Ok((state, Next::Node(NODE_RESPOND.to_string())));
        };

        if !state.plan_approved {
            let plan_id = plan.plan_id.clone();
            let payload = json!({
                "plan": plan,
                "plan_id": plan_id,
                "message": format!(
                    "Please review and approve/edit the execution plan. (Plan ID: {plan_id})"
                ),
                "session_id": state.session_id,
            });
            return Err(WorkflowError::Interrupted(GraphInterrupt(
                Interrupt::with_id(payload, plan_id),
            )));
        }

        Ok((state, Next::Continue))
    }
}
