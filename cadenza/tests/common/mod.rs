//! Shared helpers for workflow integration tests.

use std::sync::Arc;

use cadenza::{
    AgentConfig, AgentEvent, InMemoryStore, MockCrm, MockLlm, SalesAgent, StepStatus,
};
use tokio_stream::StreamExt;

/// Builds an agent over scripted LLM/CRM and an in-memory store, keeping
/// typed handles to the mocks for scripting and call assertions.
pub fn build_agent() -> (SalesAgent, Arc<MockLlm>, Arc<MockCrm>) {
    let llm = Arc::new(MockLlm::new());
    let crm = Arc::new(MockCrm::new());
    let store = Arc::new(InMemoryStore::new());
    let agent = SalesAgent::new(
        llm.clone(),
        crm.clone(),
        store,
        AgentConfig {
            user_id: "test-user".into(),
            ..Default::default()
        },
    )
    .expect("workflow compiles");
    (agent, llm, crm)
}

/// Collects every event of one chat turn.
pub async fn collect(agent: &SalesAgent, message: &str, session: &str) -> Vec<AgentEvent> {
    agent.chat(message, session, None).collect().await
}

/// Extracts the plan payload and plan id from a `plan_review` event.
pub fn plan_review(events: &[AgentEvent]) -> (serde_json::Value, String) {
    events
        .iter()
        .find_map(|e| match e {
            AgentEvent::PlanReview { plan, plan_id, .. } => {
                Some((plan.clone(), plan_id.clone()))
            }
            _ => None,
        })
        .expect("plan_review event present")
}

pub fn final_result(events: &[AgentEvent]) -> cadenza::FinalResult {
    events
        .iter()
        .find_map(|e| match e {
            AgentEvent::Result { result } => Some(result.clone()),
            _ => None,
        })
        .expect("result event present")
}

pub fn progress_statuses(events: &[AgentEvent]) -> Vec<(String, StepStatus)> {
    events
        .iter()
        .filter_map(|e| match e {
            AgentEvent::Progress { progress, .. } => {
                Some((progress.step_id.clone(), progress.status))
            }
            _ => None,
        })
        .collect()
}

pub fn has_done(events: &[AgentEvent]) -> bool {
    events.iter().any(|e| matches!(e, AgentEvent::Done { .. }))
}
