//! `check_completion` and `respond` nodes: aggregate and finalize.

use async_trait::async_trait;
use serde_json::{Map, Value};
use stream_event::{FinalResult, ResponseKind};

use crate::error::WorkflowError;
use crate::graph::{Next, Node};
use crate::state::WorkflowState;
use crate::tools::{
    TOOL_ADD_CONTACTS_TO_CADENCE, TOOL_CREATE_CADENCE, TOOL_GENERATE_EMAIL,
    TOOL_SEARCH_COMPANIES, TOOL_SEARCH_LEADS,
};

use super::{result_summary, NODE_CHECK_COMPLETION, NODE_RESPOND};

/// Aggregates per-step summaries into the turn's final result.
pub struct CheckCompletionNode;

#[async_trait]
impl Node<WorkflowState> for CheckCompletionNode {
    fn id(&self) -> &str {
        NODE_CHECK_COMPLETION
    }

    async fn run(&self, mut state: WorkflowState) -> Result<(WorkflowState, Next), WorkflowError> {
        let Some(plan) = &state.execution_plan else {
            return Ok((state, Next::Continue));
        };

        // Only this plan's steps count; stale results from earlier plans on
        // the same thread are ignored.
        let mut data = Map::new();
        for step in &plan.steps {
            let Some(result) = state.step_results.get(&step.step_id) else {
                continue;
            };
            if let Value::Object(summary) = result_summary(result) {
                for (k, v) in summary {
                    data.insert(k, v);
                }
            }
        }

        let mut message = format!(
            "Completed {} steps in {} mode.",
            plan.steps.len(),
            plan.execution_type.as_str()
        );
        let found: Vec<String> = data
            .iter()
            .filter_map(|(k, v)| {
                k.strip_suffix("_found")
                    .map(|entity| format!("{v} {entity}"))
            })
            .collect();
        if !found.is_empty() {
            message.push_str(&format!(" Found: {}.", found.join(", ")));
        }
        let failed = plan
            .steps
            .iter()
            .filter(|s| state.step_failed(&s.step_id))
            .count();
        if failed > 0 {
            message.push_str(&format!(" {failed} step(s) failed."));
        }

        let tool_names: Vec<&str> = plan.steps.iter().map(|s| s.tool_name.as_str()).collect();
        let tool_outputs: Vec<Value> = state
            .tool_outputs
            .iter()
            .filter_map(|o| serde_json::to_value(o).ok())
            .collect();

        state.final_result = Some(FinalResult {
            kind: ResponseKind::ToolResponse,
            execution_type: Some(plan.execution_type.as_str().to_string()),
            message,
            data: Value::Object(data),
            suggested_actions: suggest_user_actions(&tool_names),
            tool_outputs,
        });
        Ok((state, Next::Continue))
    }
}

/// Finalizes the turn: a text reply when no tool work happened, otherwise
/// the aggregated result from `check_completion`.
pub struct RespondNode;

#[async_trait]
impl Node<WorkflowState> for RespondNode {
    fn id(&self) -> &str {
        NODE_RESPOND
    }

    async fn run(&self, mut state: WorkflowState) -> Result<(WorkflowState, Next), WorkflowError> {
        if state.final_result.is_none() {
            let text = state
                .last_assistant_reply()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "How can I help you with your sales workflow?".to_string());
            state.final_result = Some(FinalResult::text(text));
        }
        Ok((state, Next::End))
    }
}

/// Follow-up suggestions per executed tool, deduplicated and ordered.
pub fn suggest_user_actions(tool_names: &[&str]) -> Vec<String> {
    let mut suggestions: Vec<&str> = Vec::new();
    let mut push_all = |items: &[&'static str], suggestions: &mut Vec<&str>| {
        for item in items {
            if !suggestions.contains(item) {
                suggestions.push(item);
            }
        }
    };
    if tool_names.contains(&TOOL_SEARCH_LEADS) {
        push_all(
            &[
                "Start an outreach campaign for these contacts",
                "Generate personalized emails for these contacts",
                "Create a cadence for follow-up outreach",
            ],
            &mut suggestions,
        );
    }
    if tool_names.contains(&TOOL_SEARCH_COMPANIES) {
        push_all(
            &[
                "Find contacts at these companies",
                "Search for decision makers at these companies",
                "Generate company-specific outreach emails",
            ],
            &mut suggestions,
        );
    }
    if tool_names.contains(&TOOL_GENERATE_EMAIL) {
        push_all(
            &[
                "Create a cadence using this email template",
                "Search for more contacts to send this email to",
            ],
            &mut suggestions,
        );
    }
    if tool_names.contains(&TOOL_CREATE_CADENCE) {
        push_all(
            &[
                "Add more contacts to this cadence",
                "Monitor cadence performance",
            ],
            &mut suggestions,
        );
    }
    if tool_names.contains(&TOOL_ADD_CONTACTS_TO_CADENCE) {
        push_all(
            &[
                "Review and activate the cadence",
                "Monitor outreach performance",
            ],
            &mut suggestions,
        );
    }
    suggestions.into_iter().map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Message, ToolCall};
    use crate::plan::{ExecutionPlan, ExecutionType};
    use crate::store::ToolOutput;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn state_with_results() -> WorkflowState {
        let calls = vec![
            ToolCall::new("c0", TOOL_SEARCH_LEADS, json!({})),
            ToolCall::new("c1", TOOL_SEARCH_COMPANIES, json!({})),
        ];
        let plan = ExecutionPlan::build(
            "plan_1_abcd1234".into(),
            &calls,
            ExecutionType::Parallel,
            &BTreeMap::new(),
        );
        let mut state = WorkflowState {
            execution_plan: Some(plan),
            plan_id: Some("plan_1_abcd1234".into()),
            ..Default::default()
        };
        state.step_results.insert(
            "step_0".into(),
            json!({"contacts": [{"id": "1"}, {"id": "2"}]}),
        );
        state
            .step_results
            .insert("step_1".into(), json!({"companies": [{"id": "9"}]}));
        state.tool_outputs.push(ToolOutput {
            tool_call_id: "c0".into(),
            tool_name: TOOL_SEARCH_LEADS.into(),
            step_id: "step_0".into(),
            plan_id: "plan_1_abcd1234".into(),
            result: json!({"contacts": []}),
            description: "Execute search_leads".into(),
        });
        state
    }

    /// **Scenario**: Aggregation reports counts from both steps and
    /// carries the turn's tool outputs.
    #[tokio::test]
    async fn aggregates_counts() {
        let (state, _) = CheckCompletionNode
            .run(state_with_results())
            .await
            .unwrap();
        let result = state.final_result.unwrap();
        assert_eq!(result.kind, ResponseKind::ToolResponse);
        assert_eq!(result.execution_type.as_deref(), Some("parallel"));
        assert_eq!(result.data["contacts_found"], 2);
        assert_eq!(result.data["companies_found"], 1);
        assert!(result.message.contains("Completed 2 steps in parallel mode."));
        assert_eq!(result.tool_outputs.len(), 1);
        assert!(!result.suggested_actions.is_empty());
    }

    /// **Scenario**: Failed steps are counted in the aggregate message.
    #[tokio::test]
    async fn counts_failures() {
        let mut state = state_with_results();
        state.step_results.insert(
            "step_1".into(),
            json!({"error": "boom", "status": "failed"}),
        );
        let (state, _) = CheckCompletionNode.run(state).await.unwrap();
        assert!(state.final_result.unwrap().message.contains("1 step(s) failed."));
    }

    /// **Scenario**: respond falls back to the last assistant reply when
    /// no plan ran.
    #[tokio::test]
    async fn respond_text_fallback() {
        let mut state = WorkflowState::default();
        state.messages.push(Message::assistant("Here is my answer."));
        let (state, next) = RespondNode.run(state).await.unwrap();
        assert_eq!(next, Next::End);
        let result = state.final_result.unwrap();
        assert_eq!(result.kind, ResponseKind::TextResponse);
        assert_eq!(result.message, "Here is my answer.");
    }

    /// **Scenario**: Suggestions dedupe across tools and stay ordered.
    #[test]
    fn suggestions_deduped() {
        let suggestions =
            suggest_user_actions(&[TOOL_SEARCH_LEADS, TOOL_SEARCH_LEADS, TOOL_CREATE_CADENCE]);
        let unique: std::collections::HashSet<_> = suggestions.iter().collect();
        assert_eq!(unique.len(), suggestions.len());
        assert!(suggestions.contains(&"Add more contacts to this cadence".to_string()));
    }
}
