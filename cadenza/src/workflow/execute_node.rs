//! `execute_step` node: run every ready step concurrently.
//!
//! One node tick = one ready wave. Steps with a `skip_reason` complete
//! immediately without a call; everything else gets its arguments prepared
//! (dependency injection + schema filter), runs concurrently, and records
//! a result whether it succeeded or failed. A failed step still completes
//! so its dependents can fail fast with `dependency-failed` instead of
//! deadlocking the plan.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::{json, Map, Value};
use stream_event::{StepProgress, StepStatus};
use tracing::{debug, warn};

use crate::error::{StepError, WorkflowError};
use crate::graph::{Next, Node, RunContext};
use crate::message::Message;
use crate::plan::{ExecutionPlan, ExecutionStep};
use crate::state::WorkflowState;
use crate::store::{merge_messages, ToolOutput};
use crate::tools::{
    id_string, ToolContext, TOOL_ADD_CONTACTS_TO_CADENCE, TOOL_CREATE_CADENCE,
    TOOL_SEARCH_COMPANIES, TOOL_SEARCH_LEADS,
};
use crate::validate::validate;

use super::{result_summary, WorkflowCtx, NODE_EXECUTE_STEP};

pub struct ExecuteStepNode {
    ctx: Arc<WorkflowCtx>,
}

impl ExecuteStepNode {
    pub fn new(ctx: Arc<WorkflowCtx>) -> Self {
        Self { ctx }
    }

    async fn emit(
        run_ctx: Option<&RunContext<WorkflowState>>,
        step: &ExecutionStep,
        status: StepStatus,
        message: String,
        summary: Option<Value>,
    ) {
        if let Some(ctx) = run_ctx {
            ctx.emit_progress(StepProgress {
                step_id: step.step_id.clone(),
                description: step.description.clone(),
                status,
                message,
                result_summary: summary,
            })
            .await;
        }
    }

    async fn execute(
        &self,
        mut state: WorkflowState,
        run_ctx: Option<&RunContext<WorkflowState>>,
    ) -> Result<(WorkflowState, Next), WorkflowError> {
        let Some(plan) = state.execution_plan.clone() else {
            return Ok((state, Next::Continue));
        };
        let ready: Vec<ExecutionStep> = plan
            .ready_steps(&state.completed_steps)
            .into_iter()
            .cloned()
            .collect();
        if ready.is_empty() {
            return Ok((state, Next::Continue));
        }
        debug!(count = ready.len(), "executing ready wave");

        let (skipped, runnable): (Vec<_>, Vec<_>) =
            ready.into_iter().partition(|s| s.skip_reason.is_some());

        // Skipped steps unblock their dependents but produce no call, no
        // result, and no tool output.
        for step in &skipped {
            debug!(step = %step.step_id, reason = ?step.skip_reason, "skipping step");
            state.completed_steps.push(step.step_id.clone());
        }

        let mut wave = Vec::with_capacity(runnable.len());
        for step in runnable {
            Self::emit(
                run_ctx,
                &step,
                StepStatus::Running,
                format!("Executing {}", step.tool_name),
                None,
            )
            .await;

            let prepared = prepare_step_args(&step, &state.step_results);
            let tool = self.ctx.registry.get(&step.tool_name);
            let tool_ctx = ToolContext {
                session_id: state.session_id.clone(),
            };
            wave.push(async move {
                let result: Result<Value, StepError> = match prepared {
                    Err(e) => Err(e),
                    Ok(args) => match tool {
                        None => Err(StepError::UnknownTool(step.tool_name.clone())),
                        Some(tool) => tool
                            .call(args, &tool_ctx)
                            .await
                            .map_err(|e| e.to_step_error()),
                    },
                };
                (step, result)
            });
        }

        let plan_id = state.plan_id.clone().unwrap_or_else(|| "unknown".into());
        let mut new_messages: Vec<Message> = Vec::new();

        for (step, outcome) in join_all(wave).await {
            let (value, failed) = match outcome {
                Ok(v) => (v, false),
                Err(e) => {
                    warn!(step = %step.step_id, error = %e, "step failed");
                    (
                        json!({
                            "error": format!("Step '{}' failed: {e}", step.step_id),
                            "kind": e.kind(),
                            "status": "failed",
                        }),
                        true,
                    )
                }
            };

            state
                .step_results
                .insert(step.step_id.clone(), value.clone());
            state.completed_steps.push(step.step_id.clone());
            state.tool_outputs.push(ToolOutput {
                tool_call_id: step.tool_call_id.clone(),
                tool_name: step.tool_name.clone(),
                step_id: step.step_id.clone(),
                plan_id: plan_id.clone(),
                result: value.clone(),
                description: step.description.clone(),
            });

            let summary = result_summary(&value);
            let content = if failed {
                format!(
                    "Error: {}",
                    value.get("error").and_then(Value::as_str).unwrap_or("failed")
                )
            } else {
                format!("Completed {}: {summary}", step.tool_name)
            };
            new_messages.push(Message::tool(&step.tool_call_id, content));

            if failed {
                Self::emit(
                    run_ctx,
                    &step,
                    StepStatus::Failed,
                    value
                        .get("error")
                        .and_then(Value::as_str)
                        .unwrap_or("failed")
                        .to_string(),
                    None,
                )
                .await;
            } else {
                Self::emit(
                    run_ctx,
                    &step,
                    StepStatus::Completed,
                    format!("Completed {}", step.tool_name),
                    Some(summary),
                )
                .await;
                if let Some(plan) = state.execution_plan.as_mut() {
                    prune_empty_searches(plan, &state.completed_steps, &step, &value);
                }
            }
        }

        // One bridging assistant message per tick; the dedup merge keeps a
        // single copy across ticks.
        new_messages.push(Message::bridging_assistant());
        state.messages = merge_messages(&state.messages, &new_messages);

        let complete = state
            .execution_plan
            .as_ref()
            .map(|p| p.is_complete(&state.completed_steps))
            .unwrap_or(true);
        if complete {
            Ok((state, Next::Continue))
        } else {
            Ok((state, Next::Node(NODE_EXECUTE_STEP.to_string())))
        }
    }
}

#[async_trait]
impl Node<WorkflowState> for ExecuteStepNode {
    fn id(&self) -> &str {
        NODE_EXECUTE_STEP
    }

    async fn run(
        &self,
        state: WorkflowState,
    ) -> Result<(WorkflowState, Next), WorkflowError> {
        self.execute(state, None).await
    }

    async fn run_with_context(
        &self,
        state: WorkflowState,
        ctx: &RunContext<WorkflowState>,
    ) -> Result<(WorkflowState, Next), WorkflowError> {
        self.execute(state, Some(ctx)).await
    }
}

fn as_object(args: Value) -> Map<String, Value> {
    match args {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Step ids ordered by numeric suffix (`step_2` before `step_10`).
fn ordered_results(step_results: &BTreeMap<String, Value>) -> Vec<(&String, &Value)> {
    let mut entries: Vec<_> = step_results.iter().collect();
    entries.sort_by_key(|(id, _)| {
        id.strip_prefix("step_")
            .and_then(|i| i.parse::<usize>().ok())
            .unwrap_or(usize::MAX)
    });
    entries
}

/// Prepares a step's arguments: dependency injection per the rules below,
/// the recipients rescue scan, then the schema filter. Fails with
/// `dependency-failed` when any dependency recorded a failed result.
///
/// | dependent | source field | target argument |
/// |---|---|---|
/// | search_leads | companies[].id | companyIds |
/// | search_companies | contacts[].company_name (uniqued) | companyName |
/// | create_cadence | {body, subject} | template_details |
/// | add_contacts_to_cadence | {cadence_id, cadence_name} | cadence_id, name |
/// | add_contacts_to_cadence | contacts[].id (uniqued) | recipients_ids |
pub fn prepare_step_args(
    step: &ExecutionStep,
    step_results: &BTreeMap<String, Value>,
) -> Result<Value, StepError> {
    let mut args = as_object(step.tool_args.clone());

    if step.use_previous_results {
        for dep in &step.depends_on {
            let Some(dep_result) = step_results.get(dep) else {
                continue;
            };
            if dep_result.get("status").and_then(Value::as_str) == Some("failed") {
                return Err(StepError::DependencyFailed(format!(
                    "Cannot execute. Dependency '{dep}' failed."
                )));
            }
            inject_dependency(&step.tool_name, &mut args, dep_result);
        }
    }

    if step.tool_name == TOOL_ADD_CONTACTS_TO_CADENCE {
        rescue_recipients(&mut args, step_results);
    }

    Ok(validate(&step.tool_name, &Value::Object(args)))
}

fn inject_dependency(tool_name: &str, args: &mut Map<String, Value>, dep_result: &Value) {
    match tool_name {
        TOOL_SEARCH_LEADS => {
            if let Some(companies) = dep_result.get("companies").and_then(Value::as_array) {
                let ids: Vec<Value> = companies
                    .iter()
                    .filter_map(|c| c.get("id").and_then(id_string))
                    .map(Value::String)
                    .collect();
                args.insert("companyIds".into(), Value::Array(ids));
            }
        }
        TOOL_SEARCH_COMPANIES => {
            if let Some(contacts) = dep_result.get("contacts").and_then(Value::as_array) {
                let mut names: Vec<String> = Vec::new();
                for contact in contacts {
                    if let Some(name) = contact.get("company_name").and_then(Value::as_str) {
                        if !name.is_empty() && !names.iter().any(|n| n == name) {
                            names.push(name.to_string());
                        }
                    }
                }
                args.insert(
                    "companyName".into(),
                    Value::Array(names.into_iter().map(Value::String).collect()),
                );
            }
        }
        TOOL_CREATE_CADENCE => {
            let body = dep_result.get("body").and_then(Value::as_str);
            let subject = dep_result.get("subject").and_then(Value::as_str);
            if let (Some(body), Some(subject)) = (body, subject) {
                args.insert(
                    "template_details".into(),
                    json!({"body": body, "subject": subject}),
                );
            }
        }
        TOOL_ADD_CONTACTS_TO_CADENCE => {
            let cadence_id = dep_result.get("cadence_id").and_then(id_string);
            let cadence_name = dep_result.get("cadence_name").and_then(id_string);
            if let (Some(id), Some(name)) = (cadence_id, cadence_name) {
                args.insert("cadence_id".into(), Value::String(id));
                args.insert("name".into(), Value::String(name));
            }
            if let Some(contacts) = dep_result.get("contacts").and_then(Value::as_array) {
                let mut ids: Vec<String> = Vec::new();
                for contact in contacts {
                    if let Some(id) = contact.get("id").and_then(id_string) {
                        if !ids.contains(&id) {
                            ids.push(id);
                        }
                    }
                }
                args.insert(
                    "recipients_ids".into(),
                    Value::Array(ids.into_iter().map(Value::String).collect()),
                );
            }
        }
        _ => {}
    }
}

/// When `recipients_ids` is still missing or not a list of digit strings,
/// take the ids from the first step result in the plan that has contacts.
fn rescue_recipients(args: &mut Map<String, Value>, step_results: &BTreeMap<String, Value>) {
    let usable = args
        .get("recipients_ids")
        .and_then(Value::as_array)
        .is_some_and(|list| {
            !list.is_empty()
                && list.iter().all(|v| {
                    v.as_str()
                        .is_some_and(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))
                })
        });
    if usable {
        return;
    }
    for (step_id, result) in ordered_results(step_results) {
        let Some(contacts) = result.get("contacts").and_then(Value::as_array) else {
            continue;
        };
        let mut ids: Vec<String> = Vec::new();
        for contact in contacts {
            if let Some(id) = contact.get("id").and_then(id_string) {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        if !ids.is_empty() {
            debug!(step = %step_id, count = ids.len(), "recipients rescued from workflow results");
            args.insert(
                "recipients_ids".into(),
                Value::Array(ids.into_iter().map(Value::String).collect()),
            );
            return;
        }
    }
}

/// After an empty search result, independent opposite-direction searches
/// are pointless; mark them skipped. Dependent searches keep running (a
/// cadence later in the plan may still need them).
fn prune_empty_searches(
    plan: &mut ExecutionPlan,
    completed: &[String],
    step: &ExecutionStep,
    result: &Value,
) {
    let (empty_key, sibling_tool, reason) = match step.tool_name.as_str() {
        TOOL_SEARCH_LEADS => ("contacts", TOOL_SEARCH_COMPANIES, "no contacts found"),
        TOOL_SEARCH_COMPANIES => ("companies", TOOL_SEARCH_LEADS, "no companies found"),
        _ => return,
    };
    let is_empty = result
        .get(empty_key)
        .and_then(Value::as_array)
        .map_or(true, |l| l.is_empty());
    if !is_empty {
        return;
    }
    for other in plan.steps.iter_mut() {
        if other.tool_name == sibling_tool
            && !completed.contains(&other.step_id)
            && other.depends_on.is_empty()
            && other.skip_reason.is_none()
        {
            debug!(step = %other.step_id, reason, "marking sibling search for skipping");
            other.skip_reason = Some(reason.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ToolCall;
    use crate::plan::ExecutionType;

    fn step(id: &str, tool: &str, args: Value, deps: &[&str]) -> ExecutionStep {
        ExecutionStep {
            step_id: id.to_string(),
            tool_call_id: format!("call-{id}"),
            tool_name: tool.to_string(),
            tool_args: args,
            description: format!("Execute {tool}"),
            depends_on: deps.iter().map(|s| s.to_string()).collect(),
            use_previous_results: !deps.is_empty(),
            skip_reason: None,
        }
    }

    /// **Scenario**: search_leads gets companyIds from a dependency's
    /// companies.
    #[test]
    fn injects_company_ids() {
        let mut results = BTreeMap::new();
        results.insert(
            "step_0".to_string(),
            json!({"companies": [{"id": 1, "name": "A"}, {"id": "2", "name": "B"}]}),
        );
        let s = step("step_1", TOOL_SEARCH_LEADS, json!({}), &["step_0"]);
        let args = prepare_step_args(&s, &results).unwrap();
        assert_eq!(args["companyIds"], json!(["1", "2"]));
    }

    /// **Scenario**: search_companies gets uniqued company names from a
    /// dependency's contacts.
    #[test]
    fn injects_unique_company_names() {
        let mut results = BTreeMap::new();
        results.insert(
            "step_0".to_string(),
            json!({"contacts": [
                {"id": "1", "company_name": "Acme"},
                {"id": "2", "company_name": "Acme"},
                {"id": "3", "company_name": "Globex"}
            ]}),
        );
        let s = step("step_1", TOOL_SEARCH_COMPANIES, json!({}), &["step_0"]);
        let args = prepare_step_args(&s, &results).unwrap();
        assert_eq!(args["companyName"], json!(["Acme", "Globex"]));
    }

    /// **Scenario**: create_cadence receives the email as template_details
    /// and add_contacts receives cadence identity plus recipient ids.
    #[test]
    fn injects_template_and_cadence() {
        let mut results = BTreeMap::new();
        results.insert(
            "step_0".to_string(),
            json!({"body": "Hello", "subject": "Intro"}),
        );
        let s = step("step_1", TOOL_CREATE_CADENCE, json!({"name": "X"}), &["step_0"]);
        let args = prepare_step_args(&s, &results).unwrap();
        assert_eq!(args["template_details"]["subject"], "Intro");

        let mut results = BTreeMap::new();
        results.insert(
            "step_0".to_string(),
            json!({"cadence_id": "cad-1", "cadence_name": "Fintech AI"}),
        );
        let s = step(
            "step_1",
            TOOL_ADD_CONTACTS_TO_CADENCE,
            json!({"recipients_ids": ["11"]}),
            &["step_0"],
        );
        let args = prepare_step_args(&s, &results).unwrap();
        assert_eq!(args["cadence_id"], "cad-1");
        assert_eq!(args["name"], "Fintech AI");
        assert_eq!(args["recipients_ids"], json!(["11"]));
    }

    /// **Scenario**: A failed dependency aborts preparation with
    /// dependency-failed.
    #[test]
    fn failed_dependency_aborts() {
        let mut results = BTreeMap::new();
        results.insert(
            "step_0".to_string(),
            json!({"error": "boom", "status": "failed"}),
        );
        let s = step("step_1", TOOL_CREATE_CADENCE, json!({"name": "X"}), &["step_0"]);
        let err = prepare_step_args(&s, &results).unwrap_err();
        assert_eq!(err.kind(), "dependency-failed");
    }

    /// **Scenario**: Non-digit recipients trigger the rescue scan over
    /// plan results, lowest step first.
    #[test]
    fn rescue_scan_replaces_bad_recipients() {
        let mut results = BTreeMap::new();
        results.insert("step_0".to_string(), json!({"companies": []}));
        results.insert(
            "step_1".to_string(),
            json!({"contacts": [{"id": "21"}, {"id": "22"}, {"id": "21"}]}),
        );
        let s = step(
            "step_2",
            TOOL_ADD_CONTACTS_TO_CADENCE,
            json!({"cadence_id": "cad-1", "recipients_ids": ["John Smith"]}),
            &[],
        );
        let args = prepare_step_args(&s, &results).unwrap();
        assert_eq!(args["recipients_ids"], json!(["21", "22"]));
    }

    /// **Scenario**: Empty search_leads marks only independent sibling
    /// company searches for skipping.
    #[test]
    fn prune_marks_independent_siblings() {
        let calls = vec![
            ToolCall::new("c0", TOOL_SEARCH_LEADS, json!({})),
            ToolCall::new("c1", TOOL_SEARCH_COMPANIES, json!({})),
            ToolCall::new("c2", TOOL_SEARCH_COMPANIES, json!({})),
        ];
        let deps: BTreeMap<String, Vec<String>> =
            [("step_2".to_string(), vec!["step_0".to_string()])].into();
        let mut plan = ExecutionPlan::build(
            "plan_1_abcd1234".into(),
            &calls,
            ExecutionType::Sequential,
            &deps,
        );
        let lead_step = plan.steps[0].clone();
        prune_empty_searches(
            &mut plan,
            &["step_0".to_string()],
            &lead_step,
            &json!({"contacts": []}),
        );
        assert_eq!(
            plan.steps[1].skip_reason.as_deref(),
            Some("no contacts found")
        );
        assert!(plan.steps[2].skip_reason.is_none(), "dependent search kept");
    }
}
