//! Execution plans: steps, dependencies, readiness.
//!
//! A plan is the DAG of tool calls derived for one user turn. Step ids are
//! `step_<index>` in tool-call emission order; `depends_on` must stay
//! acyclic; a parallel plan has no dependencies at all. Plans serialize
//! losslessly (including `skip_reason`) because they cross the review
//! interrupt as JSON.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::message::ToolCall;

/// `plan_<unix-secs>_<8 hex>`.
static PLAN_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^plan_[0-9]+_[0-9a-f]+$").expect("plan id regex"));

/// Whether steps run as one concurrent wave or in dependency order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionType {
    Sequential,
    Parallel,
}

impl ExecutionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionType::Sequential => "sequential",
            ExecutionType::Parallel => "parallel",
        }
    }
}

/// One step of an execution plan.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStep {
    pub step_id: String,
    pub tool_call_id: String,
    pub tool_name: String,
    pub tool_args: Value,
    pub description: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub use_previous_results: bool,
    /// Set when the step should be skipped (e.g. sibling search found
    /// nothing); skipped steps complete immediately without a call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
}

/// Invalid plan shape (duplicate ids, unknown deps, cycles).
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("duplicate step id: {0}")]
    DuplicateStepId(String),
    #[error("step {step} depends on unknown step {dependency}")]
    UnknownDependency { step: String, dependency: String },
    #[error("dependency cycle involving {0}")]
    Cycle(String),
}

/// The immutable plan for one turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub plan_id: String,
    pub execution_type: ExecutionType,
    pub steps: Vec<ExecutionStep>,
    pub description: String,
}

impl ExecutionPlan {
    /// Builds a plan from tool calls and an analyzed dependency map.
    /// `step_i` ids follow tool-call order; `use_previous_results` is set
    /// iff the step has dependencies.
    pub fn build(
        plan_id: String,
        tool_calls: &[ToolCall],
        execution_type: ExecutionType,
        dependencies: &BTreeMap<String, Vec<String>>,
    ) -> Self {
        let steps: Vec<ExecutionStep> = tool_calls
            .iter()
            .enumerate()
            .map(|(i, call)| {
                let step_id = format!("step_{i}");
                let depends_on = dependencies.get(&step_id).cloned().unwrap_or_default();
                ExecutionStep {
                    use_previous_results: !depends_on.is_empty(),
                    step_id,
                    tool_call_id: call.id.clone(),
                    tool_name: call.name.clone(),
                    tool_args: call.arguments.clone(),
                    description: format!("Execute {}", call.name),
                    depends_on,
                    skip_reason: None,
                }
            })
            .collect();
        let description = format!(
            "{} execution of {} steps",
            execution_type.as_str(),
            steps.len()
        );
        Self {
            plan_id,
            execution_type,
            steps,
            description,
        }
    }

    /// Steps ready to run: not completed, all dependencies completed.
    pub fn ready_steps(&self, completed: &[String]) -> Vec<&ExecutionStep> {
        let done: HashSet<&str> = completed.iter().map(String::as_str).collect();
        self.steps
            .iter()
            .filter(|s| !done.contains(s.step_id.as_str()))
            .filter(|s| s.depends_on.iter().all(|d| done.contains(d.as_str())))
            .collect()
    }

    pub fn is_complete(&self, completed: &[String]) -> bool {
        let done: HashSet<&str> = completed.iter().map(String::as_str).collect();
        self.steps.iter().all(|s| done.contains(s.step_id.as_str()))
    }

    pub fn step(&self, step_id: &str) -> Option<&ExecutionStep> {
        self.steps.iter().find(|s| s.step_id == step_id)
    }

    pub fn step_mut(&mut self, step_id: &str) -> Option<&mut ExecutionStep> {
        self.steps.iter_mut().find(|s| s.step_id == step_id)
    }

    /// Structural validation: unique step ids, known dependencies, no
    /// cycles, and (for parallel plans) no dependencies at all.
    pub fn validate(&self) -> Result<(), PlanError> {
        let mut ids = HashSet::new();
        for step in &self.steps {
            if !ids.insert(step.step_id.as_str()) {
                return Err(PlanError::DuplicateStepId(step.step_id.clone()));
            }
        }
        for step in &self.steps {
            for dep in &step.depends_on {
                if !ids.contains(dep.as_str()) {
                    return Err(PlanError::UnknownDependency {
                        step: step.step_id.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        // Kahn's algorithm: anything left over sits on a cycle.
        let mut indegree: HashMap<&str, usize> = self
            .steps
            .iter()
            .map(|s| (s.step_id.as_str(), s.depends_on.len()))
            .collect();
        let mut queue: Vec<&str> = indegree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut seen = 0usize;
        while let Some(id) = queue.pop() {
            seen += 1;
            for step in &self.steps {
                if step.depends_on.iter().any(|d| d == id) {
                    if let Some(entry) = indegree.get_mut(step.step_id.as_str()) {
                        *entry -= 1;
                        if *entry == 0 {
                            queue.push(step.step_id.as_str());
                        }
                    }
                }
            }
        }
        if seen != self.steps.len() {
            let stuck = indegree
                .iter()
                .find(|(_, d)| **d > 0)
                .map(|(id, _)| id.to_string())
                .unwrap_or_default();
            return Err(PlanError::Cycle(stuck));
        }
        Ok(())
    }
}

/// Generates a fresh plan id: `plan_<unix-secs>_<8 hex>`.
pub fn generate_plan_id() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let suffix = Uuid::new_v4().simple().to_string();
    format!("plan_{}_{}", secs, &suffix[..8])
}

/// True when the id matches the `plan_[0-9]+_[0-9a-f]+` grammar.
pub fn is_valid_plan_id(id: &str) -> bool {
    PLAN_ID_RE.is_match(id)
}
