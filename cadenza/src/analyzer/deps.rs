//! Dependency analysis: execution type + step dependency map.
//!
//! The dependency rules are authoritative regardless of what the LLM
//! answers:
//! - `generate_email` never depends on anything;
//! - `create_cadence` depends on `generate_email` when both are in the
//!   plan, and may depend on searches feeding its recipients;
//! - `add_contacts_to_cadence` depends only on `create_cadence` (search
//!   dependencies are transitive);
//! - searches may depend on each other in either direction ("…and their
//!   employees" / "…and their companies");
//! - cycles are repaired, never surfaced.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::context::ContextInfo;
use crate::llm::{json_repair, purpose, ChatRequest, LlmClient};
use crate::message::{Message, ToolCall};
use crate::plan::ExecutionType;
use crate::tools::{
    TOOL_ADD_CONTACTS_TO_CADENCE, TOOL_CREATE_CADENCE, TOOL_GENERATE_EMAIL,
    TOOL_SEARCH_COMPANIES, TOOL_SEARCH_LEADS,
};

/// Analyzer result: how to schedule the tool calls.
#[derive(Clone, Debug)]
pub struct DependencyAnalysis {
    pub execution_type: ExecutionType,
    pub dependencies: BTreeMap<String, Vec<String>>,
    pub confidence: f32,
    pub reasoning: String,
}

impl DependencyAnalysis {
    fn fallback() -> Self {
        Self {
            execution_type: ExecutionType::Sequential,
            dependencies: BTreeMap::new(),
            confidence: 0.0,
            reasoning: "Could not determine dependencies automatically.".to_string(),
        }
    }
}

/// LLM-driven dependency analyzer with rule-based cycle repair.
pub struct DependencyAnalyzer {
    llm: Arc<dyn LlmClient>,
    models: Vec<String>,
}

impl DependencyAnalyzer {
    pub fn new(llm: Arc<dyn LlmClient>, models: Vec<String>) -> Self {
        Self { llm, models }
    }

    pub async fn analyze(
        &self,
        user_message: &str,
        tool_calls: &[ToolCall],
        context: &ContextInfo,
    ) -> DependencyAnalysis {
        if tool_calls.len() <= 1 {
            return DependencyAnalysis {
                execution_type: ExecutionType::Parallel,
                dependencies: BTreeMap::new(),
                confidence: 1.0,
                reasoning: "Single tool call requires no dependency analysis".to_string(),
            };
        }

        let request = ChatRequest::new(
            purpose::ANALYZE_DEPENDENCIES,
            self.models.clone(),
            vec![
                Message::system(system_prompt(context)),
                Message::user(user_prompt(user_message, tool_calls)),
            ],
        )
        .with_temperature(0.1)
        .json();

        let outcome = match self.llm.complete(request).await {
            Ok(o) => o,
            Err(e) => {
                warn!(error = %e, "dependency analysis failed, using sequential fallback");
                return DependencyAnalysis::fallback();
            }
        };
        let Some(parsed) = json_repair::parse_object(&outcome.content) else {
            return DependencyAnalysis::fallback();
        };

        let raw_deps = parsed
            .get("dependencies")
            .and_then(Value::as_object)
            .map(|obj| {
                obj.iter()
                    .map(|(k, v)| {
                        let deps: Vec<String> = v
                            .as_array()
                            .map(|l| {
                                l.iter()
                                    .filter_map(|d| d.as_str().map(String::from))
                                    .collect()
                            })
                            .unwrap_or_default();
                        (k.clone(), deps)
                    })
                    .collect::<BTreeMap<_, _>>()
            })
            .unwrap_or_default();

        let dependencies = repair_dependencies(raw_deps, tool_calls);

        // Normalize: an empty dependency set means a parallel plan, any
        // edge makes it sequential, whatever the model claimed.
        let execution_type = if dependencies.values().all(|d| d.is_empty()) {
            ExecutionType::Parallel
        } else {
            ExecutionType::Sequential
        };

        let analysis = DependencyAnalysis {
            execution_type,
            dependencies,
            confidence: parsed
                .get("confidence")
                .and_then(Value::as_f64)
                .map(|c| c as f32)
                .unwrap_or(0.5),
            reasoning: parsed
                .get("reasoning")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        };
        debug!(
            execution_type = analysis.execution_type.as_str(),
            dependencies = ?analysis.dependencies,
            "dependency analysis"
        );
        analysis
    }
}

/// Cleans the LLM's dependency map: unknown step ids and self-edges are
/// dropped, mutual pairs are rewritten by the tool rules, and anything
/// still cyclic loses edges by emission order.
pub fn repair_dependencies(
    raw: BTreeMap<String, Vec<String>>,
    tool_calls: &[ToolCall],
) -> BTreeMap<String, Vec<String>> {
    let known: Vec<String> = (0..tool_calls.len()).map(|i| format!("step_{i}")).collect();
    let known_set: HashSet<&str> = known.iter().map(String::as_str).collect();
    let tool_of = |step: &str| -> &str {
        step.strip_prefix("step_")
            .and_then(|i| i.parse::<usize>().ok())
            .and_then(|i| tool_calls.get(i))
            .map(|c| c.name.as_str())
            .unwrap_or("")
    };

    // Drop unknown step ids, unknown dependency refs, self-edges, dupes.
    let mut deps: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (step, list) in raw {
        if !known_set.contains(step.as_str()) {
            continue;
        }
        let mut seen = HashSet::new();
        let cleaned: Vec<String> = list
            .into_iter()
            .filter(|d| known_set.contains(d.as_str()) && *d != step)
            .filter(|d| seen.insert(d.clone()))
            .collect();
        if !cleaned.is_empty() {
            deps.insert(step, cleaned);
        }
    }

    // Mutual pairs: rewrite by tool rules.
    let mutual: Vec<(String, String)> = deps
        .iter()
        .flat_map(|(step, list)| {
            list.iter()
                .filter(|d| {
                    deps.get(*d)
                        .is_some_and(|back| back.iter().any(|b| b == step))
                })
                .map(|d| (step.clone(), d.clone()))
                .collect::<Vec<_>>()
        })
        .collect();
    if !mutual.is_empty() {
        warn!(pairs = ?mutual, "circular dependencies detected, repairing");
        let cyclic: HashSet<String> = mutual
            .iter()
            .flat_map(|(a, b)| [a.clone(), b.clone()])
            .collect();
        for step in &cyclic {
            match tool_of(step) {
                TOOL_ADD_CONTACTS_TO_CADENCE => {
                    // Keep only the create_cadence dependency, if present.
                    let create = known.iter().find(|s| tool_of(s) == TOOL_CREATE_CADENCE);
                    match create {
                        Some(create) => {
                            deps.insert(step.clone(), vec![create.clone()]);
                        }
                        None => {
                            deps.remove(step);
                        }
                    }
                }
                TOOL_CREATE_CADENCE => {
                    // Keep only search/email dependencies.
                    let valid: Vec<String> = known
                        .iter()
                        .filter(|s| {
                            matches!(
                                tool_of(s),
                                TOOL_SEARCH_LEADS | TOOL_SEARCH_COMPANIES | TOOL_GENERATE_EMAIL
                            )
                        })
                        .cloned()
                        .collect();
                    if valid.is_empty() {
                        deps.remove(step);
                    } else {
                        deps.insert(step.clone(), valid);
                    }
                }
                _ => {
                    // Search↔search: the earlier-emitted step drops its
                    // edge onto the later one.
                    if let Some((a, b)) = mutual.iter().find(|(a, _)| a == step) {
                        if step_index(a) < step_index(b) {
                            if let Some(list) = deps.get_mut(a) {
                                list.retain(|d| d != b);
                                if list.is_empty() {
                                    deps.remove(a);
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    // Final guard: drop edges until the graph is acyclic. Clearing the
    // lowest-index stuck step's edges always terminates.
    while let Some(stuck) = find_cyclic_step(&deps, &known) {
        warn!(step = %stuck, "residual cycle, dropping its dependencies");
        deps.remove(&stuck);
    }

    deps
}

fn step_index(step: &str) -> usize {
    step.strip_prefix("step_")
        .and_then(|i| i.parse().ok())
        .unwrap_or(usize::MAX)
}

/// Kahn's algorithm; returns the lowest-index step stuck on a cycle.
fn find_cyclic_step(deps: &BTreeMap<String, Vec<String>>, known: &[String]) -> Option<String> {
    let mut indegree: BTreeMap<&str, usize> = known
        .iter()
        .map(|s| (s.as_str(), deps.get(s).map_or(0, Vec::len)))
        .collect();
    let mut queue: Vec<&str> = indegree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(s, _)| *s)
        .collect();
    let mut seen = 0usize;
    while let Some(done) = queue.pop() {
        seen += 1;
        for (step, list) in deps {
            if list.iter().any(|d| d == done) {
                let entry = indegree.get_mut(step.as_str())?;
                *entry -= 1;
                if *entry == 0 {
                    queue.push(step.as_str());
                }
            }
        }
    }
    if seen == known.len() {
        return None;
    }
    indegree
        .into_iter()
        .filter(|(_, d)| *d > 0)
        .map(|(s, _)| s.to_string())
        .min_by_key(|s| step_index(s))
}

fn system_prompt(context: &ContextInfo) -> String {
    let mut parts = vec![
        "You analyze sales-workflow dependencies: which tools need outputs from other tools \
         in the CURRENT batch."
            .to_string(),
    ];
    if !context.summary.is_empty() {
        parts.push("\n## Previous Tool Results Available".to_string());
        if !context.summary.contact_ids.is_empty() {
            parts.push(format!(
                "- CONTACTS ALREADY FOUND: {} contacts available",
                context.summary.contact_ids.len()
            ));
        }
        if !context.summary.company_ids.is_empty() || !context.summary.company_names.is_empty() {
            parts.push("- COMPANIES ALREADY FOUND".to_string());
        }
        if context.summary.email_content.is_some() {
            parts.push("- EMAIL ALREADY GENERATED".to_string());
        }
        if let Some(id) = &context.summary.cadence_id {
            parts.push(format!("- CADENCE ALREADY EXISTS: id {id}"));
        }
        parts.push(
            "Only create dependencies between tools in the CURRENT batch; never depend on \
             tools completed in previous turns."
                .to_string(),
        );
    }
    parts.push(
        [
            "",
            "## Dependency Rules:",
            "1. search_leads may depend on search_companies (contacts from specific companies) \
             and vice versa (companies for specific contacts).",
            "2. generate_email is ALWAYS independent.",
            "3. create_cadence depends on generate_email when both are in the current batch \
             (email becomes template_details); it may also depend on searches that provide \
             recipients. When the email template already exists from previous turns, do not \
             depend on generate_email.",
            "4. add_contacts_to_cadence depends on create_cadence when both are in the current \
             batch and NEVER directly on search tools; it is independent only when the cadence \
             already exists from previous turns.",
            "5. NO circular dependencies, ever.",
            "",
            "## Response Format:",
            "Return JSON: {\"execution_type\": \"sequential\"|\"parallel\", \"confidence\": \
             0.0-1.0, \"reasoning\": string, \"dependencies\": {\"step_1\": [\"step_0\"]}}.",
            "All tools independent => parallel with empty dependencies.",
        ]
        .join("\n"),
    );
    parts.join("\n")
}

fn user_prompt(user_message: &str, tool_calls: &[ToolCall]) -> String {
    let steps: Vec<String> = tool_calls
        .iter()
        .enumerate()
        .map(|(i, c)| format!("step_{i}: {} args={}", c.name, c.arguments))
        .collect();
    format!(
        "## User Request:\n\"{user_message}\"\n\n## Current Tools:\n{}\n\nDetermine the \
         execution type and dependency map.",
        steps.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmError, MockLlm};
    use serde_json::json;

    fn calls(names: &[&str]) -> Vec<ToolCall> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| ToolCall::new(format!("c{i}"), *n, json!({})))
            .collect()
    }

    fn analyzer(llm: MockLlm) -> DependencyAnalyzer {
        DependencyAnalyzer::new(Arc::new(llm), vec!["m".into()])
    }

    /// **Scenario**: A single tool call is parallel with no dependencies
    /// and full confidence — no LLM call at all.
    #[tokio::test]
    async fn single_call_short_circuits() {
        let llm = MockLlm::new();
        let a = analyzer(llm);
        let analysis = a
            .analyze("find CTOs", &calls(&["search_leads"]), &ContextInfo::default())
            .await;
        assert_eq!(analysis.execution_type, ExecutionType::Parallel);
        assert!(analysis.dependencies.is_empty());
        assert_eq!(analysis.confidence, 1.0);
    }

    /// **Scenario**: A clean LLM answer passes through; non-empty deps
    /// force sequential.
    #[tokio::test]
    async fn clean_analysis_passthrough() {
        let llm = MockLlm::new();
        llm.script_json(
            purpose::ANALYZE_DEPENDENCIES,
            json!({
                "execution_type": "parallel",
                "confidence": 0.9,
                "reasoning": "cadence needs email",
                "dependencies": {"step_1": ["step_0"]}
            }),
        );
        let analysis = analyzer(llm)
            .analyze(
                "write email and create campaign",
                &calls(&["generate_email", "create_cadence"]),
                &ContextInfo::default(),
            )
            .await;
        // Declared parallel but carrying an edge: normalized to sequential.
        assert_eq!(analysis.execution_type, ExecutionType::Sequential);
        assert_eq!(analysis.dependencies["step_1"], vec!["step_0"]);
    }

    /// **Scenario**: LLM failure falls back to sequential with no deps.
    #[tokio::test]
    async fn failure_fallback_sequential() {
        let llm = MockLlm::new();
        llm.script_err(purpose::ANALYZE_DEPENDENCIES, LlmError::Network("down".into()));
        let analysis = analyzer(llm)
            .analyze(
                "do things",
                &calls(&["search_leads", "search_companies"]),
                &ContextInfo::default(),
            )
            .await;
        assert_eq!(analysis.execution_type, ExecutionType::Sequential);
        assert!(analysis.dependencies.is_empty());
        assert_eq!(analysis.confidence, 0.0);
    }

    /// **Scenario**: create_cadence ↔ add_contacts_to_cadence cycle is
    /// rewritten: add_contacts keeps only create_cadence, create_cadence
    /// keeps only search/email deps.
    #[test]
    fn repairs_cadence_cycle() {
        let tool_calls = calls(&["generate_email", "create_cadence", "add_contacts_to_cadence"]);
        let raw: BTreeMap<String, Vec<String>> = [
            ("step_1".to_string(), vec!["step_2".to_string(), "step_0".to_string()]),
            ("step_2".to_string(), vec!["step_1".to_string()]),
        ]
        .into();
        let repaired = repair_dependencies(raw, &tool_calls);
        assert_eq!(repaired["step_2"], vec!["step_1"]);
        assert_eq!(repaired["step_1"], vec!["step_0"]);
    }

    /// **Scenario**: A search↔search cycle drops the earlier-emitted
    /// step's edge (later step keeps depending on the earlier one).
    #[test]
    fn repairs_search_cycle_by_emission_order() {
        let tool_calls = calls(&["search_leads", "search_companies"]);
        let raw: BTreeMap<String, Vec<String>> = [
            ("step_0".to_string(), vec!["step_1".to_string()]),
            ("step_1".to_string(), vec!["step_0".to_string()]),
        ]
        .into();
        let repaired = repair_dependencies(raw, &tool_calls);
        assert!(repaired.get("step_0").is_none());
        assert_eq!(repaired["step_1"], vec!["step_0"]);
    }

    /// **Scenario**: Unknown steps, unknown refs, and self-edges vanish.
    #[test]
    fn drops_unknown_and_self_edges() {
        let tool_calls = calls(&["search_leads", "search_companies"]);
        let raw: BTreeMap<String, Vec<String>> = [
            ("step_1".to_string(),
             vec!["step_1".to_string(), "step_7".to_string(), "step_0".to_string()]),
            ("step_9".to_string(), vec!["step_0".to_string()]),
        ]
        .into();
        let repaired = repair_dependencies(raw, &tool_calls);
        assert_eq!(repaired.len(), 1);
        assert_eq!(repaired["step_1"], vec!["step_0"]);
    }

    /// **Scenario**: A three-step rotation (no mutual pair) still ends up
    /// acyclic via the residual-cycle guard.
    #[test]
    fn breaks_rotation_cycles() {
        let tool_calls = calls(&["search_leads", "search_companies", "search_leads"]);
        let raw: BTreeMap<String, Vec<String>> = [
            ("step_0".to_string(), vec!["step_1".to_string()]),
            ("step_1".to_string(), vec!["step_2".to_string()]),
            ("step_2".to_string(), vec!["step_0".to_string()]),
        ]
        .into();
        let repaired = repair_dependencies(raw, &tool_calls);
        let known: Vec<String> = (0..3).map(|i| format!("step_{i}")).collect();
        assert!(find_cyclic_step(&repaired, &known).is_none());
    }
}
