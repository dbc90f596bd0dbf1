//! Structured digest of folded conversation history.
//!
//! Sections: Active Workflow State (recent tool activity + current goal),
//! Tool Execution Context (per-tool call counts and result sizes), User
//! Goals & Decisions (up to three recent goal-indicating user messages).

use std::collections::BTreeMap;

use serde_json::Value;

use crate::message::{Message, Role};

use super::tokens::TokenCounter;

const GOAL_KEYWORDS: [&str; 8] = [
    "find", "search", "generate", "create", "send", "help", "need", "want",
];
const MAX_GOALS: usize = 3;

/// Builds the digest text for the folded messages. Returns `None` only
/// for an empty input.
pub fn build_digest(messages: &[Message], counter: &TokenCounter) -> Option<String> {
    if messages.is_empty() {
        return None;
    }
    let folded_tokens = counter.count_messages(messages);
    let mut parts = vec![format!(
        "[Compressed History | {} messages | ~{} tokens folded]",
        messages.len(),
        folded_tokens
    )];

    if let Some(state) = workflow_state(messages) {
        parts.push(String::new());
        parts.push("## Active Workflow State".to_string());
        parts.push(state);
    }
    if let Some(tools) = tool_context(messages) {
        parts.push(String::new());
        parts.push("## Tool Execution Context".to_string());
        parts.push(tools);
    }
    if let Some(goals) = user_goals(messages) {
        parts.push(String::new());
        parts.push("## User Goals & Decisions".to_string());
        parts.push(goals);
    }

    Some(parts.join("\n"))
}

/// Recent tool activity and the current goal.
fn workflow_state(messages: &[Message]) -> Option<String> {
    let mut lines = Vec::new();

    let mut recent_tools: BTreeMap<&str, usize> = BTreeMap::new();
    for msg in messages.iter().rev().take(10) {
        if let Some(calls) = &msg.tool_calls {
            for call in calls {
                *recent_tools.entry(call.name.as_str()).or_default() += 1;
            }
        }
    }
    if !recent_tools.is_empty() {
        let text = recent_tools
            .iter()
            .map(|(name, count)| format!("{name}({count}x)"))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!("- Active tools: {text}"));
    }

    if let Some(goal) = messages
        .iter()
        .rev()
        .filter(|m| m.role == Role::User)
        .map(|m| m.content_str())
        .find(|c| {
            let lowered = c.to_lowercase();
            GOAL_KEYWORDS.iter().any(|k| lowered.contains(k))
        })
    {
        lines.push(format!("- Current goal: {}", clip(goal, 100)));
    }

    (!lines.is_empty()).then(|| lines.join("\n"))
}

/// Per-tool call counts plus result sizes parsed from tool messages.
fn tool_context(messages: &[Message]) -> Option<String> {
    let mut executed: BTreeMap<&str, usize> = BTreeMap::new();
    let mut results: BTreeMap<String, usize> = BTreeMap::new();

    for msg in messages {
        if let Some(calls) = &msg.tool_calls {
            for call in calls {
                *executed.entry(call.name.as_str()).or_default() += 1;
            }
        }
        if msg.role == Role::Tool {
            if let Ok(parsed) = serde_json::from_str::<Value>(msg.content_str()) {
                for key in ["contacts", "companies", "emails"] {
                    if let Some(list) = parsed.get(key).and_then(Value::as_array) {
                        *results.entry(key.to_string()).or_default() += list.len();
                    }
                }
            }
        }
    }

    let mut lines = Vec::new();
    if !executed.is_empty() {
        let text = executed
            .iter()
            .map(|(name, count)| format!("{name}({count}x)"))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!("- Tools executed: {text}"));
    }
    if !results.is_empty() {
        let text = results
            .iter()
            .map(|(key, count)| format!("{key}: {count}"))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!("- Results available: {text}"));
    }
    (!lines.is_empty()).then(|| lines.join("\n"))
}

/// The last few goal-indicating user messages.
fn user_goals(messages: &[Message]) -> Option<String> {
    let goals: Vec<String> = messages
        .iter()
        .filter(|m| m.role == Role::User)
        .map(|m| m.content_str())
        .filter(|c| {
            let lowered = c.to_lowercase();
            GOAL_KEYWORDS.iter().any(|k| lowered.contains(k))
        })
        .map(|c| format!("- {}", clip(&c.replace('\n', " "), 150)))
        .collect();
    if goals.is_empty() {
        return None;
    }
    let start = goals.len().saturating_sub(MAX_GOALS);
    Some(goals[start..].join("\n"))
}

fn clip(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
