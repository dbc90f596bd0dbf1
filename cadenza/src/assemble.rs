//! LLM-facing message assembly.
//!
//! Builds the list sent to the chat API from durable history:
//! 1. model-family system prompt first;
//! 2. stored `tool` messages are skipped and reconstructed from the
//!    durable tool-output map so results survive resume paths;
//! 3. `APPROVE_PLAN:`/`EDIT_PLAN:` user messages are control traffic and
//!    never shown to the model;
//! 4. a bridging assistant message is inserted wherever a `user` message
//!    would directly follow a `tool` message;
//! 5. every tool_call gets a tool message — a synthetic error one when the
//!    durable result is missing.

use std::collections::HashMap;

use serde_json::json;

use crate::message::{Message, Role};
use crate::prompts::system_prompt_for;
use crate::store::ToolOutput;

/// Builds the chat-API message list for one agent call.
pub fn assemble_llm_messages(
    model: &str,
    messages: &[Message],
    tool_outputs: &[ToolOutput],
) -> Vec<Message> {
    let result_map: HashMap<&str, &ToolOutput> = tool_outputs
        .iter()
        .map(|o| (o.tool_call_id.as_str(), o))
        .collect();

    let mut api_messages = vec![Message::system(system_prompt_for(model))];

    for msg in messages {
        // Tool messages are rebuilt from durable outputs below.
        if msg.role == Role::Tool {
            continue;
        }
        if msg.is_resume_command() {
            continue;
        }

        if msg.role == Role::User {
            let last_is_tool = api_messages
                .last()
                .map(|m| m.role == Role::Tool)
                .unwrap_or(false);
            if last_is_tool {
                api_messages.push(Message::bridging_assistant());
            }
        }

        api_messages.push(msg.clone());

        if msg.role == Role::Assistant {
            if let Some(calls) = &msg.tool_calls {
                for call in calls {
                    match result_map.get(call.id.as_str()) {
                        Some(output) => {
                            api_messages
                                .push(Message::tool(&call.id, output.result.to_string()));
                        }
                        None => {
                            tracing::warn!(tool_call_id = %call.id, "tool output not found");
                            api_messages.push(Message::tool(
                                &call.id,
                                json!({
                                    "error": format!("Result for {} not found", call.id)
                                })
                                .to_string(),
                            ));
                        }
                    }
                }
            }
        }
    }

    api_messages
}

/// Normalizes an LLM reply for state: keeps only role/content/tool_calls
/// and guarantees content exists alongside tool calls.
pub fn normalize_assistant_message(content: String, tool_calls: Vec<crate::message::ToolCall>) -> Message {
    if tool_calls.is_empty() {
        Message::assistant(content)
    } else {
        Message::assistant_with_tool_calls(content, tool_calls)
    }
}
