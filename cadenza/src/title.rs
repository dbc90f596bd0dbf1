//! Session title generation.

use std::sync::Arc;

use tracing::debug;

use crate::llm::{purpose, ChatRequest, LlmClient};
use crate::message::Message;

/// Fallback title when every model fails.
const FALLBACK_TITLE: &str = "Chat in progress";

/// Generates a short session title from the user's messages.
pub struct TitleGenerator {
    llm: Arc<dyn LlmClient>,
    models: Vec<String>,
}

impl TitleGenerator {
    pub fn new(llm: Arc<dyn LlmClient>, models: Vec<String>) -> Self {
        Self { llm, models }
    }

    /// Returns a cleaned title, or "Chat in progress" on failure.
    pub async fn generate(&self, user_messages: &[String]) -> String {
        let summary = user_messages
            .iter()
            .map(|m| format!("- {m}"))
            .collect::<Vec<_>>()
            .join("\n");
        let request = ChatRequest::new(
            purpose::TITLE_GENERATION,
            self.models.clone(),
            vec![
                Message::system(
                    "You create short, concise titles for conversations. Based on the \
                     following messages, generate a title no more than 5-7 words long.",
                ),
                Message::user(format!("Here is the conversation so far:\n{summary}")),
            ],
        )
        .with_temperature(0.5)
        .with_max_tokens(30);

        match self.llm.complete(request).await {
            Ok(outcome) => {
                let cleaned = outcome.content.trim().replace('"', "");
                if cleaned.is_empty() {
                    "Chat Summary".to_string()
                } else {
                    debug!(title = %cleaned, "generated session title");
                    cleaned
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "title generation failed");
                FALLBACK_TITLE.to_string()
            }
        }
    }
}
