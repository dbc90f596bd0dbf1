//! Conversation compression before LLM calls.
//!
//! Hybrid sliding window + structured digest: system messages are kept
//! verbatim, the most recent window stays untouched, and everything older
//! is folded into one synthetic system message (Active Workflow State /
//! Tool Execution Context / User Goals & Decisions). Only when that digest
//! itself is large does a cheap LLM rewrite run; every failure falls back
//! to truncation, so compression can never fail a turn.

mod config;
mod digest;
mod tokens;

pub use config::CompressionConfig;
pub use tokens::TokenCounter;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::llm::{purpose, ChatRequest, LlmClient};
use crate::message::{Message, Role};

/// What compression did to one message list.
#[derive(Clone, Debug, Default)]
pub struct CompressionStats {
    pub compressed: bool,
    pub original_tokens: u32,
    pub compressed_tokens: u32,
}

/// Compresses the assembled messages when they exceed the high-water mark.
pub async fn compress_if_needed(
    messages: Vec<Message>,
    llm: &Arc<dyn LlmClient>,
    config: &CompressionConfig,
    counter: &TokenCounter,
) -> (Vec<Message>, CompressionStats) {
    let original_tokens = counter.count_messages(&messages);
    // Short conversations are cheap to check and never worth compressing.
    if messages.len() < 10 || original_tokens <= config.max_total_tokens {
        return (
            messages,
            CompressionStats {
                compressed: false,
                original_tokens,
                compressed_tokens: original_tokens,
            },
        );
    }

    let (system_msgs, conv_msgs): (Vec<Message>, Vec<Message>) =
        messages.into_iter().partition(|m| m.role == Role::System);

    let recent_start = conv_msgs.len().saturating_sub(config.recent_keep);
    let middle_start = recent_start.saturating_sub(config.middle_range);
    let old = &conv_msgs[..middle_start];
    let middle = &conv_msgs[middle_start..recent_start];
    let recent = &conv_msgs[recent_start..];

    let mut compressed: Vec<Message> = system_msgs;

    let to_digest: Vec<Message> = old.iter().chain(middle.iter()).cloned().collect();
    if let Some(digest) = digest::build_digest(&to_digest, counter) {
        let digest = finalize_digest(digest, llm, config, counter).await;
        compressed.push(Message::system(digest));
    }
    compressed.extend(recent.iter().cloned());

    let compressed_tokens = counter.count_messages(&compressed);
    debug!(
        original_tokens,
        compressed_tokens,
        recent = recent.len(),
        folded = to_digest.len(),
        "conversation compressed"
    );
    (
        compressed,
        CompressionStats {
            compressed: true,
            original_tokens,
            compressed_tokens,
        },
    )
}

/// Runs the semantic rewrite only when the digest is itself oversized;
/// truncates on any LLM failure.
async fn finalize_digest(
    digest: String,
    llm: &Arc<dyn LlmClient>,
    config: &CompressionConfig,
    counter: &TokenCounter,
) -> String {
    if counter.count_text(&digest) <= config.digest_llm_threshold {
        return digest;
    }
    let request = ChatRequest::new(
        purpose::COMPRESSION,
        config.models.clone(),
        vec![
            Message::system(
                "Compress this conversation context while preserving workflow state, tool \
                 results, user goals, and any ids or numbers. Use structured headers. Be \
                 concise but complete.",
            ),
            Message::user(format!("Compress this context:\n\n{digest}")),
        ],
    )
    .with_temperature(0.1)
    .with_max_tokens(config.semantic_max_tokens);

    match llm.complete(request).await {
        Ok(outcome) if !outcome.content.trim().is_empty() => outcome.content,
        Ok(_) => truncate(&digest),
        Err(e) => {
            warn!(error = %e, "semantic compression failed, truncating digest");
            truncate(&digest)
        }
    }
}

fn truncate(digest: &str) -> String {
    let mut end = 2000.min(digest.len());
    while !digest.is_char_boundary(end) {
        end -= 1;
    }
    digest[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlm;

    fn llm() -> Arc<dyn LlmClient> {
        Arc::new(MockLlm::new())
    }

    fn long_user_messages(count: usize, len: usize) -> Vec<Message> {
        (0..count)
            .map(|i| Message::user(format!("{i} {}", "x".repeat(len))))
            .collect()
    }

    /// **Scenario**: Under the threshold nothing changes.
    #[tokio::test]
    async fn under_threshold_untouched() {
        let config = CompressionConfig::default();
        let counter = TokenCounter::new();
        let messages = vec![Message::system("sys"), Message::user("hello")];
        let (out, stats) =
            compress_if_needed(messages.clone(), &llm(), &config, &counter).await;
        assert!(!stats.compressed);
        assert_eq!(out.len(), messages.len());
    }

    /// **Scenario**: Over the threshold, system messages survive verbatim,
    /// the recent window is kept, and older messages fold into one digest
    /// system message placed right after the original system messages.
    #[tokio::test]
    async fn over_threshold_compresses() {
        let config = CompressionConfig {
            max_total_tokens: 500,
            recent_keep: 5,
            middle_range: 10,
            ..Default::default()
        };
        let counter = TokenCounter::new();
        let mut messages = vec![Message::system("the system prompt")];
        messages.extend(long_user_messages(40, 100));
        let (out, stats) = compress_if_needed(messages, &llm(), &config, &counter).await;

        assert!(stats.compressed);
        assert!(stats.compressed_tokens < stats.original_tokens);
        assert_eq!(out[0].content_str(), "the system prompt");
        assert_eq!(out[0].role, Role::System);
        assert_eq!(out[1].role, Role::System, "digest follows system prompt");
        assert!(out[1].content_str().contains("Compressed History"));
        // 5 recent messages + 2 system messages.
        assert_eq!(out.len(), 7);
        assert!(out.last().unwrap().content_str().starts_with("39 "));
    }

    /// **Scenario**: An oversized digest triggers the semantic rewrite
    /// when scripted, and truncates when the LLM fails.
    #[tokio::test]
    async fn oversized_digest_rewrites_or_truncates() {
        let config = CompressionConfig {
            max_total_tokens: 100,
            recent_keep: 2,
            middle_range: 2,
            digest_llm_threshold: 10,
            ..Default::default()
        };
        let counter = TokenCounter::new();

        let mock = MockLlm::new();
        mock.script(
            purpose::COMPRESSION,
            crate::llm::ChatOutcome::text("## Digest\nshort rewrite"),
        );
        let scripted: Arc<dyn LlmClient> = Arc::new(mock);
        let mut messages = long_user_messages(30, 60);
        messages.push(Message::user("latest"));
        let (out, _) = compress_if_needed(messages.clone(), &scripted, &config, &counter).await;
        let digest = out.iter().find(|m| m.role == Role::System).unwrap();
        assert_eq!(digest.content_str(), "## Digest\nshort rewrite");

        // Unscripted LLM → failure → truncation fallback, never an error.
        let (out, stats) = compress_if_needed(messages, &llm(), &config, &counter).await;
        assert!(stats.compressed);
        let digest = out.iter().find(|m| m.role == Role::System).unwrap();
        assert!(digest.content_str().len() <= 2000);
    }
}
