//! Token estimation with a bounded cache.
//!
//! Heuristic: ~4 characters per token. The cache is keyed by content hash
//! and capped so long sessions cannot grow it without bound.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use crate::message::Message;

const CHARS_PER_TOKEN: usize = 4;
const CACHE_CAP: usize = 1000;

/// Pure token estimator over messages, with a bounded per-instance cache.
#[derive(Default)]
pub struct TokenCounter {
    cache: Mutex<HashMap<u64, u32>>,
}

impl TokenCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Estimated tokens for a text blob.
    pub fn count_text(&self, text: &str) -> u32 {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let key = hasher.finish();

        if let Some(cached) = self.cache.lock().expect("token cache").get(&key) {
            return *cached;
        }
        let count = (text.len() / CHARS_PER_TOKEN) as u32;
        let mut cache = self.cache.lock().expect("token cache");
        if cache.len() < CACHE_CAP {
            cache.insert(key, count);
        }
        count
    }

    /// Estimated tokens for one message: content plus serialized tool
    /// calls.
    pub fn count_message(&self, message: &Message) -> u32 {
        let mut total = self.count_text(message.content_str());
        if let Some(calls) = &message.tool_calls {
            if let Ok(encoded) = serde_json::to_string(calls) {
                total += self.count_text(&encoded);
            }
        }
        total
    }

    /// Estimated tokens for a message list.
    pub fn count_messages(&self, messages: &[Message]) -> u32 {
        messages.iter().map(|m| self.count_message(m)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ToolCall;

    /// **Scenario**: ~4 chars per token; repeated counts hit the cache
    /// and agree.
    #[test]
    fn four_chars_per_token() {
        let counter = TokenCounter::new();
        assert_eq!(counter.count_text("12345678"), 2);
        assert_eq!(counter.count_text("12345678"), 2);
        assert_eq!(counter.count_text(""), 0);
    }

    /// **Scenario**: Tool calls contribute to a message's estimate.
    #[test]
    fn tool_calls_counted() {
        let counter = TokenCounter::new();
        let plain = Message::assistant("hi");
        let with_calls = Message::assistant_with_tool_calls(
            "hi",
            vec![ToolCall::new(
                "c1",
                "search_leads",
                serde_json::json!({"industry": ["Technology"]}),
            )],
        );
        assert!(counter.count_message(&with_calls) > counter.count_message(&plain));
    }

    /// **Scenario**: The cache never exceeds its cap.
    #[test]
    fn cache_bounded() {
        let counter = TokenCounter::new();
        for i in 0..(CACHE_CAP + 100) {
            counter.count_text(&format!("text {i}"));
        }
        assert!(counter.cache.lock().unwrap().len() <= CACHE_CAP);
    }
}
