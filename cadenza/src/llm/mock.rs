//! Scripted LLM for tests.
//!
//! Outcomes are queued per purpose label; `complete` pops the next one for
//! the request's purpose. Unscripted purposes fail with a network error,
//! which exercises the deterministic fallbacks in the analyzers and the
//! compression gate.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{ChatOutcome, ChatRequest, LlmClient, LlmError};

/// Scripted LLM client keyed by purpose label.
#[derive(Default)]
pub struct MockLlm {
    scripts: Mutex<HashMap<String, VecDeque<Result<ChatOutcome, LlmError>>>>,
    /// Purposes seen by `complete`, for assertions on call order.
    calls: Mutex<Vec<String>>,
}

impl MockLlm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful outcome for the given purpose.
    pub fn script(&self, purpose: &str, outcome: ChatOutcome) {
        self.scripts
            .lock()
            .expect("mock lock")
            .entry(purpose.to_string())
            .or_default()
            .push_back(Ok(outcome));
    }

    /// Queues a JSON reply (content set to the serialized value).
    pub fn script_json(&self, purpose: &str, value: Value) {
        self.script(purpose, ChatOutcome::text(value.to_string()));
    }

    /// Queues a failure for the given purpose.
    pub fn script_err(&self, purpose: &str, err: LlmError) {
        self.scripts
            .lock()
            .expect("mock lock")
            .entry(purpose.to_string())
            .or_default()
            .push_back(Err(err));
    }

    /// Purposes `complete` was called with, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("mock lock").clone()
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn complete(&self, request: ChatRequest) -> Result<ChatOutcome, LlmError> {
        self.calls
            .lock()
            .expect("mock lock")
            .push(request.purpose.clone());
        let next = self
            .scripts
            .lock()
            .expect("mock lock")
            .get_mut(&request.purpose)
            .and_then(|q| q.pop_front());
        match next {
            Some(outcome) => outcome,
            None => Err(LlmError::Network(format!(
                "no scripted response for purpose '{}'",
                request.purpose
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::purpose;
    use crate::message::Message;

    /// **Scenario**: Scripted outcomes pop in FIFO order per purpose;
    /// unscripted purposes fail with a network error.
    #[tokio::test]
    async fn scripted_fifo_and_unscripted_error() {
        let llm = MockLlm::new();
        llm.script(purpose::AGENT, ChatOutcome::text("first"));
        llm.script(purpose::AGENT, ChatOutcome::text("second"));

        let req = |p: &str| ChatRequest::new(p, vec!["m".into()], vec![Message::user("hi")]);
        assert_eq!(llm.complete(req(purpose::AGENT)).await.unwrap().content, "first");
        assert_eq!(llm.complete(req(purpose::AGENT)).await.unwrap().content, "second");
        assert!(matches!(
            llm.complete(req(purpose::AGENT)).await,
            Err(LlmError::Network(_))
        ));
        assert!(matches!(
            llm.complete(req(purpose::TITLE_GENERATION)).await,
            Err(LlmError::Network(_))
        ));
        assert_eq!(llm.calls().len(), 4);
    }
}
