//! Scripted CRM backend for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{CrmClient, CrmError};

/// Scripted CRM client. Results are queued per method name; unscripted
/// calls return empty result sets so searches default to "no results".
#[derive(Default)]
pub struct MockCrm {
    scripts: Mutex<HashMap<String, VecDeque<Result<Value, CrmError>>>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl MockCrm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a result for the given method (`search_contacts`,
    /// `search_companies`, `create_cadence`, `create_cadence_step`,
    /// `add_contacts_to_cadence`).
    pub fn script(&self, method: &str, result: Result<Value, CrmError>) {
        self.scripts
            .lock()
            .expect("mock lock")
            .entry(method.to_string())
            .or_default()
            .push_back(result);
    }

    /// Calls observed so far as (method, body) pairs.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().expect("mock lock").clone()
    }

    fn take(&self, method: &str, body: Value) -> Result<Value, CrmError> {
        self.calls
            .lock()
            .expect("mock lock")
            .push((method.to_string(), body));
        let next = self
            .scripts
            .lock()
            .expect("mock lock")
            .get_mut(method)
            .and_then(|q| q.pop_front());
        next.unwrap_or_else(|| Ok(default_result(method)))
    }
}

fn default_result(method: &str) -> Value {
    match method {
        "search_contacts" => serde_json::json!({"contacts": [], "companies": []}),
        "search_companies" => serde_json::json!({"companies": []}),
        _ => serde_json::json!({}),
    }
}

#[async_trait]
impl CrmClient for MockCrm {
    async fn search_contacts(&self, body: Value) -> Result<Value, CrmError> {
        self.take("search_contacts", body)
    }

    async fn search_companies(&self, body: Value) -> Result<Value, CrmError> {
        self.take("search_companies", body)
    }

    async fn create_cadence(&self, body: Value) -> Result<Value, CrmError> {
        self.take("create_cadence", body)
    }

    async fn create_cadence_step(&self, cadence_id: &str, body: Value) -> Result<Value, CrmError> {
        let mut tagged = body;
        if let Some(obj) = tagged.as_object_mut() {
            obj.insert("sequenceId".into(), Value::String(cadence_id.to_string()));
        }
        self.take("create_cadence_step", tagged)
    }

    async fn add_contacts_to_cadence(&self, body: Value) -> Result<Value, CrmError> {
        self.take("add_contacts_to_cadence", body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Scripted results pop FIFO; unscripted searches return
    /// empty sets; calls are recorded.
    #[tokio::test]
    async fn scripted_and_default_results() {
        let crm = MockCrm::new();
        crm.script(
            "search_contacts",
            Ok(serde_json::json!({"contacts": [{"id": "1"}]})),
        );
        let first = crm
            .search_contacts(serde_json::json!({"city": ["Pune"]}))
            .await
            .unwrap();
        assert_eq!(first["contacts"][0]["id"], "1");

        let second = crm.search_contacts(serde_json::json!({})).await.unwrap();
        assert!(second["contacts"].as_array().unwrap().is_empty());
        assert_eq!(crm.calls().len(), 2);
        assert_eq!(crm.calls()[0].1["city"][0], "Pune");
    }
}
