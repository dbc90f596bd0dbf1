//! HTTP CRM client (reqwest, bearer auth).

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{CrmClient, CrmError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// CRM client over HTTP. Endpoints follow the prospecting backend's API:
/// `/api/search/neg/contact`, `/api/search/neg/company`,
/// `/api/seq/addsequence/{uid}`, `/api/seq/step/{uid}/{cadence_id}`,
/// `/api/radar/create/addListToSeq/campaign`.
pub struct HttpCrmClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    user_id: String,
    timeout: Duration,
}

impl HttpCrmClient {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            user_id: user_id.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Injects `userId` into the body when the caller did not set one.
    fn with_user_id(&self, mut body: Value) -> Value {
        if let Some(obj) = body.as_object_mut() {
            if !obj.contains_key("userId") {
                obj.insert("userId".into(), Value::String(self.user_id.clone()));
            }
        }
        body
    }

    async fn post(&self, endpoint: &str, body: Value) -> Result<Value, CrmError> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(url = %url, "crm request");
        let send = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send();
        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| CrmError::Network(format!("timeout after {:?}", self.timeout)))?
            .map_err(|e| CrmError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CrmError::Network(e.to_string()))?;
        if !status.is_success() {
            return Err(CrmError::Api {
                status: status.as_u16(),
                message: text,
            });
        }
        serde_json::from_str(&text).map_err(|e| CrmError::Decode(e.to_string()))
    }
}

#[async_trait]
impl CrmClient for HttpCrmClient {
    async fn search_contacts(&self, body: Value) -> Result<Value, CrmError> {
        self.post("/api/search/neg/contact", self.with_user_id(body))
            .await
    }

    async fn search_companies(&self, body: Value) -> Result<Value, CrmError> {
        self.post("/api/search/neg/company", self.with_user_id(body))
            .await
    }

    async fn create_cadence(&self, body: Value) -> Result<Value, CrmError> {
        let endpoint = format!("/api/seq/addsequence/{}", self.user_id);
        self.post(&endpoint, self.with_user_id(body)).await
    }

    async fn create_cadence_step(&self, cadence_id: &str, body: Value) -> Result<Value, CrmError> {
        let endpoint = format!("/api/seq/step/{}/{}", self.user_id, cadence_id);
        let mut body = self.with_user_id(body);
        if let Some(obj) = body.as_object_mut() {
            obj.entry("sequenceId")
                .or_insert_with(|| Value::String(cadence_id.to_string()));
        }
        self.post(&endpoint, body).await
    }

    async fn add_contacts_to_cadence(&self, body: Value) -> Result<Value, CrmError> {
        self.post(
            "/api/radar/create/addListToSeq/campaign",
            self.with_user_id(body),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: userId is injected only when absent.
    #[test]
    fn user_id_injection() {
        let client = HttpCrmClient::new("https://crm.example", "tok", "u-1");
        let injected = client.with_user_id(serde_json::json!({"industry": []}));
        assert_eq!(injected["userId"], "u-1");
        let kept = client.with_user_id(serde_json::json!({"userId": "other"}));
        assert_eq!(kept["userId"], "other");
    }

    /// **Scenario**: Unreachable backend maps to CrmError::Network.
    #[tokio::test]
    async fn unreachable_is_network_error() {
        let client = HttpCrmClient::new("http://127.0.0.1:1", "tok", "u-1")
            .with_timeout(Duration::from_secs(2));
        let err = client
            .search_contacts(serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, CrmError::Network(_)), "{err}");
    }
}
