//! OpenRouter-compatible chat-completions client with model fallback.
//!
//! Speaks the OpenAI chat-completions wire format against a configurable
//! base URL (default `https://openrouter.ai/api/v1`). Models in
//! `ChatRequest::models` are tried in order with a per-call timeout; the
//! first successful reply wins and the last error is returned when all
//! fail.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::message::{Message, Role, ToolCall};

use super::{ChatOutcome, ChatRequest, LlmClient, LlmError};

/// Default per-call timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// OpenRouter-compatible client.
pub struct OpenRouterClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl OpenRouterClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, "https://openrouter.ai/api/v1")
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn try_model(&self, model: &str, request: &ChatRequest) -> Result<ChatOutcome, LlmError> {
        let body = WireRequest::build(model, request);
        let url = self.completions_url();
        debug!(
            purpose = %request.purpose,
            model = %model,
            url = %url,
            message_count = request.messages.len(),
            json_mode = request.json_mode,
            "chat completion"
        );

        let send = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send();
        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| LlmError::Network(format!("timeout after {:?}", self.timeout)))?
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(LlmError::Provider(format!("{}: {}", status.as_u16(), text)));
        }

        let wire: WireResponse =
            serde_json::from_str(&text).map_err(|e| LlmError::Decode(e.to_string()))?;
        if let Some(err) = wire.error {
            return Err(LlmError::Provider(err.message));
        }
        let choice = wire
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Decode("response has no choices".into()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| {
                // Arguments arrive as a JSON-encoded string; keep the raw
                // text when it does not parse so the validator can reject it.
                let arguments = serde_json::from_str(&tc.function.arguments)
                    .unwrap_or(Value::String(tc.function.arguments));
                ToolCall::new(tc.id, tc.function.name, arguments)
            })
            .collect();

        Ok(ChatOutcome {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl LlmClient for OpenRouterClient {
    async fn complete(&self, request: ChatRequest) -> Result<ChatOutcome, LlmError> {
        if request.models.is_empty() {
            return Err(LlmError::NoModels);
        }
        let mut last_err = LlmError::NoModels;
        for model in &request.models {
            match self.try_model(model, &request).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) => {
                    warn!(purpose = %request.purpose, model = %model, error = %e, "model failed, trying next");
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }
}

// --- wire types ---

#[derive(Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<WireResponseFormat>,
}

impl WireRequest {
    fn build(model: &str, request: &ChatRequest) -> Self {
        Self {
            model: model.to_string(),
            messages: request.messages.iter().map(WireMessage::from_message).collect(),
            tools: request.tools.as_ref().map(|ts| {
                ts.iter()
                    .map(|t| WireTool {
                        kind: "function",
                        function: WireFunctionSpec {
                            name: t.name.clone(),
                            description: t.description.clone(),
                            parameters: t.input_schema.clone(),
                        },
                    })
                    .collect()
            }),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request.json_mode.then_some(WireResponseFormat {
                kind: "json_object",
            }),
        }
    }
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCallOut>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl WireMessage {
    fn from_message(msg: &Message) -> Self {
        let role = match msg.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };
        Self {
            role,
            content: msg.content_str().to_string(),
            tool_calls: msg.tool_calls.as_ref().map(|calls| {
                calls
                    .iter()
                    .map(|c| WireToolCallOut {
                        id: c.id.clone(),
                        kind: "function",
                        function: WireFunctionCall {
                            name: c.name.clone(),
                            arguments: c.arguments.to_string(),
                        },
                    })
                    .collect()
            }),
            tool_call_id: msg.tool_call_id.clone(),
        }
    }
}

#[derive(Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunctionSpec,
}

#[derive(Serialize)]
struct WireFunctionSpec {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    parameters: Value,
}

#[derive(Serialize)]
struct WireToolCallOut {
    id: String,
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunctionCall,
}

#[derive(Serialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Serialize)]
struct WireResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
    #[serde(default)]
    error: Option<WireError>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
}

#[derive(Deserialize)]
struct WireResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCallIn>>,
}

#[derive(Deserialize)]
struct WireToolCallIn {
    id: String,
    function: WireFunctionCallIn,
}

#[derive(Deserialize)]
struct WireFunctionCallIn {
    name: String,
    arguments: String,
}

#[derive(Deserialize)]
struct WireError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::purpose;

    /// **Scenario**: Request body serializes assistant tool calls with
    /// string-encoded arguments and tags tools as functions.
    #[test]
    fn wire_request_shape() {
        let req = ChatRequest::new(
            purpose::AGENT,
            vec!["openai/gpt-4o-mini".into()],
            vec![
                Message::system("sys"),
                Message::assistant_with_tool_calls(
                    "",
                    vec![ToolCall::new(
                        "call-1",
                        "search_leads",
                        serde_json::json!({"industry": ["Technology"]}),
                    )],
                ),
                Message::tool("call-1", "{\"contacts\": []}"),
            ],
        )
        .with_temperature(0.1)
        .json();
        let body = WireRequest::build("openai/gpt-4o-mini", &req);
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["model"], "openai/gpt-4o-mini");
        assert_eq!(v["messages"][1]["tool_calls"][0]["type"], "function");
        assert_eq!(
            v["messages"][1]["tool_calls"][0]["function"]["arguments"],
            "{\"industry\":[\"Technology\"]}"
        );
        assert_eq!(v["messages"][2]["role"], "tool");
        assert_eq!(v["messages"][2]["tool_call_id"], "call-1");
        assert_eq!(v["response_format"]["type"], "json_object");
    }

    /// **Scenario**: Provider error body maps to LlmError::Provider.
    #[test]
    fn wire_response_error_field() {
        let text = r#"{"choices": [], "error": {"message": "rate limited", "code": 429}}"#;
        let wire: WireResponse = serde_json::from_str(text).unwrap();
        assert_eq!(wire.error.unwrap().message, "rate limited");
    }

    /// **Scenario**: Tool-call arguments parse from the encoded string.
    #[test]
    fn wire_response_tool_calls_decode() {
        let text = r#"{
            "choices": [{"message": {
                "content": null,
                "tool_calls": [{"id": "c1", "type": "function",
                    "function": {"name": "search_leads", "arguments": "{\"city\": [\"Pune\"]}"}}]
            }}]
        }"#;
        let wire: WireResponse = serde_json::from_str(text).unwrap();
        let call = wire.choices[0]
            .message
            .tool_calls
            .as_ref()
            .unwrap()
            .first()
            .unwrap();
        assert_eq!(call.function.name, "search_leads");
        let args: Value = serde_json::from_str(&call.function.arguments).unwrap();
        assert_eq!(args["city"][0], "Pune");
    }

    /// **Scenario**: complete() with an unreachable base URL returns a
    /// network error rather than hanging (no real API key needed).
    #[tokio::test]
    async fn unreachable_base_is_network_error() {
        let client = OpenRouterClient::with_base_url("test-key", "http://127.0.0.1:1")
            .with_timeout(Duration::from_secs(2));
        let req = ChatRequest::new(
            purpose::AGENT,
            vec!["openai/gpt-4o-mini".into()],
            vec![Message::user("hi")],
        );
        let err = client.complete(req).await.unwrap_err();
        assert!(matches!(err, LlmError::Network(_)), "{err}");
    }

    /// **Scenario**: Empty model list fails fast with NoModels.
    #[tokio::test]
    async fn empty_models_is_error() {
        let client = OpenRouterClient::new("k");
        let req = ChatRequest::new(purpose::AGENT, vec![], vec![Message::user("hi")]);
        assert!(matches!(
            client.complete(req).await,
            Err(LlmError::NoModels)
        ));
    }
}
