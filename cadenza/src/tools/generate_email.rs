//! Email drafting tool (`generate_email`).
//!
//! The only tool backed by the LLM instead of the CRM. Drafts a subject and
//! body matching the requested tone/type/purpose; placeholders use
//! `[snake_case]` form so campaign templates can substitute them.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::llm::{json_repair, purpose, ChatRequest, LlmClient};
use crate::message::Message;

use super::{Tool, ToolContext, ToolError, ToolSpec, TOOL_GENERATE_EMAIL};

/// Drafts outreach email content.
pub struct GenerateEmailTool {
    llm: Arc<dyn LlmClient>,
    models: Vec<String>,
}

impl GenerateEmailTool {
    pub fn new(llm: Arc<dyn LlmClient>, models: Vec<String>) -> Self {
        Self { llm, models }
    }

    fn prompt(args: &Value) -> String {
        let tone = args.get("tone").and_then(Value::as_str).unwrap_or("professional");
        let email_type = args.get("email_type").and_then(Value::as_str).unwrap_or("outreach");
        let purpose = args
            .get("purpose")
            .and_then(Value::as_str)
            .unwrap_or("introduce services");
        let mut text = format!(
            "Write a {tone} {email_type} email. Purpose: {purpose}. \
             Use placeholders like [first_name] and [company_name] for personalization. \
             Respond with a JSON object: {{\"subject\": \"...\", \"body\": \"...\"}}."
        );
        if let Some(example) = args.get("example").and_then(Value::as_str) {
            text.push_str("\nMatch the style of this example:\n");
            text.push_str(example);
        }
        text
    }

    /// Fallback for non-JSON replies: first `Subject:` line, rest is body.
    fn parse_plain(content: &str) -> (String, String) {
        let mut subject = String::new();
        let mut body = Vec::new();
        for line in content.lines() {
            let lower = line.to_lowercase();
            if subject.is_empty() && lower.starts_with("subject:") {
                subject = line["subject:".len()..].trim().to_string();
            } else {
                body.push(line);
            }
        }
        if subject.is_empty() {
            subject = "Generated Email".to_string();
        }
        (subject, body.join("\n").trim().to_string())
    }
}

#[async_trait]
impl Tool for GenerateEmailTool {
    fn name(&self) -> &'static str {
        TOOL_GENERATE_EMAIL
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: TOOL_GENERATE_EMAIL.into(),
            description: Some(
                "Create email content (subject and body) for outreach; supports tone, \
                 email type, purpose, and an optional style example."
                    .into(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "tone": {"type": "string"},
                    "email_type": {"type": "string"},
                    "purpose": {"type": "string"},
                    "example": {"type": "string"}
                }
            }),
        }
    }

    async fn call(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let request = ChatRequest::new(
            purpose::GENERATE_EMAIL,
            self.models.clone(),
            vec![
                Message::system(
                    "You are an expert sales copywriter. Reply with only the requested JSON.",
                ),
                Message::user(Self::prompt(&args)),
            ],
        )
        .with_temperature(0.7)
        .json();

        tracing::debug!(session_id = %ctx.session_id, "drafting email");
        let outcome = self.llm.complete(request).await?;

        let (subject, body) = match json_repair::parse_object(&outcome.content) {
            Some(obj) => {
                let subject = obj
                    .get("subject")
                    .and_then(Value::as_str)
                    .unwrap_or("Generated Email")
                    .to_string();
                let body = obj
                    .get("body")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                (subject, body)
            }
            None => Self::parse_plain(&outcome.content),
        };

        if body.is_empty() {
            return Err(ToolError::InvalidArguments(
                "email draft came back empty".into(),
            ));
        }

        Ok(json!({
            "status": "success",
            "subject": subject,
            "body": body,
            "tone": args.get("tone").and_then(Value::as_str).unwrap_or("professional"),
            "email_type": args.get("email_type").and_then(Value::as_str).unwrap_or("outreach"),
        }))
    }
}
