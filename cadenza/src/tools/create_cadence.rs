//! Cadence creation tool (`create_cadence`).
//!
//! Creates the sequence, then adds the first email step when
//! `template_details` is present. The result carries `cadence_id` and
//! `cadence_name`, which downstream enrollment depends on.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::crm::CrmClient;

use super::{id_string, Tool, ToolContext, ToolError, ToolSpec, TOOL_CREATE_CADENCE};

/// Default send window: business days.
const DEFAULT_WHITE_DAYS: [&str; 5] = ["Mo", "Tu", "We", "Th", "Fr"];

/// Sets up an email campaign/sequence.
pub struct CreateCadenceTool {
    crm: Arc<dyn CrmClient>,
}

impl CreateCadenceTool {
    pub fn new(crm: Arc<dyn CrmClient>) -> Self {
        Self { crm }
    }

    /// Extracts the cadence id from the created document. Backends return
    /// either `_id` as a string or the Mongo extended form `{"$oid": ...}`.
    fn extract_cadence_id(doc: &Value) -> Option<String> {
        match doc.get("_id") {
            Some(Value::Object(obj)) => obj.get("$oid").and_then(id_string),
            Some(other) => id_string(other),
            None => doc.get("cadence_id").and_then(id_string),
        }
    }
}

#[async_trait]
impl Tool for CreateCadenceTool {
    fn name(&self) -> &'static str {
        TOOL_CREATE_CADENCE
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: TOOL_CREATE_CADENCE.into(),
            description: Some(
                "Create an email cadence/campaign with a name, schedule, and optional \
                 email template; recipients can be attached later."
                    .into(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "cadence_type": {"type": "string"},
                    "recipients": {"type": "array", "items": {"type": "string"}},
                    "tags": {"type": "array", "items": {"type": "string"}},
                    "start_date": {"type": "string"},
                    "start_time": {"type": "string"},
                    "white_days": {"type": "array", "items": {"type": "string"}},
                    "is_active": {"type": "boolean"},
                    "status": {"type": "string"},
                    "template_details": {
                        "type": "object",
                        "properties": {
                            "subject": {"type": "string"},
                            "body": {"type": "string"}
                        }
                    }
                },
                "required": ["name"]
            }),
        }
    }

    async fn call(&self, args: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let name = args
            .get("name")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("cadence name is required".into()))?
            .to_string();

        let recipients: Vec<Value> = args
            .get("recipients")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let body = json!({
            "name": name,
            "cadenceType": args.get("cadence_type").and_then(Value::as_str).unwrap_or("constant"),
            "recipients": recipients,
            "tags": args.get("tags").cloned().unwrap_or_else(|| json!([])),
            "startDate": args.get("start_date").cloned().unwrap_or(Value::Null),
            "startTime": args.get("start_time").cloned().unwrap_or(Value::Null),
            "whiteDays": args.get("white_days").cloned()
                .unwrap_or_else(|| json!(DEFAULT_WHITE_DAYS)),
            "isActive": args.get("is_active").and_then(Value::as_bool).unwrap_or(false),
            "status": args.get("status").and_then(Value::as_str).unwrap_or("draft"),
        });

        let created = self.crm.create_cadence(body).await?;
        let cadence_id = Self::extract_cadence_id(&created).ok_or_else(|| {
            ToolError::InvalidArguments("cadence was not created: no id returned".into())
        })?;
        debug!(cadence_id = %cadence_id, name = %name, "cadence created");

        // First email step, when the plan (or context) supplied a template.
        let template = args.get("template_details").filter(|t| t.is_object());
        if let Some(template) = template {
            let step_body = json!({
                "subject": template.get("subject").cloned().unwrap_or(Value::Null),
                "body": template.get("body").cloned().unwrap_or(Value::Null),
                "stepNumber": 1,
            });
            self.crm.create_cadence_step(&cadence_id, step_body).await?;
        }

        Ok(json!({
            "status": "success",
            "message": format!("Created cadence '{name}'"),
            "cadence_id": cadence_id,
            "cadence_name": name,
            "recipients": recipients,
        }))
    }
}
