//! Recipient enrollment tool (`add_contacts_to_cadence`).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::crm::CrmClient;

use super::{id_string, Tool, ToolContext, ToolError, ToolSpec, TOOL_ADD_CONTACTS_TO_CADENCE};

/// Placeholder the missing-tool analyzer leaves when the executor is
/// expected to fill the cadence from dependencies or context.
const AUTO_FILL_MARKER: &str = "auto_filled_by_system";

/// Adds recipients to an existing cadence.
pub struct AddContactsToCadenceTool {
    crm: Arc<dyn CrmClient>,
}

impl AddContactsToCadenceTool {
    pub fn new(crm: Arc<dyn CrmClient>) -> Self {
        Self { crm }
    }
}

#[async_trait]
impl Tool for AddContactsToCadenceTool {
    fn name(&self) -> &'static str {
        TOOL_ADD_CONTACTS_TO_CADENCE
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: TOOL_ADD_CONTACTS_TO_CADENCE.into(),
            description: Some(
                "Add contacts (by recipient id) to an existing cadence/campaign.".into(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "cadence_id": {"type": "string"},
                    "name": {"type": "string"},
                    "recipients_ids": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["cadence_id", "recipients_ids"]
            }),
        }
    }

    async fn call(&self, args: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let cadence_id = args
            .get("cadence_id")
            .and_then(id_string)
            .filter(|id| id != AUTO_FILL_MARKER)
            .ok_or_else(|| {
                ToolError::InvalidArguments(
                    "cadence_id is required (no cadence found in plan or context)".into(),
                )
            })?;

        let recipients: Vec<String> = args
            .get("recipients_ids")
            .and_then(Value::as_array)
            .map(|list| list.iter().filter_map(id_string).collect())
            .unwrap_or_default();
        if recipients.is_empty() {
            return Err(ToolError::InvalidArguments(
                "recipients_ids is empty after dependency and context injection".into(),
            ));
        }

        let name = args
            .get("name")
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty() && *n != AUTO_FILL_MARKER)
            .unwrap_or("")
            .to_string();

        let body = json!({
            "sequenceId": cadence_id,
            "name": name,
            "recipients_ids": recipients,
        });
        debug!(cadence_id = %cadence_id, count = recipients.len(), "adding recipients");
        self.crm.add_contacts_to_cadence(body).await?;

        Ok(json!({
            "status": "success",
            "message": format!("Added {} contacts to cadence '{}'", recipients.len(), name),
            "cadence_id": cadence_id,
            "cadence_name": name,
            "recipients_ids": recipients,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crm::MockCrm;

    /// **Scenario**: Valid args enroll recipients and echo cadence info.
    #[tokio::test]
    async fn enrolls_recipients() {
        let crm = Arc::new(MockCrm::new());
        let tool = AddContactsToCadenceTool::new(crm.clone());
        let out = tool
            .call(
                json!({"cadence_id": "cad-1", "name": "Outreach", "recipients_ids": ["11", "12"]}),
                &ToolContext::default(),
            )
            .await
            .unwrap();
        assert_eq!(out["cadence_id"], "cad-1");
        assert_eq!(out["recipients_ids"].as_array().unwrap().len(), 2);
        assert_eq!(crm.calls()[0].1["sequenceId"], "cad-1");
    }

    /// **Scenario**: Empty recipients fail with invalid-arguments and no
    /// outbound call.
    #[tokio::test]
    async fn empty_recipients_invalid() {
        let crm = Arc::new(MockCrm::new());
        let tool = AddContactsToCadenceTool::new(crm.clone());
        let err = tool
            .call(
                json!({"cadence_id": "cad-1", "recipients_ids": []}),
                &ToolContext::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_step_error().kind(), "invalid-arguments");
        assert!(crm.calls().is_empty());
    }

    /// **Scenario**: The auto-fill marker does not count as a cadence id.
    #[tokio::test]
    async fn auto_fill_marker_rejected() {
        let tool = AddContactsToCadenceTool::new(Arc::new(MockCrm::new()));
        let err = tool
            .call(
                json!({"cadence_id": "auto_filled_by_system", "recipients_ids": ["1"]}),
                &ToolContext::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_step_error().kind(), "invalid-arguments");
    }
}
