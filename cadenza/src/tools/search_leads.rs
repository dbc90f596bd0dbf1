//! Contact search tool (`search_leads`).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::crm::CrmClient;

use super::{id_string, Tool, ToolContext, ToolError, ToolSpec, TOOL_SEARCH_LEADS};

const DEFAULT_LIMIT: usize = 20;

/// Finds contacts/decision makers matching the given filters.
pub struct SearchLeadsTool {
    crm: Arc<dyn CrmClient>,
}

impl SearchLeadsTool {
    pub fn new(crm: Arc<dyn CrmClient>) -> Self {
        Self { crm }
    }

    /// Normalizes one raw contact into the compact shape the rest of the
    /// workflow relies on (`id`, `name`, `designation`, `company_name`).
    fn format_contact(raw: &Value) -> Value {
        let name = raw
            .get("name")
            .or_else(|| raw.get("fullName"))
            .and_then(Value::as_str)
            .unwrap_or("");
        let company = raw
            .get("company_name")
            .or_else(|| raw.get("companyName"))
            .or_else(|| raw.get("company"))
            .and_then(Value::as_str)
            .unwrap_or("");
        json!({
            "id": raw.get("id").and_then(id_string).unwrap_or_default(),
            "name": name,
            "designation": raw.get("designation").and_then(Value::as_str).unwrap_or(""),
            "company_name": company,
            "email": raw.get("email").and_then(Value::as_str).unwrap_or(""),
        })
    }
}

#[async_trait]
impl Tool for SearchLeadsTool {
    fn name(&self) -> &'static str {
        TOOL_SEARCH_LEADS
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: TOOL_SEARCH_LEADS.into(),
            description: Some(
                "Find contacts/decision makers by designation, seniority, functional level, \
                 company, industry, size, revenue, funding, and location filters."
                    .into(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "companyName": {"type": "array", "items": {"type": "string"}},
                    "companyIds": {"type": "array", "items": {"type": "string"}},
                    "industry": {"type": "array", "items": {"type": "string"}},
                    "speciality": {"type": "array", "items": {"type": "string"}},
                    "size": {"type": "array", "items": {"type": "string"}},
                    "revenue": {"type": "array", "items": {"type": "string"}},
                    "fundingType": {"type": "array", "items": {"type": "string"}},
                    "fundingMinDate": {"type": "string"},
                    "fundingMaxDate": {"type": "string"},
                    "fullName": {"type": "string"},
                    "seniority": {"type": "array", "items": {"type": "string"}},
                    "functionalLevel": {"type": "array", "items": {"type": "string"}},
                    "designation": {"type": "array", "items": {"type": "string"}},
                    "country": {"type": "array", "items": {"type": "string"}},
                    "state": {"type": "array", "items": {"type": "string"}},
                    "city": {"type": "array", "items": {"type": "string"}},
                    "isFilter": {"type": "boolean"},
                    "limit": {"type": "integer"}
                }
            }),
        }
    }

    async fn call(&self, args: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let limit = args
            .get("limit")
            .and_then(Value::as_u64)
            .map(|l| l as usize)
            .unwrap_or(DEFAULT_LIMIT);

        let raw = self.crm.search_contacts(args).await?;

        let contacts: Vec<Value> = raw
            .get("contacts")
            .and_then(Value::as_array)
            .map(|list| list.iter().take(limit).map(Self::format_contact).collect())
            .unwrap_or_default();
        debug!(count = contacts.len(), "search_leads results");

        Ok(json!({
            "status": "success",
            "message": format!("Found {} contacts", contacts.len()),
            "contacts": contacts,
            "total_contacts": contacts.len(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crm::MockCrm;

    /// **Scenario**: Raw backend contacts are normalized and truncated to
    /// the limit; numeric ids become strings.
    #[tokio::test]
    async fn formats_and_limits_contacts() {
        let crm = MockCrm::new();
        crm.script(
            "search_contacts",
            Ok(json!({"contacts": [
                {"id": 101, "fullName": "Asha Rao", "designation": "CTO", "companyName": "Acme"},
                {"id": "102", "name": "Vik Shah", "designation": "VP Eng", "company_name": "Globex"},
                {"id": "103", "name": "Extra", "designation": "CEO", "company_name": "Initech"}
            ]})),
        );
        let tool = SearchLeadsTool::new(Arc::new(crm));
        let out = tool
            .call(json!({"limit": 2}), &ToolContext::default())
            .await
            .unwrap();
        let contacts = out["contacts"].as_array().unwrap();
        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0]["id"], "101");
        assert_eq!(contacts[0]["name"], "Asha Rao");
        assert_eq!(contacts[0]["company_name"], "Acme");
        assert_eq!(out["total_contacts"], 2);
    }

    /// **Scenario**: Empty backend result yields zero contacts, success.
    #[tokio::test]
    async fn empty_results_ok() {
        let tool = SearchLeadsTool::new(Arc::new(MockCrm::new()));
        let out = tool.call(json!({}), &ToolContext::default()).await.unwrap();
        assert_eq!(out["total_contacts"], 0);
        assert_eq!(out["status"], "success");
    }
}
