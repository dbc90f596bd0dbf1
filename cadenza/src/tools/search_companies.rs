//! Company search tool (`search_companies`).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::crm::CrmClient;

use super::{id_string, Tool, ToolContext, ToolError, ToolSpec, TOOL_SEARCH_COMPANIES};

const DEFAULT_LIMIT: usize = 20;

/// Finds companies matching the given filters.
pub struct SearchCompaniesTool {
    crm: Arc<dyn CrmClient>,
}

impl SearchCompaniesTool {
    pub fn new(crm: Arc<dyn CrmClient>) -> Self {
        Self { crm }
    }

    fn format_company(raw: &Value) -> Value {
        json!({
            "id": raw.get("id").and_then(id_string).unwrap_or_default(),
            "name": raw.get("name")
                .or_else(|| raw.get("companyName"))
                .and_then(Value::as_str)
                .unwrap_or(""),
            "industry": raw.get("industry").and_then(Value::as_str).unwrap_or(""),
            "size": raw.get("size").and_then(Value::as_str).unwrap_or(""),
            "hq_city": raw.get("hqCity")
                .or_else(|| raw.get("hq_city"))
                .and_then(Value::as_str)
                .unwrap_or(""),
        })
    }
}

#[async_trait]
impl Tool for SearchCompaniesTool {
    fn name(&self) -> &'static str {
        TOOL_SEARCH_COMPANIES
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: TOOL_SEARCH_COMPANIES.into(),
            description: Some(
                "Find companies by name, industry, headquarters location, size, revenue, \
                 hiring areas, funding, and technology filters."
                    .into(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "companyName": {"type": "array", "items": {"type": "string"}},
                    "hqCountry": {"type": "array", "items": {"type": "string"}},
                    "hqState": {"type": "array", "items": {"type": "string"}},
                    "hqCity": {"type": "array", "items": {"type": "string"}},
                    "industry": {"type": "array", "items": {"type": "string"}},
                    "company_type": {"type": "array", "items": {"type": "string"}},
                    "hiringAreas": {"type": "array", "items": {"type": "string"}},
                    "speciality": {"type": "array", "items": {"type": "string"}},
                    "size": {"type": "array", "items": {"type": "string"}},
                    "revenue": {"type": "array", "items": {"type": "string"}},
                    "websiteKeywords": {"type": "array", "items": {"type": "string"}},
                    "funding": {"type": "boolean"},
                    "fundingType": {"type": "array", "items": {"type": "string"}},
                    "fundingMinDate": {"type": "string"},
                    "fundingMaxDate": {"type": "string"},
                    "limit": {"type": "integer"},
                    "start": {"type": "integer"},
                    "sort": {"type": "string"}
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

        let raw = self.crm.search_companies(args).await?;

        let companies: Vec<Value> = raw
            .get("companies")
            .and_then(Value::as_array)
            .map(|list| list.iter().take(limit).map(Self::format_company).collect())
            .unwrap_or_default();
        debug!(count = companies.len(), "search_companies results");

        Ok(json!({
            "status": "success",
            "message": format!("Found {} companies", companies.len()),
            "companies": companies,
            "total_companies": companies.len(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crm::MockCrm;

    /// **Scenario**: Companies are normalized with id/name/industry.
    #[tokio::test]
    async fn formats_companies() {
        let crm = MockCrm::new();
        crm.script(
            "search_companies",
            Ok(json!({"companies": [
                {"id": 7, "name": "Medix", "industry": "Hospitals and Health Care", "hqCity": "Austin"}
            ]})),
        );
        let tool = SearchCompaniesTool::new(Arc::new(crm));
        let out = tool.call(json!({}), &ToolContext::default()).await.unwrap();
        assert_eq!(out["companies"][0]["id"], "7");
        assert_eq!(out["companies"][0]["industry"], "Hospitals and Health Care");
        assert_eq!(out["total_companies"], 1);
    }
}
