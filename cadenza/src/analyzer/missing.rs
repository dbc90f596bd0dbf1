//! Missing-tool analysis: did the LLM request everything the user asked
//! for?
//!
//! A classifier call decides whether additional tools are needed (e.g.
//! "create a campaign" implies `create_cadence` + `add_contacts_to_cadence`
//! unless a cadence already exists in context). Synthesized calls get
//! default arguments that prefer context data over new searches.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::context::ContextInfo;
use crate::llm::{json_repair, purpose, ChatRequest, LlmClient};
use crate::message::Message;
use crate::tools::{
    TOOL_ADD_CONTACTS_TO_CADENCE, TOOL_CREATE_CADENCE, TOOL_GENERATE_EMAIL,
    TOOL_SEARCH_COMPANIES, TOOL_SEARCH_LEADS,
};

const KNOWN_TOOLS: [&str; 5] = [
    TOOL_SEARCH_LEADS,
    TOOL_SEARCH_COMPANIES,
    TOOL_GENERATE_EMAIL,
    TOOL_CREATE_CADENCE,
    TOOL_ADD_CONTACTS_TO_CADENCE,
];

/// Classifier verdict.
#[derive(Clone, Debug, Default)]
pub struct MissingToolsReport {
    pub has_missing_tools: bool,
    pub missing_tools: Vec<String>,
    pub reasoning: String,
}

/// LLM-driven missing-tool check with a "nothing missing" fallback.
pub struct MissingToolAnalyzer {
    llm: Arc<dyn LlmClient>,
    models: Vec<String>,
}

impl MissingToolAnalyzer {
    pub fn new(llm: Arc<dyn LlmClient>, models: Vec<String>) -> Self {
        Self { llm, models }
    }

    /// Checks whether `current_tools` cover the user's request. Unknown or
    /// already-requested tool names in the verdict are dropped.
    pub async fn check(
        &self,
        user_message: &str,
        current_tools: &[String],
        context: &ContextInfo,
    ) -> MissingToolsReport {
        let request = ChatRequest::new(
            purpose::CHECK_MISSING_TOOLS,
            self.models.clone(),
            vec![
                Message::system(system_prompt()),
                Message::user(user_prompt(user_message, current_tools, context)),
            ],
        )
        .with_temperature(0.1)
        .json();

        let fallback = MissingToolsReport {
            has_missing_tools: false,
            missing_tools: Vec::new(),
            reasoning: "Could not determine missing tools".to_string(),
        };

        let outcome = match self.llm.complete(request).await {
            Ok(o) => o,
            Err(e) => {
                warn!(error = %e, "missing-tool check failed, assuming none missing");
                return fallback;
            }
        };
        let Some(parsed) = json_repair::parse_object(&outcome.content) else {
            return fallback;
        };

        let missing_tools: Vec<String> = parsed
            .get("missing_tools")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(|v| v.as_str())
                    .filter(|name| KNOWN_TOOLS.contains(name))
                    .filter(|name| !current_tools.iter().any(|t| t == name))
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        let report = MissingToolsReport {
            has_missing_tools: parsed
                .get("has_missing_tools")
                .and_then(Value::as_bool)
                .unwrap_or(false)
                && !missing_tools.is_empty(),
            missing_tools,
            reasoning: parsed
                .get("reasoning")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        };
        debug!(missing = ?report.missing_tools, "missing-tool analysis");
        report
    }
}

fn system_prompt() -> String {
    [
        "You analyze sales-workflow requests and decide whether the assistant missed any \
         required tools.",
        "",
        "Available tools: search_companies (find companies), search_leads (find contacts), \
         generate_email (create email content), create_cadence (set up email campaign), \
         add_contacts_to_cadence (add contacts to an existing campaign).",
        "",
        "Rules:",
        "- 'Create a campaign' / 'launch outreach' needs create_cadence + \
         add_contacts_to_cadence, plus generate_email only when no email content exists in \
         previous results.",
        "- Email keywords ('email', 'write', 'draft') need generate_email unless email \
         content already exists.",
        "- 'Use these contacts' / 'with the email we created' means use EXISTING data: do \
         NOT add search or generate tools.",
        "- Pure search requests ('find their companies', 'research companies') get search \
         tools ONLY, never campaign or email tools.",
        "- Only add search tools when the user explicitly asks to find NEW or ADDITIONAL \
         contacts/companies.",
        "",
        "Return JSON: {\"has_missing_tools\": bool, \"missing_tools\": [tool names], \
         \"reasoning\": string}.",
    ]
    .join("\n")
}

fn user_prompt(user_message: &str, current_tools: &[String], context: &ContextInfo) -> String {
    let mut parts = vec![format!("## User Request:\n\"{user_message}\"")];
    if !context.context_string.is_empty() {
        parts.push(format!(
            "\n## Previous Tool Results:\n{}",
            context.context_string
        ));
    }
    if context.summary.email_content.is_some() {
        parts.push("\n## Available Email Content: yes (from previous generate_email)".into());
    }
    if !context.summary.contact_ids.is_empty() {
        parts.push(format!(
            "\n## Available Contact IDs: {} contacts found",
            context.summary.contact_ids.len()
        ));
    }
    parts.push(format!("\n## Tools Actually Called:\n{current_tools:?}"));
    parts.push(
        "\nAnalyze whether any tools are missing. If contacts or email content exist in \
         previous results, do not add search or generate tools for them."
            .into(),
    );
    parts.join("\n")
}

/// Default arguments for a tool call synthesized by the analyzer. Context
/// data always wins over fresh searches.
pub fn default_args_for(tool_name: &str, user_message: &str, context: &ContextInfo) -> Value {
    let summary = &context.summary;
    match tool_name {
        TOOL_CREATE_CADENCE => {
            let lowered = user_message.to_lowercase();
            let campaign_name = if lowered.contains("bfsi") || lowered.contains("banking") {
                "BFSI Outreach Campaign"
            } else if lowered.contains("tech") {
                "Technology Outreach Campaign"
            } else {
                "Auto Campaign"
            };
            let mut args = json!({
                "name": campaign_name,
                "cadence_type": "constant",
                "white_days": ["Mo", "Tu", "We", "Th", "Fr"],
                "is_active": false,
            });
            if let Some(email) = &summary.email_content {
                args["template_details"] = json!({
                    "body": email.body,
                    "subject": email.subject,
                });
            }
            args
        }
        TOOL_ADD_CONTACTS_TO_CADENCE => {
            let recipients: Vec<String> = if summary.recipients_ids.is_empty() {
                summary.contact_ids.iter().cloned().collect()
            } else {
                summary.recipients_ids.clone()
            };
            json!({
                "cadence_id": summary.cadence_id.clone()
                    .unwrap_or_else(|| "auto_filled_by_system".into()),
                "name": summary.cadence_name.clone()
                    .unwrap_or_else(|| "auto_filled_by_system".into()),
                "recipients_ids": recipients,
            })
        }
        TOOL_GENERATE_EMAIL => json!({
            "tone": "professional",
            "email_type": "outreach",
            "purpose": "introduce services",
        }),
        TOOL_SEARCH_COMPANIES => {
            // "Find their companies": reuse company names seen on contacts.
            let names: Vec<String> = summary.contact_company_names.iter().cloned().collect();
            json!({ "companyName": names })
        }
        TOOL_SEARCH_LEADS => {
            if !summary.company_ids.is_empty() {
                let ids: Vec<String> = summary.company_ids.iter().cloned().collect();
                json!({ "companyIds": ids })
            } else if !summary.company_names.is_empty() {
                let names: Vec<String> = summary.company_names.iter().cloned().collect();
                json!({ "companyName": names })
            } else {
                json!({})
            }
        }
        _ => json!({}),
    }
}
