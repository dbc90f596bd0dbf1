//! Context built from durable history: what prior turns already found.
//!
//! Two artifacts per session: a markdown `context_string` fed into the
//! LLM-driven analyzers, and a typed [`ContextSummary`] the executor and
//! default-argument synthesis read ids from. Only data visible in durable
//! history ever lands here; sets are ordered so an unchanged session
//! yields an identical summary.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::Message;
use crate::store::ToolOutput;
use crate::tools::{
    TOOL_ADD_CONTACTS_TO_CADENCE, TOOL_CREATE_CADENCE, TOOL_GENERATE_EMAIL,
    TOOL_SEARCH_COMPANIES, TOOL_SEARCH_LEADS,
};

/// Listing caps, matching what the analyzers can usefully consume.
const MAX_ITEMS_PER_TOOL_CALL: usize = 101;
const MAX_TOOL_CALLS_TO_SUMMARIZE: usize = 10;

/// Email content captured from a prior `generate_email`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmailContent {
    pub body: String,
    pub subject: String,
}

/// Typed summary of prior tool outputs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextSummary {
    pub contact_ids: BTreeSet<String>,
    pub company_ids: BTreeSet<String>,
    pub contact_company_names: BTreeSet<String>,
    pub company_names: BTreeSet<String>,
    pub industries: BTreeSet<String>,
    pub cadence_id: Option<String>,
    pub cadence_name: Option<String>,
    pub recipients_ids: Vec<String>,
    pub email_content: Option<EmailContent>,
}

impl ContextSummary {
    pub fn is_empty(&self) -> bool {
        self.contact_ids.is_empty()
            && self.company_ids.is_empty()
            && self.contact_company_names.is_empty()
            && self.company_names.is_empty()
            && self.cadence_id.is_none()
            && self.email_content.is_none()
    }
}

/// Context for one session: markdown block + typed summary.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContextInfo {
    pub context_string: String,
    pub summary: ContextSummary,
}

fn value_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn field_string(obj: &Value, key: &str) -> Option<String> {
    obj.get(key).and_then(value_string)
}

/// The most recent user business request: skips plan approvals/edits and
/// trivially short messages.
fn original_request(messages: &[Message]) -> Option<String> {
    messages
        .iter()
        .rev()
        .filter(|m| m.role == crate::message::Role::User)
        .map(|m| m.content_str())
        .find(|c| c.len() > 10 && !c.starts_with("APPROVE_PLAN:") && !c.starts_with("EDIT_PLAN:"))
        .map(String::from)
}

/// Builds session context from durable history, newest tool outputs first.
pub fn build_context(messages: &[Message], tool_outputs: &[ToolOutput]) -> ContextInfo {
    if tool_outputs.is_empty() {
        return ContextInfo::default();
    }

    let mut lines: Vec<String> = Vec::new();
    let mut summary = ContextSummary::default();
    let mut summarized = 0usize;

    for output in tool_outputs.iter().rev() {
        if summarized >= MAX_TOOL_CALLS_TO_SUMMARIZE {
            break;
        }
        summarized += 1;
        let result = &output.result;

        match output.tool_name.as_str() {
            TOOL_GENERATE_EMAIL => {
                let body = field_string(result, "body");
                let subject = field_string(result, "subject");
                if let (Some(body), Some(subject)) = (body, subject) {
                    lines.push(format!("### Previous Action: '{}'", output.tool_name));
                    lines.push(format!("* Generated email with subject: '{subject}'"));
                    lines.push("* Email body available for campaign use".to_string());
                    // Newest output wins.
                    if summary.email_content.is_none() {
                        summary.email_content = Some(EmailContent { body, subject });
                    }
                }
            }
            TOOL_CREATE_CADENCE => {
                let cadence_id = field_string(result, "cadence_id");
                let cadence_name = field_string(result, "cadence_name");
                if let (Some(id), Some(name)) = (&cadence_id, &cadence_name) {
                    lines.push(format!("### Previous Action: '{}'", output.tool_name));
                    lines.push(format!(
                        "* Created cadence '{name}' with id {id}; use both name and id when \
                         adding contacts"
                    ));
                    if summary.cadence_id.is_none() {
                        summary.cadence_id = cadence_id.clone();
                        summary.cadence_name = cadence_name.clone();
                    }
                }
                if let Some(recipients) = result.get("recipients").and_then(Value::as_array) {
                    let ids: Vec<String> = recipients.iter().filter_map(value_string).collect();
                    if !ids.is_empty() {
                        lines.push(format!("* Recipient ids already attached: {ids:?}"));
                        if summary.recipients_ids.is_empty() {
                            summary.recipients_ids = ids;
                        }
                    }
                }
            }
            TOOL_ADD_CONTACTS_TO_CADENCE => {
                let cadence_id = field_string(result, "cadence_id");
                let cadence_name = field_string(result, "cadence_name");
                let ids: Vec<String> = result
                    .get("recipients_ids")
                    .and_then(Value::as_array)
                    .map(|l| l.iter().filter_map(value_string).collect())
                    .unwrap_or_default();
                lines.push(format!("### Previous Action: '{}'", output.tool_name));
                lines.push(format!(
                    "* Added recipient ids {:?} to cadence {} ({})",
                    ids,
                    cadence_id.as_deref().unwrap_or("?"),
                    cadence_name.as_deref().unwrap_or("?"),
                ));
                if summary.cadence_id.is_none() {
                    summary.cadence_id = cadence_id;
                    summary.cadence_name = cadence_name;
                }
                if summary.recipients_ids.is_empty() {
                    summary.recipients_ids = ids;
                }
            }
            TOOL_SEARCH_LEADS | TOOL_SEARCH_COMPANIES => {
                lines.push(format!("### Previous Action: '{}'", output.tool_name));
                let contacts = result.get("contacts").and_then(Value::as_array);
                let companies = result.get("companies").and_then(Value::as_array);
                if contacts.map_or(true, |c| c.is_empty())
                    && companies.map_or(true, |c| c.is_empty())
                {
                    lines.push("* No results were found for this action.".to_string());
                    continue;
                }

                if let Some(contacts) = contacts.filter(|c| !c.is_empty()) {
                    lines.push(format!("* Contacts found: {}", contacts.len()));
                    for contact in contacts.iter().take(MAX_ITEMS_PER_TOOL_CALL) {
                        let id = field_string(contact, "id");
                        let name = field_string(contact, "name");
                        let title =
                            field_string(contact, "designation").unwrap_or_else(|| "N/A".into());
                        let company = field_string(contact, "company_name");
                        if let (Some(id), Some(name)) = (&id, &name) {
                            lines.push(format!(
                                "  Contact ID: {id} - {name} ({title} at {})",
                                company.as_deref().unwrap_or("N/A")
                            ));
                        }
                        if let Some(id) = id {
                            summary.contact_ids.insert(id);
                        }
                        if let Some(company) = company {
                            summary.contact_company_names.insert(company);
                        }
                    }
                    if contacts.len() > MAX_ITEMS_PER_TOOL_CALL {
                        lines.push(format!(
                            "  ...and {} more.",
                            contacts.len() - MAX_ITEMS_PER_TOOL_CALL
                        ));
                    }
                }

                if let Some(companies) = companies.filter(|c| !c.is_empty()) {
                    lines.push(format!("* Companies found: {}", companies.len()));
                    for company in companies.iter().take(MAX_ITEMS_PER_TOOL_CALL) {
                        let id = field_string(company, "id");
                        let name = field_string(company, "name");
                        let industry =
                            field_string(company, "industry").unwrap_or_else(|| "N/A".into());
                        if let Some(name) = &name {
                            lines.push(format!(
                                "  - {name} (industry: {industry}, id: {})",
                                id.as_deref().unwrap_or("?")
                            ));
                            summary.company_names.insert(name.clone());
                        }
                        if industry != "N/A" {
                            summary.industries.insert(industry);
                        }
                        if let Some(id) = id {
                            summary.company_ids.insert(id);
                        }
                    }
                    if companies.len() > MAX_ITEMS_PER_TOOL_CALL {
                        lines.push(format!(
                            "  ...and {} more.",
                            companies.len() - MAX_ITEMS_PER_TOOL_CALL
                        ));
                    }
                }
            }
            _ => {}
        }
    }

    if lines.is_empty() {
        return ContextInfo::default();
    }

    let mut final_lines: Vec<String> = Vec::new();
    if let Some(request) = original_request(messages) {
        final_lines.push("## COMPLETED WORKFLOW SUMMARY".to_string());
        final_lines.push(format!("Original request: {request}"));
        final_lines.push("Status: all requested actions completed".to_string());
        final_lines.push(String::new());
        final_lines.push("## PREVIOUS ACTIONS DETAILS".to_string());
    }
    final_lines.extend(lines);

    ContextInfo {
        context_string: final_lines.join("\n"),
        summary,
    }
}

/// Fills tool arguments from context when the plan itself cannot provide
/// them: campaign templates from a prior email, recipients and cadence
/// identity from prior results, company filters from prior searches.
/// Existing (non-empty) argument values always win.
pub fn apply_context_mapping(tool_name: &str, args: &Value, summary: &ContextSummary) -> Value {
    let mut mapped = args.clone();
    let Some(obj) = mapped.as_object_mut() else {
        return mapped;
    };
    let is_missing = |obj: &serde_json::Map<String, Value>, key: &str| -> bool {
        match obj.get(key) {
            None | Some(Value::Null) => true,
            Some(Value::Array(list)) => list.is_empty(),
            Some(Value::String(s)) => s.is_empty(),
            _ => false,
        }
    };

    match tool_name {
        TOOL_CREATE_CADENCE => {
            if is_missing(obj, "template_details") {
                if let Some(email) = &summary.email_content {
                    obj.insert(
                        "template_details".into(),
                        serde_json::json!({"body": email.body, "subject": email.subject}),
                    );
                }
            }
        }
        TOOL_ADD_CONTACTS_TO_CADENCE => {
            if is_missing(obj, "recipients_ids") {
                let recipients: Vec<String> = if summary.recipients_ids.is_empty() {
                    summary.contact_ids.iter().cloned().collect()
                } else {
                    summary.recipients_ids.clone()
                };
                if !recipients.is_empty() {
                    obj.insert(
                        "recipients_ids".into(),
                        Value::Array(recipients.into_iter().map(Value::String).collect()),
                    );
                }
            }
            if is_missing(obj, "cadence_id") {
                if let Some(id) = &summary.cadence_id {
                    obj.insert("cadence_id".into(), Value::String(id.clone()));
                }
            }
            if is_missing(obj, "name") {
                if let Some(name) = &summary.cadence_name {
                    obj.insert("name".into(), Value::String(name.clone()));
                }
            }
        }
        TOOL_SEARCH_COMPANIES => {
            if is_missing(obj, "companyName") && !summary.contact_company_names.is_empty() {
                obj.insert(
                    "companyName".into(),
                    Value::Array(
                        summary
                            .contact_company_names
                            .iter()
                            .cloned()
                            .map(Value::String)
                            .collect(),
                    ),
                );
            }
        }
        TOOL_SEARCH_LEADS => {
            if is_missing(obj, "companyIds") && !summary.company_ids.is_empty() {
                obj.insert(
                    "companyIds".into(),
                    Value::Array(
                        summary
                            .company_ids
                            .iter()
                            .cloned()
                            .map(Value::String)
                            .collect(),
                    ),
                );
            }
        }
        _ => {}
    }
    mapped
}
