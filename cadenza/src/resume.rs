//! Resume command grammar.
//!
//! ```text
//! APPROVE_PLAN:<plan_id>
//! EDIT_PLAN:<plan_id>:<json-object>
//! ```
//!
//! `<plan_id>` must match `plan_[0-9]+_[0-9a-f]+`. These arrive as the
//! next user message while a plan is paused at review.

use serde_json::Value;

use crate::error::ResumeError;
use crate::plan::is_valid_plan_id;

/// A parsed resume command.
#[derive(Clone, Debug, PartialEq)]
pub enum ResumeCommand {
    Approve { plan_id: String },
    Edit { plan_id: String, plan: Value },
}

impl ResumeCommand {
    /// True when the message looks like a resume command at all.
    pub fn is_resume_message(message: &str) -> bool {
        message.starts_with("APPROVE_PLAN:") || message.starts_with("EDIT_PLAN:")
    }

    pub fn plan_id(&self) -> &str {
        match self {
            ResumeCommand::Approve { plan_id } => plan_id,
            ResumeCommand::Edit { plan_id, .. } => plan_id,
        }
    }

    /// Parses a resume message, validating the plan-id grammar and (for
    /// edits) the JSON payload.
    pub fn parse(message: &str) -> Result<Self, ResumeError> {
        if let Some(rest) = message.strip_prefix("APPROVE_PLAN:") {
            let plan_id = rest.trim();
            if !is_valid_plan_id(plan_id) {
                return Err(ResumeError::InvalidCommand(format!(
                    "invalid plan id: {plan_id}"
                )));
            }
            return Ok(ResumeCommand::Approve {
                plan_id: plan_id.to_string(),
            });
        }
        if let Some(rest) = message.strip_prefix("EDIT_PLAN:") {
            let (plan_id, payload) = rest.split_once(':').ok_or_else(|| {
                ResumeError::InvalidCommand("EDIT_PLAN requires a plan id and JSON".into())
            })?;
            let plan_id = plan_id.trim();
            if !is_valid_plan_id(plan_id) {
                return Err(ResumeError::InvalidCommand(format!(
                    "invalid plan id: {plan_id}"
                )));
            }
            let plan: Value = serde_json::from_str(payload)
                .map_err(|e| ResumeError::InvalidPlan(e.to_string()))?;
            if !plan.is_object() {
                return Err(ResumeError::InvalidPlan("plan must be a JSON object".into()));
            }
            return Ok(ResumeCommand::Edit {
                plan_id: plan_id.to_string(),
                plan,
            });
        }
        Err(ResumeError::InvalidCommand(
            "not a resume command".to_string(),
        ))
    }
}
