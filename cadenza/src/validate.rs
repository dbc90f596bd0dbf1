//! Argument validation and filtering (per-tool allowed parameter sets).
//!
//! Three passes over a tool's argument object:
//! 1. rename known mistakes (`location` → `city`, `company_size` → `size`);
//! 2. drop parameters outside the tool's allowed set;
//! 3. promote scalars to singleton arrays for array fields and strip empty
//!    strings inside arrays.
//!
//! The function is idempotent: `validate(validate(x)) == validate(x)`.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use tracing::debug;

static ALLOWED_PARAMS: Lazy<HashMap<&'static str, HashSet<&'static str>>> = Lazy::new(|| {
    HashMap::from([
        (
            "search_leads",
            HashSet::from([
                "companyName",
                "industry",
                "speciality",
                "size",
                "revenue",
                "fundingType",
                "fundingMinDate",
                "fundingMaxDate",
                "fullName",
                "seniority",
                "functionalLevel",
                "designation",
                "country",
                "state",
                "city",
                "companyIds",
                "isFilter",
                "limit",
            ]),
        ),
        (
            "search_companies",
            HashSet::from([
                "companyName",
                "hqCountry",
                "hqState",
                "hqCity",
                "industry",
                "company_type",
                "hiringAreas",
                "speciality",
                "size",
                "revenue",
                "websiteKeywords",
                "techParams",
                "langTechOs",
                "websiteList",
                "uniqueCompanies",
                "excludeWebList",
                "funding",
                "fundingType",
                "fundingMinDate",
                "fundingMaxDate",
                "contentSearch",
                "partnerIntent",
                "lockedCompany",
                "correspondence",
                "boardline",
                "exclude_companies",
                "limit",
                "start",
                "sort",
            ]),
        ),
        (
            "generate_email",
            HashSet::from(["tone", "email_type", "purpose", "example"]),
        ),
        (
            "create_cadence",
            HashSet::from([
                "name",
                "cadence_type",
                "recipients",
                "tags",
                "start_date",
                "start_time",
                "white_days",
                "is_active",
                "status",
                "template_details",
            ]),
        ),
        (
            "add_contacts_to_cadence",
            HashSet::from(["name", "recipients_ids", "cadence_id"]),
        ),
    ])
});

/// Fixed rename corrections for parameter names models commonly invent.
static PARAM_CORRECTIONS: Lazy<HashMap<&'static str, HashMap<&'static str, &'static str>>> =
    Lazy::new(|| {
        HashMap::from([
            (
                "search_leads",
                HashMap::from([
                    ("location", "city"),
                    ("company_size", "size"),
                    ("job_title", "designation"),
                    ("jobTitle", "designation"),
                    ("department", "functionalLevel"),
                    ("position", "designation"),
                    ("company_name", "companyName"),
                    ("role", "designation"),
                    ("job_function", "functionalLevel"),
                ]),
            ),
            (
                "search_companies",
                HashMap::from([
                    ("location", "hqCity"),
                    ("company_size", "size"),
                    ("company_name", "companyName"),
                    ("headquarters", "hqCity"),
                    ("hq_country", "hqCountry"),
                    ("hq_state", "hqState"),
                    ("hq_city", "hqCity"),
                ]),
            ),
        ])
    });

/// Fields whose values are arrays; lone scalars are promoted to singletons.
static ARRAY_FIELDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "companyName",
        "companyIds",
        "industry",
        "speciality",
        "size",
        "revenue",
        "fundingType",
        "seniority",
        "functionalLevel",
        "designation",
        "country",
        "state",
        "city",
        "hqCountry",
        "hqState",
        "hqCity",
        "company_type",
        "hiringAreas",
        "websiteKeywords",
        "recipients",
        "recipients_ids",
        "tags",
        "white_days",
    ])
});

/// Filters `args` to the tool's allowed parameters, applying rename
/// corrections and array normalization. Unknown tools pass through
/// unchanged.
pub fn validate(tool_name: &str, args: &Value) -> Value {
    let Some(allowed) = ALLOWED_PARAMS.get(tool_name) else {
        debug!(tool = tool_name, "unknown tool, keeping original args");
        return args.clone();
    };
    let Some(input) = args.as_object() else {
        return Value::Object(Map::new());
    };
    let corrections = PARAM_CORRECTIONS.get(tool_name);

    let mut removed: Vec<&str> = Vec::new();
    let mut out = Map::new();
    for (key, value) in input {
        let target = if allowed.contains(key.as_str()) {
            Some(key.as_str())
        } else {
            corrections
                .and_then(|c| c.get(key.as_str()))
                .copied()
                .filter(|renamed| allowed.contains(renamed))
        };
        match target {
            Some(name) => {
                out.insert(name.to_string(), normalize_value(name, value));
            }
            None => removed.push(key.as_str()),
        }
    }
    if !removed.is_empty() {
        debug!(tool = tool_name, removed = ?removed, "filtered invalid parameters");
    }
    Value::Object(out)
}

/// Promotes scalars to singleton arrays for array fields and strips empty
/// strings from arrays.
fn normalize_value(field: &str, value: &Value) -> Value {
    if !ARRAY_FIELDS.contains(field) {
        return value.clone();
    }
    let items: Vec<Value> = match value {
        Value::Array(list) => list.clone(),
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    };
    let cleaned: Vec<Value> = items
        .into_iter()
        .filter(|v| !matches!(v, Value::String(s) if s.is_empty()))
        .collect();
    Value::Array(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// **Scenario**: Unknown parameters are dropped; rename corrections
    /// land on the canonical key.
    #[test]
    fn drops_unknown_and_renames() {
        let args = json!({
            "location": "Pune",
            "job_title": ["CTO"],
            "industry": ["Technology"],
            "made_up": true
        });
        let out = validate("search_leads", &args);
        assert_eq!(out["city"], json!(["Pune"]));
        assert_eq!(out["designation"], json!(["CTO"]));
        assert_eq!(out["industry"], json!(["Technology"]));
        assert!(out.get("made_up").is_none());
        assert!(out.get("location").is_none());
    }

    /// **Scenario**: Company-search renames differ from lead-search
    /// (location → hqCity).
    #[test]
    fn company_renames_to_hq() {
        let out = validate("search_companies", &json!({"location": ["Austin"]}));
        assert_eq!(out["hqCity"], json!(["Austin"]));
    }

    /// **Scenario**: Scalars promote to singleton arrays; empty strings
    /// are stripped from arrays.
    #[test]
    fn array_normalization() {
        let out = validate(
            "search_leads",
            &json!({"city": "Mumbai", "industry": ["", "Retail", ""]}),
        );
        assert_eq!(out["city"], json!(["Mumbai"]));
        assert_eq!(out["industry"], json!(["Retail"]));
    }

    /// **Scenario**: validate(validate(x)) == validate(x).
    #[test]
    fn idempotent() {
        let args = json!({
            "location": "Pune",
            "company_size": ["11 - 50"],
            "industry": "Technology",
            "junk": 1
        });
        let once = validate("search_leads", &args);
        let twice = validate("search_leads", &once);
        assert_eq!(once, twice);
    }

    /// **Scenario**: Unknown tool passes arguments through unchanged.
    #[test]
    fn unknown_tool_passthrough() {
        let args = json!({"anything": ["goes"]});
        assert_eq!(validate("mystery_tool", &args), args);
    }

    /// **Scenario**: add_contacts_to_cadence keeps only its three keys.
    #[test]
    fn add_contacts_allowed_set() {
        let out = validate(
            "add_contacts_to_cadence",
            &json!({"cadence_id": "c1", "recipients_ids": ["1"], "name": "X", "extra": 2}),
        );
        assert_eq!(out["cadence_id"], "c1");
        assert!(out.get("extra").is_none());
    }

    /// **Scenario**: Non-object arguments collapse to an empty object.
    #[test]
    fn non_object_args() {
        assert_eq!(
            validate("search_leads", &json!("oops")),
            json!({})
        );
    }
}
