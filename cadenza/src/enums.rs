//! Enum/vocabulary mapping for search-tool arguments.
//!
//! Search filters draw from closed vocabularies (industry, seniority,
//! size, revenue, funding type, hiring area, functional level, company
//! type). Free-text values from the model are mapped onto canonical values
//! by an LLM call at temperature 0, with hard guarantees enforced in code:
//! no returned value is ever outside the supplied valid values, and any
//! LLM failure leaves the validated arguments unchanged. City fields are
//! not a closed vocabulary; their bidirectional synonyms
//! (Bangalore ↔ Bengaluru etc.) are expanded deterministically.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::llm::{json_repair, purpose, ChatRequest, LlmClient};
use crate::message::Message;
use crate::tools::{TOOL_SEARCH_COMPANIES, TOOL_SEARCH_LEADS};

/// Canonical key casing for mapper output keys.
static KEY_CASING: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("industry", "industry"),
        ("size", "size"),
        ("seniority", "seniority"),
        ("revenue", "revenue"),
        ("functionallevel", "functionalLevel"),
        ("functionalLevel", "functionalLevel"),
        ("fundingtype", "fundingType"),
        ("fundingType", "fundingType"),
        ("hiringareas", "hiringAreas"),
        ("hiringAreas", "hiringAreas"),
        ("company_type", "company_type"),
        ("companytype", "company_type"),
        ("companyTypes", "company_type"),
    ])
});

/// Bidirectional city synonyms (lowercase).
static CITY_SYNONYMS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("bangalore", "Bengaluru"),
        ("bengaluru", "Bangalore"),
        ("bombay", "Mumbai"),
        ("mumbai", "Bombay"),
        ("calcutta", "Kolkata"),
        ("kolkata", "Calcutta"),
        ("madras", "Chennai"),
        ("chennai", "Madras"),
    ])
});

/// Closed vocabularies per field.
#[derive(Clone, Debug)]
pub struct EnumCatalog {
    fields: BTreeMap<String, Vec<String>>,
}

impl EnumCatalog {
    pub fn new(fields: BTreeMap<String, Vec<String>>) -> Self {
        Self { fields }
    }

    /// Loads a catalog from a JSON object `{field: [values...]}`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let mut fields = BTreeMap::new();
        for (k, v) in obj {
            let values = v
                .as_array()?
                .iter()
                .filter_map(|x| x.as_str().map(String::from))
                .collect();
            fields.insert(k.clone(), values);
        }
        Some(Self { fields })
    }

    pub fn valid_values(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(|v| v.as_slice())
    }

    pub fn contains_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }
}

impl Default for EnumCatalog {
    fn default() -> Self {
        let strs = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let mut fields = BTreeMap::new();
        fields.insert(
            "industry".into(),
            strs(&[
                "Technology",
                "Software Development",
                "IT Services and IT Consulting",
                "Financial Services",
                "Banking",
                "Insurance",
                "Hospitals and Health Care",
                "Medical Devices",
                "Pharmaceutical Manufacturing",
                "Retail",
                "Internet Retail",
                "Manufacturing",
                "Motor Vehicle Manufacturing",
                "Real Estate",
                "Education",
                "Food and Beverages",
                "Telecommunications",
                "Consulting",
            ]),
        );
        fields.insert(
            "seniority".into(),
            strs(&[
                "CEO",
                "CTO",
                "CFO",
                "CMO",
                "COO",
                "CXO",
                "President",
                "Founder",
                "Vice President",
                "Director",
                "Manager",
                "Head",
            ]),
        );
        fields.insert(
            "size".into(),
            strs(&[
                "1",
                "2 - 10",
                "11 - 50",
                "51 - 200",
                "201 - 500",
                "501 - 1000",
                "1001 - 5000",
                "5001 - 10000",
                "10001+",
            ]),
        );
        fields.insert(
            "revenue".into(),
            strs(&[
                "$0 - $1M",
                "$1M - $10M",
                "$10M - $50M",
                "$50M - $100M",
                "$100M - $500M",
                "$500M - $1B",
                "$1B+",
            ]),
        );
        fields.insert(
            "fundingType".into(),
            strs(&[
                "Seed",
                "Angel",
                "Venture Capital",
                "Private Equity",
                "Debt Financing",
                "Self Funded",
                "IPO",
            ]),
        );
        fields.insert(
            "hiringAreas".into(),
            strs(&[
                "Engineering",
                "Product",
                "Sales",
                "Marketing",
                "Human Resources",
                "Finance",
                "Operations",
                "Design",
            ]),
        );
        fields.insert(
            "functionalLevel".into(),
            strs(&[
                "Engineering",
                "Sales",
                "Marketing",
                "Finance",
                "Human Resources",
                "Operations",
                "Purchase",
                "Information Technology",
                "Legal",
                "Product",
            ]),
        );
        fields.insert(
            "company_type".into(),
            strs(&[
                "Technology",
                "Consulting",
                "Agency",
                "Manufacturer",
                "Distributor",
                "Service Provider",
            ]),
        );
        Self { fields }
    }
}

/// Maps free-text search values onto the catalog via the LLM.
pub struct EnumMapper {
    llm: Arc<dyn LlmClient>,
    catalog: EnumCatalog,
    models: Vec<String>,
}

impl EnumMapper {
    pub fn new(llm: Arc<dyn LlmClient>, catalog: EnumCatalog, models: Vec<String>) -> Self {
        Self {
            llm,
            catalog,
            models,
        }
    }

    /// Maps enum-backed fields of a search tool's validated arguments.
    /// Non-search tools and argument sets with no mappable fields pass
    /// through unchanged; so does every LLM failure.
    pub async fn map_args(&self, tool_name: &str, args: &Value) -> Value {
        if tool_name != TOOL_SEARCH_LEADS && tool_name != TOOL_SEARCH_COMPANIES {
            return args.clone();
        }
        let Some(input) = args.as_object() else {
            return args.clone();
        };

        let mut out = expand_city_synonyms(input);

        let fields_to_map: BTreeMap<String, Vec<String>> = out
            .iter()
            .filter(|(k, _)| self.catalog.contains_field(k))
            .filter_map(|(k, v)| {
                let values: Vec<String> = v
                    .as_array()?
                    .iter()
                    .filter_map(|x| x.as_str().map(String::from))
                    .collect();
                (!values.is_empty()).then(|| (k.clone(), values))
            })
            .collect();
        if fields_to_map.is_empty() {
            return Value::Object(out);
        }

        let Some(mapped) = self.map_enums(&fields_to_map).await else {
            // LLM failed; keep the validated-but-unmapped arguments.
            return Value::Object(out);
        };

        for field in fields_to_map.keys() {
            match mapped.get(field) {
                Some(values) if !values.is_empty() => {
                    out.insert(
                        field.clone(),
                        Value::Array(values.iter().cloned().map(Value::String).collect()),
                    );
                }
                // No valid mapping for this field; drop it rather than
                // send an invalid value to the backend.
                _ => {
                    out.remove(field);
                }
            }
        }
        Value::Object(out)
    }

    /// One LLM call mapping every field at once. Returns `None` on any
    /// failure; the guarantee filter runs on success.
    async fn map_enums(
        &self,
        fields_to_map: &BTreeMap<String, Vec<String>>,
    ) -> Option<HashMap<String, Vec<String>>> {
        let request = ChatRequest::new(
            purpose::PARAMETER_MAPPING,
            self.models.clone(),
            vec![
                Message::system(
                    "You are a precise parameter mapping expert. Follow instructions exactly \
                     and return only valid JSON.",
                ),
                Message::user(build_mapping_prompt(fields_to_map, &self.catalog)),
            ],
        )
        .with_temperature(0.0)
        .with_max_tokens(1000)
        .json();

        let outcome = match self.llm.complete(request).await {
            Ok(o) => o,
            Err(e) => {
                warn!(error = %e, "parameter mapping failed, keeping original values");
                return None;
            }
        };
        let parsed = json_repair::parse_object(&outcome.content)?;
        let obj = parsed.as_object()?;

        let mut result: HashMap<String, Vec<String>> = HashMap::new();
        for (raw_key, raw_value) in obj {
            let Some(key) = normalize_key(raw_key) else {
                continue;
            };
            let Some(valid) = self.catalog.valid_values(&key) else {
                continue;
            };
            let candidates: Vec<String> = match raw_value {
                Value::Array(list) => list
                    .iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect(),
                Value::String(s) => vec![s.clone()],
                _ => continue,
            };
            // Hard guarantee: only values present in valid_values survive,
            // re-cased to the catalog's canonical form.
            let entry = result.entry(key).or_default();
            for candidate in candidates {
                if let Some(canonical) = valid
                    .iter()
                    .find(|v| v.eq_ignore_ascii_case(candidate.trim()))
                {
                    if !entry.contains(canonical) {
                        entry.push(canonical.clone());
                    }
                }
            }
        }
        debug!(mapped = ?result, "parameter mapping result");
        Some(result)
    }
}

fn normalize_key(raw: &str) -> Option<String> {
    KEY_CASING
        .get(raw)
        .or_else(|| KEY_CASING.get(raw.to_lowercase().as_str()))
        .map(|k| k.to_string())
}

/// Adds the counterpart of each known city synonym to city/hqCity arrays.
fn expand_city_synonyms(input: &Map<String, Value>) -> Map<String, Value> {
    let mut out = input.clone();
    for field in ["city", "hqCity"] {
        let Some(Value::Array(values)) = out.get(field) else {
            continue;
        };
        let mut expanded = values.clone();
        for v in values {
            let Some(s) = v.as_str() else { continue };
            if let Some(synonym) = CITY_SYNONYMS.get(s.to_lowercase().as_str()) {
                let already = expanded
                    .iter()
                    .any(|e| e.as_str().is_some_and(|x| x.eq_ignore_ascii_case(synonym)));
                if !already {
                    expanded.push(Value::String(synonym.to_string()));
                }
            }
        }
        out.insert(field.to_string(), Value::Array(expanded));
    }
    out
}

fn build_mapping_prompt(
    fields_to_map: &BTreeMap<String, Vec<String>>,
    catalog: &EnumCatalog,
) -> String {
    let mut parts = vec![
        "Map user-provided search terms to valid enum values from our database.".to_string(),
        String::new(),
        "RULES:".to_string(),
        "1. ONLY return values that exist in the provided valid values lists".to_string(),
        "2. If no valid mapping exists for a field, omit that field entirely".to_string(),
        "3. Be conservative - better to omit than to guess incorrectly".to_string(),
        "4. Expand abbreviations: BFSI -> Banking + Financial Services + Insurance, \
         F&B -> Food and Beverages"
            .to_string(),
        "5. For \"decision makers\", map seniority to C-level, President, Founder, \
         Vice President, Director"
            .to_string(),
        "6. If multiple relevant values exist, return all of them".to_string(),
        String::new(),
    ];
    for (field, user_values) in fields_to_map {
        let valid = catalog.valid_values(field).unwrap_or(&[]);
        parts.push(format!("--- {} ---", field.to_uppercase()));
        parts.push(format!("User input: {user_values:?}"));
        parts.push(format!("Valid options: {valid:?}"));
    }
    parts.push(String::new());
    parts.push(
        "Return ONLY a JSON object mapping field names to arrays of valid values, e.g. \
         {\"seniority\": [\"CEO\", \"CTO\"], \"industry\": [\"Technology\"]}."
            .to_string(),
    );
    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmError, MockLlm};
    use serde_json::json;

    fn mapper(llm: MockLlm) -> EnumMapper {
        EnumMapper::new(Arc::new(llm), EnumCatalog::default(), vec!["m".into()])
    }

    /// **Scenario**: BFSI expands to the three industries via the LLM and
    /// every returned value is inside the catalog.
    #[tokio::test]
    async fn maps_abbreviation_to_catalog_values() {
        let llm = MockLlm::new();
        llm.script_json(
            purpose::PARAMETER_MAPPING,
            json!({"industry": ["Banking", "Financial Services", "Insurance", "Made Up"]}),
        );
        let out = mapper(llm)
            .map_args("search_leads", &json!({"industry": ["BFSI"]}))
            .await;
        assert_eq!(
            out["industry"],
            json!(["Banking", "Financial Services", "Insurance"])
        );
    }

    /// **Scenario**: LLM failure keeps the validated arguments unchanged.
    #[tokio::test]
    async fn llm_failure_is_identity() {
        let llm = MockLlm::new();
        llm.script_err(purpose::PARAMETER_MAPPING, LlmError::Network("down".into()));
        let args = json!({"industry": ["fintech"], "city": ["Pune"]});
        let out = mapper(llm).map_args("search_leads", &args).await;
        assert_eq!(out["industry"], json!(["fintech"]));
        assert_eq!(out["city"], json!(["Pune"]));
    }

    /// **Scenario**: A field the LLM omits is dropped (no valid mapping),
    /// while mapped fields are replaced.
    #[tokio::test]
    async fn unmapped_field_dropped() {
        let llm = MockLlm::new();
        llm.script_json(purpose::PARAMETER_MAPPING, json!({"seniority": ["CTO"]}));
        let out = mapper(llm)
            .map_args(
                "search_leads",
                &json!({"seniority": ["tech leaders"], "industry": ["nonsense"]}),
            )
            .await;
        assert_eq!(out["seniority"], json!(["CTO"]));
        assert!(out.get("industry").is_none());
    }

    /// **Scenario**: Key casing is normalized (functionallevel →
    /// functionalLevel) and values are matched case-insensitively to the
    /// catalog's canonical casing.
    #[tokio::test]
    async fn key_and_value_casing_normalized() {
        let llm = MockLlm::new();
        llm.script_json(
            purpose::PARAMETER_MAPPING,
            json!({"functionallevel": ["purchase", "SALES"]}),
        );
        let out = mapper(llm)
            .map_args("search_leads", &json!({"functionalLevel": ["procurement"]}))
            .await;
        assert_eq!(out["functionalLevel"], json!(["Purchase", "Sales"]));
    }

    /// **Scenario**: City synonyms expand bidirectionally without any LLM
    /// call; non-enum fields trigger no mapping.
    #[tokio::test]
    async fn city_synonyms_expand() {
        let llm = MockLlm::new();
        let out = mapper(llm)
            .map_args("search_leads", &json!({"city": ["Bangalore"]}))
            .await;
        let cities = out["city"].as_array().unwrap();
        assert!(cities.contains(&json!("Bangalore")));
        assert!(cities.contains(&json!("Bengaluru")));
    }

    /// **Scenario**: Non-search tools pass through untouched.
    #[tokio::test]
    async fn non_search_tool_passthrough() {
        let llm = MockLlm::new();
        let args = json!({"tone": "professional"});
        let out = mapper(llm).map_args("generate_email", &args).await;
        assert_eq!(out, args);
    }
}
