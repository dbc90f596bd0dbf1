//! JSON repair for model output: slice the object between the first `{`
//! and the last `}` so prose-wrapped or fenced replies still parse.

/// Returns the substring from the first `{` to the last `}` inclusive, or
/// `None` when no such span exists.
pub fn slice_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&content[start..=end])
}

/// Parses model output as a JSON object, repairing wrapped responses.
pub fn parse_object(content: &str) -> Option<serde_json::Value> {
    let sliced = slice_object(content)?;
    serde_json::from_str(sliced).ok()
}
