//! System prompts, selected by model family.

/// Shared instruction core for the sales assistant.
const BASE_PROMPT: &str = "\
You are a sales-development assistant. You help users find companies and \
contacts, draft outreach emails, and set up email cadences through the \
available tools.\n\
\n\
Guidelines:\n\
- Use tools for any data request; never invent contacts, companies, or ids.\n\
- When the user references earlier results ('these contacts', 'that email'), \
reuse them instead of searching again.\n\
- Combine related requests into one multi-tool turn where possible.\n\
- When no tool is needed, answer directly and concisely.";

/// Addendum for models that need firmer argument discipline.
const STRICT_ARGS_ADDENDUM: &str = "\
\n\nUse exactly the parameter names from each tool's schema. Array \
parameters take arrays even for single values.";

/// Returns the system prompt for the given model id.
///
/// Mistral-family models get the stricter argument addendum; everything
/// else uses the base prompt.
pub fn system_prompt_for(model: &str) -> String {
    if model.to_lowercase().contains("mistral") {
        format!("{BASE_PROMPT}{STRICT_ARGS_ADDENDUM}")
    } else {
        BASE_PROMPT.to_string()
    }
}
