//! Compression thresholds and windows.

/// Configuration for the compression gate.
#[derive(Clone, Debug)]
pub struct CompressionConfig {
    /// High-water mark: compress once the assembled messages exceed this.
    pub max_total_tokens: u32,
    /// Most recent messages kept verbatim.
    pub recent_keep: usize,
    /// Window before the recent one; folded into the digest together with
    /// everything older.
    pub middle_range: usize,
    /// Digest size above which the semantic LLM rewrite runs.
    pub digest_llm_threshold: u32,
    /// Token budget for the semantic rewrite.
    pub semantic_max_tokens: u32,
    /// Cheap models for the rewrite, tried in order.
    pub models: Vec<String>,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            max_total_tokens: 40_000,
            recent_keep: 20,
            middle_range: 40,
            digest_llm_threshold: 5_000,
            semantic_max_tokens: 400,
            models: vec!["openai/gpt-4o-mini".to_string()],
        }
    }
}
