//! LLM-driven workflow analysis: missing tools and dependencies.
//!
//! Both analyzers treat the LLM as a fallible subcontractor: low
//! temperature, JSON response format, brace-slice repair, and a
//! deterministic fallback ("nothing missing" / "sequential with no
//! dependencies") so the plan pipeline never fails on garbage output.

mod deps;
mod missing;

pub use deps::{DependencyAnalysis, DependencyAnalyzer};
pub use missing::{default_args_for, MissingToolAnalyzer, MissingToolsReport};
