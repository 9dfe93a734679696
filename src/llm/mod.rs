//! Hosted LLM analysis.
//!
//! - [`api`]: chat-completion client and retry decorator
//! - [`prompts`]: built-in templates with file overrides
//! - [`parse`]: JSON recovery from model output
//! - [`analyzer`]: the bias, fact/opinion, comparison and insight calls

pub mod analyzer;
pub mod api;
pub mod parse;
pub mod prompts;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use analyzer::LlmAnalyzer;

use crate::models::{SourceComparison, Stage};

/// Output of [`LlmAnalyzer::comprehensive_llm_analysis`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmReport {
    pub bias_analysis: Stage<Value>,
    pub fact_opinion_analysis: Stage<Value>,
    pub insight: Stage<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_comparisons: Vec<SourceComparison>,
}
