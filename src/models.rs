//! Data models for extracted articles and their analysis documents.
//!
//! This module defines the core data structures used throughout the application:
//! - [`ArticleSource`]: what the user asked us to analyze (URL or pasted text)
//! - [`ExtractedArticle`]: article content and metadata after extraction
//! - [`Stage`]: the outcome of one analysis step, a value or an error message
//! - [`AnalysisReport`]: every stage of one analysis plus the flat [`AnalysisSummary`]
//! - [`AnalysisRecord`]: the persisted document, one per analysis
//! - [`ComparisonReport`]: multi-source comparison output (not persisted)

use chrono::{DateTime, Utc};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;
use crate::llm::LlmReport;
use crate::nlp::bias::BiasReport;
use crate::nlp::fact_opinion::FactOpinionReport;
use crate::nlp::similarity::{ArticleComparison, ContentOverlap};

/// Source identifier stored for pasted text.
pub const DIRECT_INPUT: &str = "direct_input";

/// Input to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ArticleSource {
    Url(String),
    Text(String),
}

impl ArticleSource {
    /// Treat input that parses as an http(s) URL as a URL, anything else as text.
    pub fn detect(input: &str) -> Self {
        let trimmed = input.trim();
        if crate::utils::is_valid_url(trimmed) && !trimmed.contains(char::is_whitespace) {
            Self::Url(trimmed.to_string())
        } else {
            Self::Text(input.to_string())
        }
    }

    /// The identifier persisted with the analysis.
    pub fn identifier(&self) -> &str {
        match self {
            Self::Url(url) => url,
            Self::Text(_) => DIRECT_INPUT,
        }
    }
}

/// Article content and metadata after extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedArticle {
    pub url: String,
    pub title: String,
    pub content: String,
    pub authors: Vec<String>,
    pub publish_date: Option<DateTime<Utc>>,
    pub summary: String,
    pub domain: String,
    pub word_count: usize,
    pub source_type: String,
}

/// Outcome of one analysis stage.
///
/// Serialized as the value itself, or as `{"error": "..."}` on failure, so a
/// failed stage sits next to the successful ones in the stored document.
/// Only an object whose single key is a string `error` reads back as
/// [`Stage::Failed`]; any other value goes to `T`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Stage<T> {
    Failed { error: String },
    Done(T),
}

fn failure_message(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) if map.len() == 1 => map.get("error")?.as_str().map(str::to_string),
        _ => None,
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Stage<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if let Some(error) = failure_message(&value) {
            return Ok(Stage::Failed { error });
        }
        T::deserialize(value).map(Stage::Done).map_err(de::Error::custom)
    }
}

impl<T> Stage<T> {
    pub fn failed(error: impl ToString) -> Self {
        Stage::Failed {
            error: error.to_string(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Stage::Failed { .. })
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Stage::Done(v) => Some(v),
            Stage::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Stage::Failed { error } => Some(error),
            Stage::Done(_) => None,
        }
    }
}

impl<T> From<Result<T, Error>> for Stage<T> {
    fn from(result: Result<T, Error>) -> Self {
        match result {
            Ok(v) => Stage::Done(v),
            Err(e) => Stage::failed(e),
        }
    }
}

/// The flat fields of one analysis, as shown on the overview tab and in
/// history listings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub fact_percentage: Option<f64>,
    pub opinion_percentage: Option<f64>,
    pub sentiment: Option<String>,
    pub sentiment_confidence: Option<f64>,
    pub political_bias: Option<String>,
    pub political_score: Option<f64>,
    pub emotional_bias: Option<String>,
    pub ai_insight: Option<String>,
    pub credibility: f64,
}

/// Everything produced for one article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub article: ExtractedArticle,
    pub fact_opinion: Stage<FactOpinionReport>,
    pub bias_analysis: Stage<BiasReport>,
    pub llm_analysis: Stage<LlmReport>,
    pub summary: AnalysisSummary,
    pub timestamp: DateTime<Utc>,
}

impl AnalysisReport {
    /// At least one of the three analysis stages produced a value.
    pub fn any_stage_succeeded(&self) -> bool {
        !(self.fact_opinion.is_failed()
            && self.bias_analysis.is_failed()
            && self.llm_analysis.is_failed())
    }
}

/// One persisted analysis document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: i64,
    /// URL or [`DIRECT_INPUT`].
    pub url: String,
    /// First 500 characters of the article body.
    pub content: String,
    pub analysis: AnalysisReport,
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Result of [`crate::pipeline::Pipeline::analyze`], including whether the
/// document was stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub report: AnalysisReport,
    pub record_id: Option<i64>,
    pub persistence_error: Option<String>,
}

/// Per-source row of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceAnalysis {
    /// 0-based position among the sources the user submitted.
    pub index: usize,
    pub article: ExtractedArticle,
    pub fact_opinion: Stage<FactOpinionReport>,
    pub bias_analysis: Stage<BiasReport>,
    pub summary: AnalysisSummary,
}

/// A source that could not be extracted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedSource {
    pub index: usize,
    pub source: String,
    pub error: String,
}

/// LLM comparison of the first source against another one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceComparison {
    pub source_index: usize,
    pub comparison: Stage<serde_json::Value>,
}

/// Multi-source comparison output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub sources: Vec<SourceAnalysis>,
    pub skipped: Vec<SkippedSource>,
    pub overlap: Stage<ContentOverlap>,
    pub closest_pair: Stage<ArticleComparison>,
    pub llm_comparisons: Stage<Vec<SourceComparison>>,
    pub timestamp: DateTime<Utc>,
}
