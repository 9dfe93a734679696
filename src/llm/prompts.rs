//! Prompt templates.
//!
//! Each [`PromptKind`] has a built-in template. A file named
//! `<prompts.dir>/<kind>.txt` replaces it when present. Templates use
//! `{text}`, `{source1}` and `{source2}` placeholders; doubled braces
//! (`{{` / `}}`) render as literal braces.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    BiasDetection,
    FactOpinion,
    SourceComparison,
    Insight,
}

impl PromptKind {
    pub fn file_stem(&self) -> &'static str {
        match self {
            PromptKind::BiasDetection => "bias_detection",
            PromptKind::FactOpinion => "fact_opinion",
            PromptKind::SourceComparison => "source_comparison",
            PromptKind::Insight => "insight",
        }
    }

    pub fn system_prompt(&self) -> &'static str {
        match self {
            PromptKind::BiasDetection => {
                "You are a media bias analyst. Always respond with ONLY a valid JSON object. No additional text, explanations, or markdown formatting."
            }
            PromptKind::FactOpinion => {
                "You are a fact-checking expert. Always respond with ONLY a valid JSON object. No additional text, explanations, or markdown formatting."
            }
            PromptKind::SourceComparison => {
                "You are an expert media analyst. Compare sources objectively and provide detailed analysis in JSON format."
            }
            PromptKind::Insight => {
                "You are a media literacy editor. Answer in plain prose, two to four sentences, no lists and no markdown."
            }
        }
    }

    pub fn default_template(&self) -> &'static str {
        match self {
            PromptKind::BiasDetection => {
                r#"Analyze the following text for bias. Return ONLY a valid JSON object with no extra text:

Text: {text}

{{
  "political_bias": "left_leaning",
  "political_confidence": 0.8,
  "emotional_bias": "neutral",
  "emotional_confidence": 0.7,
  "explanation": "Brief explanation here"
}}"#
            }
            PromptKind::FactOpinion => {
                r#"Analyze the following text to classify as facts or opinions. Return ONLY a valid JSON object:

Text: {text}

{{
  "overall_classification": "mostly_factual",
  "confidence": 0.8,
  "fact_percentage": 70,
  "opinion_percentage": 30,
  "reasoning": "Brief reasoning here"
}}"#
            }
            PromptKind::SourceComparison => {
                r#"Compare the following sources. Return ONLY a valid JSON object:

Source 1: {source1}
Source 2: {source2}

{{
  "factual_consistency": "consistent",
  "similarity_score": 0.8,
  "key_differences": "Main differences here",
  "bias_comparison": "Both sources appear neutral"
}}"#
            }
            PromptKind::Insight => {
                r#"Give a short editorial insight on the following article: how reliable it reads, how it frames the story, and what a careful reader should double-check.

Article: {text}"#
            }
        }
    }
}

/// Substitute `{name}` placeholders in a single pass over the template.
///
/// `{{` and `}}` in the template become literal braces. Inserted values are
/// copied verbatim, and unknown placeholders are left as written.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if tail.starts_with("{{") || tail.starts_with("}}") {
            out.push_str(&tail[..1]);
            rest = &tail[2..];
            continue;
        }
        if tail.starts_with('{') {
            if let Some(end) = tail.find('}') {
                let name = &tail[1..end];
                if let Some((_, value)) = vars.iter().find(|(n, _)| *n == name) {
                    out.push_str(value);
                    rest = &tail[end + 1..];
                    continue;
                }
            }
        }
        out.push_str(&tail[..1]);
        rest = &tail[1..];
    }
    out.push_str(rest);
    out
}

#[derive(Debug, Clone)]
pub struct PromptLibrary {
    dir: PathBuf,
}

impl PromptLibrary {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// The override file for `kind`, or the built-in template.
    pub async fn load(&self, kind: PromptKind) -> String {
        let path = self.dir.join(format!("{}.txt", kind.file_stem()));
        match fs::read_to_string(&path).await {
            Ok(raw) if !raw.trim().is_empty() => {
                debug!(path = %path.display(), "Loaded prompt template");
                raw.trim().to_string()
            }
            Ok(_) => {
                warn!(path = %path.display(), "Prompt template is empty; using default");
                kind.default_template().to_string()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                kind.default_template().to_string()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to load prompt template; using default");
                kind.default_template().to_string()
            }
        }
    }
}
