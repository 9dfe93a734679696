//! Political and emotional bias detection by keyword counting, plus the
//! combined bias report that also carries sentiment.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::instrument;

use crate::error::{Error, Result};
use crate::models::Stage;
use crate::nlp::sentiment::{SentimentAnalyzer, SentimentReport};
use crate::utils::{round_to, word_count};

const LEFT_LEANING: &[&str] = &[
    "progressive",
    "liberal",
    "social justice",
    "inequality",
    "climate change",
    "healthcare for all",
    "minimum wage",
    "diversity",
    "inclusion",
    "regulation",
];

const RIGHT_LEANING: &[&str] = &[
    "conservative",
    "traditional values",
    "free market",
    "deregulation",
    "tax cuts",
    "border security",
    "law and order",
    "second amendment",
    "small government",
];

const NEUTRAL_REPORTING: &[&str] = &[
    "according to",
    "reported",
    "stated",
    "official",
    "data shows",
    "study found",
];

const HIGHLY_EMOTIONAL: &[&str] = &[
    "outrageous",
    "shocking",
    "incredible",
    "unbelievable",
    "devastating",
    "amazing",
    "terrible",
    "horrific",
    "wonderful",
    "spectacular",
];

const MODERATE_EMOTIONAL: &[&str] = &[
    "concerning",
    "interesting",
    "notable",
    "significant",
    "important",
    "positive",
    "negative",
    "good",
    "bad",
    "better",
    "worse",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoliticalLean {
    LeftLeaning,
    RightLeaning,
    Balanced,
    Neutral,
}

impl PoliticalLean {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoliticalLean::LeftLeaning => "left_leaning",
            PoliticalLean::RightLeaning => "right_leaning",
            PoliticalLean::Balanced => "balanced",
            PoliticalLean::Neutral => "neutral",
        }
    }

    pub fn is_even_handed(&self) -> bool {
        matches!(self, PoliticalLean::Balanced | PoliticalLean::Neutral)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionalLevel {
    HighlyEmotional,
    ModeratelyEmotional,
    Neutral,
}

impl EmotionalLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionalLevel::HighlyEmotional => "highly_emotional",
            EmotionalLevel::ModeratelyEmotional => "moderately_emotional",
            EmotionalLevel::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoliticalBias {
    pub political_bias: PoliticalLean,
    pub confidence: f64,
    pub keyword_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalBias {
    pub emotional_bias: EmotionalLevel,
    pub emotional_score: f64,
    pub keyword_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasReport {
    pub sentiment_analysis: Stage<SentimentReport>,
    pub political_bias: PoliticalBias,
    pub emotional_bias: EmotionalBias,
    pub text_length: usize,
    pub word_count: usize,
}

fn count(haystack: &str, keywords: &[&str]) -> usize {
    keywords.iter().filter(|k| haystack.contains(*k)).count()
}

pub fn detect_political_bias(text: &str) -> Result<PoliticalBias> {
    if text.trim().is_empty() {
        return Err(Error::EmptyText);
    }
    let lower = text.to_lowercase();
    let left = count(&lower, LEFT_LEANING);
    let right = count(&lower, RIGHT_LEANING);
    let neutral = count(&lower, NEUTRAL_REPORTING);
    let total = left + right;

    let lean_confidence = |n: usize| (0.5 + n as f64 / (total as f64 + 1.0) * 0.4).min(0.9);
    let (lean, confidence) = if total == 0 {
        (PoliticalLean::Neutral, 0.5)
    } else if left > right {
        (PoliticalLean::LeftLeaning, lean_confidence(left))
    } else if right > left {
        (PoliticalLean::RightLeaning, lean_confidence(right))
    } else {
        (PoliticalLean::Balanced, 0.6)
    };

    Ok(PoliticalBias {
        political_bias: lean,
        confidence: round_to(confidence, 3),
        keyword_counts: BTreeMap::from([
            ("left_leaning".to_string(), left),
            ("right_leaning".to_string(), right),
            ("neutral".to_string(), neutral),
        ]),
    })
}

pub fn detect_emotional_bias(text: &str) -> Result<EmotionalBias> {
    if text.trim().is_empty() {
        return Err(Error::EmptyText);
    }
    let lower = text.to_lowercase();
    let high = count(&lower, HIGHLY_EMOTIONAL);
    let moderate = count(&lower, MODERATE_EMOTIONAL);
    let words = word_count(text).max(1) as f64;

    let (level, score) = if high > 0 {
        (EmotionalLevel::HighlyEmotional, (high as f64 / words * 10.0).min(0.9))
    } else if moderate > 0 {
        (EmotionalLevel::ModeratelyEmotional, (moderate as f64 / words * 10.0).min(0.7))
    } else {
        (EmotionalLevel::Neutral, 0.3)
    };

    Ok(EmotionalBias {
        emotional_bias: level,
        emotional_score: round_to(score, 3),
        keyword_counts: BTreeMap::from([
            ("highly_emotional".to_string(), high),
            ("moderately_emotional".to_string(), moderate),
        ]),
    })
}

/// Sentiment, political and emotional bias in one report.
///
/// A sentiment failure is kept inside the report; the keyword detectors
/// cannot fail on non-empty text.
#[instrument(level = "info", skip_all, fields(len = text.len()))]
pub async fn comprehensive_bias_analysis(
    sentiment: &SentimentAnalyzer,
    text: &str,
) -> Result<BiasReport> {
    if text.trim().is_empty() {
        return Err(Error::EmptyText);
    }
    let sentiment_analysis = sentiment.analyze(text).await.into();
    Ok(BiasReport {
        sentiment_analysis,
        political_bias: detect_political_bias(text)?,
        emotional_bias: detect_emotional_bias(text)?,
        text_length: text.chars().count(),
        word_count: word_count(text),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_political_neutral_without_keywords() {
        let r = detect_political_bias("The council approved the budget on Monday.").unwrap();
        assert_eq!(r.political_bias, PoliticalLean::Neutral);
        assert_eq!(r.confidence, 0.5);
    }

    #[test]
    fn test_political_left_leaning() {
        // left = 2, right = 0 -> 0.5 + 2/3 * 0.4
        let r = detect_political_bias(
            "Progressive groups rallied for a higher minimum wage.",
        )
        .unwrap();
        assert_eq!(r.political_bias, PoliticalLean::LeftLeaning);
        assert_eq!(r.confidence, 0.767);
        assert_eq!(r.keyword_counts["left_leaning"], 2);
    }

    #[test]
    fn test_political_right_and_balanced() {
        let right = detect_political_bias("Conservative leaders praised the tax cuts.").unwrap();
        assert_eq!(right.political_bias, PoliticalLean::RightLeaning);

        let balanced =
            detect_political_bias("Liberal and conservative senators both spoke.").unwrap();
        assert_eq!(balanced.political_bias, PoliticalLean::Balanced);
        assert_eq!(balanced.confidence, 0.6);
    }

    #[test]
    fn test_neutral_reporting_counted() {
        let r = detect_political_bias("According to the report, officials stated the facts.")
            .unwrap();
        assert_eq!(r.keyword_counts["neutral"], 3);
        assert_eq!(r.political_bias, PoliticalLean::Neutral);
    }

    #[test]
    fn test_emotional_levels() {
        let high = detect_emotional_bias("A shocking and devastating result").unwrap();
        assert_eq!(high.emotional_bias, EmotionalLevel::HighlyEmotional);
        assert_eq!(high.emotional_score, 0.9);

        let many_words = format!("{} significant", "word ".repeat(99));
        let moderate = detect_emotional_bias(&many_words).unwrap();
        assert_eq!(moderate.emotional_bias, EmotionalLevel::ModeratelyEmotional);
        assert_eq!(moderate.emotional_score, 0.1);

        let neutral = detect_emotional_bias("The meeting starts at noon.").unwrap();
        assert_eq!(neutral.emotional_bias, EmotionalLevel::Neutral);
        assert_eq!(neutral.emotional_score, 0.3);
    }

    #[test]
    fn test_empty_text_rejected() {
        assert!(detect_political_bias(" ").is_err());
        assert!(detect_emotional_bias("").is_err());
    }

    #[tokio::test]
    async fn test_comprehensive_keeps_sentiment_failure() {
        let analyzer = SentimentAnalyzer::rule_based();
        let report = comprehensive_bias_analysis(&analyzer, "Too short").await.unwrap();
        assert!(report.sentiment_analysis.is_failed());
        assert_eq!(report.word_count, 2);
        assert_eq!(report.political_bias.political_bias, PoliticalLean::Neutral);
    }
}
