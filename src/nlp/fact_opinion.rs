//! Rule-based fact vs. opinion classification.
//!
//! Each sentence is scored by counting indicator phrases (substring matches
//! on the lowercased sentence). When the counts tie, regex patterns for
//! factual constructions (percentages, figures, dates, durations) and for
//! opinionated ones (intensifiers, evaluative adjectives, modals) break the
//! tie in that order.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::text::tokenize_sentences;
use crate::utils::round_to;

const FACT_INDICATORS: &[&str] = &[
    "according to",
    "reported",
    "stated",
    "announced",
    "confirmed",
    "data shows",
    "study found",
    "research indicates",
    "statistics show",
    "official",
    "government",
    "percent",
    "number",
    "amount",
    "total",
    "measured",
    "recorded",
    "documented",
    "verified",
];

const OPINION_INDICATORS: &[&str] = &[
    "i think",
    "i believe",
    "in my opinion",
    "seems like",
    "appears to be",
    "probably",
    "likely",
    "might",
    "could",
    "should",
    "would",
    "amazing",
    "terrible",
    "wonderful",
    "awful",
    "best",
    "worst",
    "love",
    "hate",
    "prefer",
    "wish",
    "hope",
    "feel",
    "personally",
];

static FACTUAL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\d+%",
        r"\d+\s*(million|billion|thousand)",
        r"(january|february|march|april|may|june|july|august|september|october|november|december)\s+\d+",
        r"\d+\s*(years|months|days|hours)",
        r"(increase|decrease|rise|fall|drop)\s+of\s+\d+",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("factual pattern is valid"))
    .collect()
});

static OPINION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(very|extremely|incredibly|absolutely|totally)\s+\w+",
        r"(good|bad|great|terrible|amazing|awful|wonderful|horrible)",
        r"(should|must|need to|have to|ought to)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("opinion pattern is valid"))
    .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentenceClass {
    Fact,
    Opinion,
    Neutral,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallClass {
    MostlyFactual,
    MostlyOpinion,
    Mixed,
}

impl OverallClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverallClass::MostlyFactual => "mostly_factual",
            OverallClass::MostlyOpinion => "mostly_opinion",
            OverallClass::Mixed => "mixed",
        }
    }
}

impl SentenceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentenceClass::Fact => "fact",
            SentenceClass::Opinion => "opinion",
            SentenceClass::Neutral => "neutral",
            SentenceClass::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceVerdict {
    pub classification: SentenceClass,
    pub confidence: f64,
    pub fact_indicators: usize,
    pub opinion_indicators: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceBreakdown {
    pub sentence: String,
    pub classification: SentenceClass,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactOpinionStats {
    pub total_sentences: usize,
    pub fact_sentences: usize,
    pub opinion_sentences: usize,
    pub neutral_sentences: usize,
    pub fact_percentage: f64,
    pub opinion_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactOpinionReport {
    pub overall_classification: OverallClass,
    pub sentence_breakdown: Vec<SentenceBreakdown>,
    pub statistics: FactOpinionStats,
}

fn count_indicators(haystack: &str, indicators: &[&str]) -> usize {
    indicators.iter().filter(|i| haystack.contains(*i)).count()
}

fn indicator_confidence(count: usize) -> f64 {
    (0.5 + count as f64 * 0.1).min(0.9)
}

fn has_factual_patterns(lower: &str) -> bool {
    FACTUAL_PATTERNS.iter().any(|re| re.is_match(lower))
}

fn has_opinion_patterns(lower: &str) -> bool {
    OPINION_PATTERNS.iter().any(|re| re.is_match(lower))
}

/// Classify a single sentence.
pub fn classify_sentence(sentence: &str) -> SentenceVerdict {
    if sentence.trim().is_empty() {
        return SentenceVerdict {
            classification: SentenceClass::Unknown,
            confidence: 0.0,
            fact_indicators: 0,
            opinion_indicators: 0,
        };
    }

    let lower = sentence.to_lowercase();
    let fact_count = count_indicators(&lower, FACT_INDICATORS);
    let opinion_count = count_indicators(&lower, OPINION_INDICATORS);

    let (classification, confidence) = if fact_count > opinion_count {
        (SentenceClass::Fact, indicator_confidence(fact_count))
    } else if opinion_count > fact_count {
        (SentenceClass::Opinion, indicator_confidence(opinion_count))
    } else if has_factual_patterns(&lower) {
        (SentenceClass::Fact, 0.6)
    } else if has_opinion_patterns(&lower) {
        (SentenceClass::Opinion, 0.6)
    } else {
        (SentenceClass::Neutral, 0.5)
    };

    SentenceVerdict {
        classification,
        confidence: round_to(confidence, 2),
        fact_indicators: fact_count,
        opinion_indicators: opinion_count,
    }
}

/// Classify a whole text sentence by sentence.
#[instrument(level = "debug", skip_all, fields(len = text.len()))]
pub fn classify_text(text: &str) -> Result<FactOpinionReport> {
    if text.trim().is_empty() {
        return Err(Error::EmptyText);
    }
    let sentences = tokenize_sentences(text);
    if sentences.is_empty() {
        return Err(Error::NoSentences);
    }

    let mut breakdown = Vec::with_capacity(sentences.len());
    let (mut facts, mut opinions, mut neutral) = (0usize, 0usize, 0usize);

    for sentence in sentences {
        let verdict = classify_sentence(&sentence);
        match verdict.classification {
            SentenceClass::Fact => facts += 1,
            SentenceClass::Opinion => opinions += 1,
            _ => neutral += 1,
        }
        breakdown.push(SentenceBreakdown {
            sentence,
            classification: verdict.classification,
            confidence: verdict.confidence,
        });
    }

    let total = breakdown.len();
    let overall = if facts > opinions {
        OverallClass::MostlyFactual
    } else if opinions > facts {
        OverallClass::MostlyOpinion
    } else {
        OverallClass::Mixed
    };
    let pct = |n: usize| round_to(n as f64 / total as f64 * 100.0, 1);

    debug!(total, facts, opinions, neutral, "Classified sentences");
    Ok(FactOpinionReport {
        overall_classification: overall,
        statistics: FactOpinionStats {
            total_sentences: total,
            fact_sentences: facts,
            opinion_sentences: opinions,
            neutral_sentences: neutral,
            fact_percentage: pct(facts),
            opinion_percentage: pct(opinions),
        },
        sentence_breakdown: breakdown,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patterns_compile() {
        assert_eq!(FACTUAL_PATTERNS.len(), 5);
        assert_eq!(OPINION_PATTERNS.len(), 3);
    }

    #[test]
    fn test_fact_indicators_win() {
        let v = classify_sentence("According to official data, the total was recorded yesterday.");
        assert_eq!(v.classification, SentenceClass::Fact);
        assert_eq!(v.fact_indicators, 4);
        assert_eq!(v.confidence, 0.9);
    }

    #[test]
    fn test_opinion_indicators_win() {
        let v = classify_sentence("I think this is the worst plan.");
        assert_eq!(v.classification, SentenceClass::Opinion);
        assert_eq!(v.opinion_indicators, 2);
        assert_eq!(v.confidence, 0.7);
    }

    #[test]
    fn test_tie_broken_by_factual_pattern() {
        let v = classify_sentence("Unemployment fell to 4% in March 2024.");
        assert_eq!(v.classification, SentenceClass::Fact);
        assert_eq!(v.confidence, 0.6);
    }

    #[test]
    fn test_tie_broken_by_opinion_pattern() {
        let v = classify_sentence("The team looked extremely sharp.");
        assert_eq!(v.classification, SentenceClass::Opinion);
        assert_eq!(v.confidence, 0.6);
    }

    #[test]
    fn test_neutral_and_unknown() {
        assert_eq!(
            classify_sentence("The sky is blue.").classification,
            SentenceClass::Neutral
        );
        let v = classify_sentence("   ");
        assert_eq!(v.classification, SentenceClass::Unknown);
        assert_eq!(v.confidence, 0.0);
    }

    #[test]
    fn test_classify_text_half_and_half() {
        let report = classify_text(
            "The ministry reported 300 new cases. I believe the response is terrible.",
        )
        .unwrap();
        assert_eq!(report.statistics.total_sentences, 2);
        assert_eq!(report.statistics.fact_percentage, 50.0);
        assert_eq!(report.statistics.opinion_percentage, 50.0);
        assert_eq!(report.overall_classification, OverallClass::Mixed);
    }

    #[test]
    fn test_classify_text_mostly_factual() {
        let report = classify_text(
            "Officials confirmed the figures. The study found a rise of 12 points. It rained.",
        )
        .unwrap();
        assert_eq!(report.overall_classification, OverallClass::MostlyFactual);
        assert_eq!(report.statistics.neutral_sentences, 1);
        assert_eq!(report.statistics.fact_percentage, 66.7);
    }

    #[test]
    fn test_classify_text_empty() {
        assert!(matches!(classify_text("  "), Err(Error::EmptyText)));
    }

    #[test]
    fn test_labels_serialize_snake_case() {
        let json = serde_json::to_string(&OverallClass::MostlyOpinion).unwrap();
        assert_eq!(json, "\"mostly_opinion\"");
    }
}
