//! Sentiment analysis against a hosted text-classification model.
//!
//! The model only sees the first [`MAX_MODEL_CHARS`] characters of the
//! article (roughly the token budget of RoBERTa-sized classifiers). Any
//! failure on the remote side degrades to a word-list classifier instead of
//! failing the stage.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::utils::{round_to, take_chars, truncate_for_log};

pub const MAX_MODEL_CHARS: usize = 400;
const MIN_MODEL_CHARS: usize = 10;

const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "excellent", "amazing", "wonderful", "positive", "success", "growth",
    "improve",
];
const NEGATIVE_WORDS: &[&str] = &[
    "bad", "terrible", "awful", "horrible", "negative", "failure", "decline", "crisis", "problem",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentMethod {
    Model,
    FallbackRuleBased,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentReport {
    pub primary_sentiment: String,
    pub confidence: f64,
    pub all_scores: BTreeMap<String, f64>,
    pub method: SentimentMethod,
    pub text_length: usize,
    pub analyzed_length: usize,
    pub truncated: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

/// The inference API answers either `[[{label, score}, ...]]` or a flat list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Nested(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
}

/// Client for a hosted text-classification endpoint.
#[derive(Debug, Clone)]
pub struct HostedSentimentModel {
    client: Client,
    endpoint: String,
    token: Option<String>,
}

impl HostedSentimentModel {
    pub fn new(client: Client, config: &AppConfig) -> Self {
        let endpoint = format!(
            "{}/{}",
            config.models.inference_url.trim_end_matches('/'),
            config.models.sentiment_model
        );
        Self {
            client,
            endpoint,
            token: config.hf_api_token.clone(),
        }
    }

    #[instrument(level = "info", skip_all, fields(endpoint = %self.endpoint))]
    async fn classify(&self, text: &str) -> Result<BTreeMap<String, f64>> {
        let mut req = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "inputs": text }));
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let response = req.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Error::Inference(format!(
                "{status}: {}",
                truncate_for_log(&body, 200)
            )));
        }
        parse_scores(&body)
    }
}

/// Normalize an inference API body into `label -> score`.
fn parse_scores(body: &str) -> Result<BTreeMap<String, f64>> {
    let parsed: InferenceResponse = serde_json::from_str(body)?;
    let scores = match parsed {
        InferenceResponse::Nested(mut outer) if !outer.is_empty() => outer.swap_remove(0),
        InferenceResponse::Nested(_) => Vec::new(),
        InferenceResponse::Flat(flat) => flat,
    };
    if scores.is_empty() {
        return Err(Error::Inference("model returned no labels".to_string()));
    }
    Ok(scores
        .into_iter()
        .map(|s| (normalize_label(&s.label), round_to(s.score, 3)))
        .collect())
}

fn normalize_label(label: &str) -> String {
    match label.to_lowercase().as_str() {
        "label_0" => "negative".to_string(),
        "label_1" => "neutral".to_string(),
        "label_2" => "positive".to_string(),
        other => other.to_string(),
    }
}

fn primary_of(scores: &BTreeMap<String, f64>) -> (String, f64) {
    scores
        .iter()
        .fold(None::<(&String, f64)>, |best, (label, score)| match best {
            Some((_, s)) if s >= *score => best,
            _ => Some((label, *score)),
        })
        .map(|(l, s)| (l.clone(), s))
        .unwrap_or_else(|| ("neutral".to_string(), 0.0))
}

/// Sentiment stage: hosted model first, word lists as the fallback.
#[derive(Debug, Clone)]
pub struct SentimentAnalyzer {
    model: Option<HostedSentimentModel>,
}

impl SentimentAnalyzer {
    pub fn new(model: Option<HostedSentimentModel>) -> Self {
        Self { model }
    }

    /// Analyzer that never leaves the process.
    pub fn rule_based() -> Self {
        Self { model: None }
    }

    #[instrument(level = "info", skip_all, fields(len = text.len()))]
    pub async fn analyze(&self, text: &str) -> Result<SentimentReport> {
        if text.trim().is_empty() {
            return Err(Error::EmptyText);
        }
        let analyzed = take_chars(text, MAX_MODEL_CHARS);
        if analyzed.trim().chars().count() < MIN_MODEL_CHARS {
            return Err(Error::TextTooShort);
        }

        let text_length = text.chars().count();
        let analyzed_length = analyzed.chars().count();

        let Some(model) = &self.model else {
            return Ok(fallback_sentiment(text, text_length));
        };

        match model.classify(analyzed).await {
            Ok(all_scores) => {
                let (primary_sentiment, confidence) = primary_of(&all_scores);
                debug!(%primary_sentiment, confidence, "Model sentiment");
                Ok(SentimentReport {
                    primary_sentiment,
                    confidence,
                    all_scores,
                    method: SentimentMethod::Model,
                    text_length,
                    analyzed_length,
                    truncated: text_length > MAX_MODEL_CHARS,
                })
            }
            Err(e) => {
                warn!(error = %e, "Sentiment model failed; using rule-based fallback");
                Ok(fallback_sentiment(text, text_length))
            }
        }
    }
}

/// Word-list sentiment over the full text.
pub fn fallback_sentiment(text: &str, text_length: usize) -> SentimentReport {
    let lower = text.to_lowercase();
    let positive = POSITIVE_WORDS.iter().filter(|w| lower.contains(*w)).count();
    let negative = NEGATIVE_WORDS.iter().filter(|w| lower.contains(*w)).count();

    let (primary, confidence, pos, neu, neg) = if positive > negative {
        ("positive", 0.6, 0.6, 0.3, 0.1)
    } else if negative > positive {
        ("negative", 0.6, 0.1, 0.3, 0.6)
    } else {
        ("neutral", 0.5, 0.25, 0.5, 0.25)
    };

    let all_scores = BTreeMap::from([
        ("positive".to_string(), pos),
        ("neutral".to_string(), neu),
        ("negative".to_string(), neg),
    ]);

    SentimentReport {
        primary_sentiment: primary.to_string(),
        confidence,
        all_scores,
        method: SentimentMethod::FallbackRuleBased,
        text_length,
        analyzed_length: text_length,
        truncated: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::HeaderMap, http::StatusCode, routing::post};

    /// Fake inference API: `/ok` answers with scores (and echoes whether a
    /// bearer token arrived), `/down` fails.
    async fn serve_inference() -> String {
        let app = Router::new()
            .route(
                "/ok",
                post(|headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
                    assert!(body["inputs"].is_string());
                    let authed = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .is_some_and(|v| v == "Bearer hf-test");
                    let positive = if authed { 0.9 } else { 0.2 };
                    Json(serde_json::json!([[
                        { "label": "positive", "score": positive },
                        { "label": "neutral", "score": 0.05 },
                        { "label": "negative", "score": 0.05 }
                    ]]))
                }),
            )
            .route(
                "/down",
                post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model crashed") }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn hosted(base: &str, model: &str) -> SentimentAnalyzer {
        let mut config = AppConfig::default();
        config.models.inference_url = format!("{base}/");
        config.models.sentiment_model = model.to_string();
        config.hf_api_token = Some("hf-test".to_string());
        SentimentAnalyzer::new(Some(HostedSentimentModel::new(Client::new(), &config)))
    }

    #[tokio::test]
    async fn test_hosted_model_scores() {
        let base = serve_inference().await;
        let r = hosted(&base, "ok")
            .analyze("Officials warned of a deepening crisis in the region.")
            .await
            .unwrap();
        assert_eq!(r.method, SentimentMethod::Model);
        assert_eq!(r.primary_sentiment, "positive");
        assert_eq!(r.confidence, 0.9);
        assert!(!r.truncated);
    }

    #[tokio::test]
    async fn test_hosted_model_failure_falls_back() {
        let base = serve_inference().await;
        let text = "Officials warned of a deepening crisis in the region.";
        let r = hosted(&base, "down").analyze(text).await.unwrap();
        assert_eq!(r.method, SentimentMethod::FallbackRuleBased);
        assert_eq!(r.primary_sentiment, "negative");
        assert_eq!(r, fallback_sentiment(text, text.chars().count()));
    }

    #[test]
    fn test_parse_nested_scores() {
        let body = r#"[[{"label":"negative","score":0.05},{"label":"neutral","score":0.15},{"label":"positive","score":0.8}]]"#;
        let scores = parse_scores(body).unwrap();
        assert_eq!(scores["positive"], 0.8);
        assert_eq!(primary_of(&scores), ("positive".to_string(), 0.8));
    }

    #[test]
    fn test_parse_flat_legacy_labels() {
        let body = r#"[{"label":"LABEL_0","score":0.7},{"label":"LABEL_2","score":0.3}]"#;
        let scores = parse_scores(body).unwrap();
        assert_eq!(scores["negative"], 0.7);
        assert_eq!(scores["positive"], 0.3);
    }

    #[test]
    fn test_parse_error_body() {
        assert!(parse_scores(r#"{"error":"Model is loading"}"#).is_err());
        assert!(parse_scores("[]").is_err());
    }

    #[test]
    fn test_fallback_positive() {
        let r = fallback_sentiment("Great success and strong growth this quarter.", 45);
        assert_eq!(r.primary_sentiment, "positive");
        assert_eq!(r.confidence, 0.6);
        assert_eq!(r.method, SentimentMethod::FallbackRuleBased);
    }

    #[test]
    fn test_fallback_negative_and_neutral() {
        assert_eq!(
            fallback_sentiment("A terrible crisis and a failure of leadership.", 10).primary_sentiment,
            "negative"
        );
        let neutral = fallback_sentiment("The committee meets on Tuesday.", 10);
        assert_eq!(neutral.primary_sentiment, "neutral");
        assert_eq!(neutral.all_scores["neutral"], 0.5);
    }

    #[tokio::test]
    async fn test_rule_based_analyzer_rejects_short_text() {
        let analyzer = SentimentAnalyzer::rule_based();
        assert!(matches!(analyzer.analyze("tiny").await, Err(Error::TextTooShort)));
        assert!(matches!(analyzer.analyze("   ").await, Err(Error::EmptyText)));
    }

    #[tokio::test]
    async fn test_rule_based_analyzer_runs_offline() {
        let analyzer = SentimentAnalyzer::rule_based();
        let r = analyzer
            .analyze("Officials warned of a deepening crisis in the region.")
            .await
            .unwrap();
        assert_eq!(r.primary_sentiment, "negative");
    }
}
