//! Sentence embeddings.
//!
//! [`RemoteEmbedder`] calls an OpenAI-compatible `/embeddings` endpoint.
//! [`HashingEmbedder`] is a local feature-hashing bag of words (unigrams and
//! bigrams, stop words removed) used when no API key is configured; it is
//! deterministic, which also makes it the embedder used in tests.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::text::tokenize_words;
use crate::utils::truncate_for_log;

pub const HASHING_DIMENSIONS: usize = 384;

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have", "he",
    "her", "his", "in", "is", "it", "its", "of", "on", "or", "she", "that", "the", "their",
    "they", "this", "to", "was", "were", "will", "with",
];

/// Anything that turns a batch of texts into one vector per text.
pub trait Embedder {
    fn model_name(&self) -> &str;

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct RemoteEmbedder {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl RemoteEmbedder {
    pub fn new(client: Client, config: &AppConfig, api_key: String) -> Self {
        Self {
            client,
            endpoint: format!("{}/embeddings", config.openai.api_base.trim_end_matches('/')),
            api_key,
            model: config.models.similarity_model.clone(),
        }
    }
}

impl Embedder for RemoteEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    #[instrument(level = "info", skip_all, fields(model = %self.model, count = texts.len()))]
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Embedding(format!(
                "{status}: {}",
                truncate_for_log(&body, 200)
            )));
        }

        let mut parsed: EmbeddingResponse = response.json().await?;
        if parsed.data.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }
        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self {
            dimensions: HASHING_DIMENSIONS,
        }
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

impl HashingEmbedder {
    fn add_feature(&self, vector: &mut [f32], feature: &str, weight: f32) {
        let h = fnv1a(feature.as_bytes());
        let idx = (h % self.dimensions as u64) as usize;
        let sign = if (h >> 63) & 1 == 0 { 1.0 } else { -1.0 };
        vector[idx] += sign * weight;
    }

    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let tokens: Vec<String> = tokenize_words(text)
            .into_iter()
            .filter(|t| !STOP_WORDS.contains(&t.as_str()))
            .collect();

        for token in &tokens {
            self.add_feature(&mut vector, token, 1.0);
        }
        for pair in tokens.windows(2) {
            self.add_feature(&mut vector, &format!("{} {}", pair[0], pair[1]), 0.5);
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

impl Embedder for HashingEmbedder {
    fn model_name(&self) -> &str {
        "local-hashing-bow"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

/// The embedder selected at startup.
#[derive(Debug, Clone)]
pub enum EmbeddingBackend {
    Remote(RemoteEmbedder),
    Hashing(HashingEmbedder),
}

impl EmbeddingBackend {
    /// Remote embeddings when an API key is configured, local otherwise.
    pub fn from_config(client: Client, config: &AppConfig) -> Self {
        match &config.openai_api_key {
            Some(key) => Self::Remote(RemoteEmbedder::new(client, config, key.clone())),
            None => {
                debug!("No API key for embeddings; using local hashing embedder");
                Self::Hashing(HashingEmbedder::default())
            }
        }
    }
}

impl Embedder for EmbeddingBackend {
    fn model_name(&self) -> &str {
        match self {
            Self::Remote(e) => e.model_name(),
            Self::Hashing(e) => e.model_name(),
        }
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        match self {
            Self::Remote(e) => e.embed(texts).await,
            Self::Hashing(e) => e.embed(texts).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, extract::Path, http::HeaderMap, http::StatusCode, routing::post};
    use serde_json::{Value, json};

    /// Fake `/embeddings` endpoint. Each input gets `[position, chars]`; the
    /// path segment picks whether data comes back in order, reversed, or one
    /// item short.
    async fn serve_embeddings() -> String {
        let app = Router::new().route(
            "/{mode}/embeddings",
            post(
                |Path(mode): Path<String>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    let authed = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        == Some("Bearer sk-test");
                    if !authed || body["model"] != "text-embedding-3-small" {
                        return Err(StatusCode::UNAUTHORIZED);
                    }
                    let inputs = body["input"].as_array().cloned().unwrap_or_default();
                    let mut data: Vec<Value> = inputs
                        .iter()
                        .enumerate()
                        .map(|(i, text)| {
                            let chars = text.as_str().map_or(0, |t| t.chars().count());
                            json!({ "index": i, "embedding": [i as f32, chars as f32] })
                        })
                        .collect();
                    match mode.as_str() {
                        "reversed" => data.reverse(),
                        "short" => {
                            data.pop();
                        }
                        _ => {}
                    }
                    Ok(Json(json!({ "object": "list", "data": data })))
                },
            ),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn remote(base: &str, mode: &str, key: &str) -> RemoteEmbedder {
        let mut config = AppConfig::default();
        config.openai.api_base = format!("{base}/{mode}/");
        RemoteEmbedder::new(Client::new(), &config, key.to_string())
    }

    fn texts() -> Vec<String> {
        vec!["one".to_string(), "three".to_string(), "eleven".to_string()]
    }

    #[tokio::test]
    async fn test_remote_embeddings_in_order() {
        let base = serve_embeddings().await;
        let out = remote(&base, "ordered", "sk-test").embed(&texts()).await.unwrap();
        assert_eq!(out, vec![vec![0.0, 3.0], vec![1.0, 5.0], vec![2.0, 6.0]]);
    }

    #[tokio::test]
    async fn test_remote_embeddings_sorted_by_index() {
        let base = serve_embeddings().await;
        let out = remote(&base, "reversed", "sk-test").embed(&texts()).await.unwrap();
        assert_eq!(out, vec![vec![0.0, 3.0], vec![1.0, 5.0], vec![2.0, 6.0]]);
    }

    #[tokio::test]
    async fn test_remote_embeddings_count_mismatch() {
        let base = serve_embeddings().await;
        let err = remote(&base, "short", "sk-test").embed(&texts()).await.unwrap_err();
        assert!(matches!(err, Error::Embedding(ref m) if m == "expected 3 embeddings, got 2"));
    }

    #[tokio::test]
    async fn test_remote_embeddings_http_error() {
        let base = serve_embeddings().await;
        let err = remote(&base, "ordered", "wrong-key").embed(&texts()).await.unwrap_err();
        assert!(matches!(err, Error::Embedding(ref m) if m.starts_with("401")));
        assert!(remote(&base, "ordered", "wrong-key").embed(&[]).await.unwrap().is_empty());
    }

    #[test]
    fn test_hashing_is_normalized_and_deterministic() {
        let e = HashingEmbedder::default();
        let a = e.embed_one("Central bank raises interest rates");
        let b = e.embed_one("Central bank raises interest rates");
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_stop_words_only_gives_zero_vector() {
        let e = HashingEmbedder::default();
        assert!(e.embed_one("the and of").iter().all(|v| *v == 0.0));
    }

    #[tokio::test]
    async fn test_backend_without_key_is_local() {
        let backend = EmbeddingBackend::from_config(Client::new(), &AppConfig::default());
        assert_eq!(backend.model_name(), "local-hashing-bow");
        let out = backend
            .embed(&["one text".to_string(), "two text".to_string()])
            .await
            .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].len(), HASHING_DIMENSIONS);
    }
}
