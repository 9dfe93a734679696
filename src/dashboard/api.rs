//! JSON endpoints.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::dashboard::AppState;
use crate::error::{Error, Result};
use crate::models::{AnalysisOutcome, AnalysisRecord, ArticleSource, ComparisonReport};
use crate::store::Trends;

pub const DEFAULT_LIMIT: usize = 20;
pub const MAX_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// A non-blank URL wins over text; neither is an empty-text error.
pub fn source_from_fields(url: Option<&str>, text: Option<&str>) -> Result<ArticleSource> {
    match (url.map(str::trim), text) {
        (Some(url), _) if !url.is_empty() => Ok(ArticleSource::Url(url.to_string())),
        (_, Some(text)) if !text.trim().is_empty() => Ok(ArticleSource::Text(text.to_string())),
        _ => Err(Error::EmptyText),
    }
}

/// Non-blank entries with their position in `values`.
pub fn numbered_sources(values: &[String]) -> Vec<(usize, ArticleSource)> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.trim().is_empty())
        .map(|(i, v)| (i, ArticleSource::detect(v)))
        .collect()
}

#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    /// URLs or pasted texts, detected per entry.
    pub sources: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

impl LimitQuery {
    pub fn resolved(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

#[derive(Debug, Deserialize)]
pub struct UrlQuery {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct SimilarityRequest {
    pub text1: String,
    pub text2: String,
}

#[derive(Debug, Serialize)]
pub struct SimilarityResponse {
    pub similarity: f64,
    pub model: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub version: String,
    pub llm_available: bool,
    pub embedding_model: String,
    pub stored_analyses: usize,
}

/// POST /api/analyze
pub async fn analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisOutcome>> {
    let source = source_from_fields(req.url.as_deref(), req.text.as_deref())?;
    Ok(Json(state.pipeline.analyze(&source).await?))
}

/// POST /api/compare
pub async fn compare(
    State(state): State<AppState>,
    Json(req): Json<CompareRequest>,
) -> Result<Json<ComparisonReport>> {
    let sources = numbered_sources(&req.sources);
    Ok(Json(state.pipeline.compare_numbered(&sources).await?))
}

/// POST /api/similarity
pub async fn similarity(
    State(state): State<AppState>,
    Json(req): Json<SimilarityRequest>,
) -> Result<Json<SimilarityResponse>> {
    let pipeline = &state.pipeline;
    Ok(Json(SimilarityResponse {
        similarity: pipeline.text_similarity(&req.text1, &req.text2).await?,
        model: pipeline.embedding_model().to_string(),
    }))
}

/// GET /api/analyses?limit=
pub async fn recent(
    State(state): State<AppState>,
    Query(q): Query<LimitQuery>,
) -> Result<Json<Vec<AnalysisRecord>>> {
    Ok(Json(state.pipeline.store().recent_analyses(q.resolved()).await?))
}

/// GET /api/analyses/by-url?url=
pub async fn by_url(State(state): State<AppState>, Query(q): Query<UrlQuery>) -> Result<Response> {
    Ok(match state.pipeline.store().find_by_url(&q.url).await? {
        Some(record) => Json(record).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "No analysis found for this URL" })),
        )
            .into_response(),
    })
}

/// GET /api/trends?limit=
pub async fn trends(
    State(state): State<AppState>,
    Query(q): Query<LimitQuery>,
) -> Result<Json<Trends>> {
    Ok(Json(state.pipeline.store().trends(q.resolved()).await?))
}

/// GET /status - Health check endpoint
pub async fn status(State(state): State<AppState>) -> Result<Json<StatusResponse>> {
    let pipeline = &state.pipeline;
    Ok(Json(StatusResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        llm_available: pipeline.llm_available(),
        embedding_model: pipeline.embedding_model().to_string(),
        stored_analyses: pipeline.store().count().await?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_from_fields() {
        assert_eq!(
            source_from_fields(Some(" https://a.example "), Some("text")).unwrap(),
            ArticleSource::Url("https://a.example".into())
        );
        assert_eq!(
            source_from_fields(Some("  "), Some("pasted")).unwrap(),
            ArticleSource::Text("pasted".into())
        );
        assert!(matches!(source_from_fields(None, Some(" ")), Err(Error::EmptyText)));
    }

    #[test]
    fn test_limit_clamped() {
        assert_eq!(LimitQuery { limit: None }.resolved(), DEFAULT_LIMIT);
        assert_eq!(LimitQuery { limit: Some(0) }.resolved(), 1);
        assert_eq!(LimitQuery { limit: Some(10_000) }.resolved(), MAX_LIMIT);
    }
}
