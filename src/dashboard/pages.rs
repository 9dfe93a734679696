//! HTML page handlers.

use axum::{
    Form,
    extract::State,
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;

use crate::dashboard::api::{DEFAULT_LIMIT, numbered_sources, source_from_fields};
use crate::dashboard::{AppState, render, status_for};
use crate::error::Error;
use crate::models::ArticleSource;

#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeForm {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompareForm {
    #[serde(default)]
    pub source1: String,
    #[serde(default)]
    pub source2: String,
    #[serde(default)]
    pub source3: String,
    #[serde(default)]
    pub source4: String,
    #[serde(default)]
    pub source5: String,
}

impl CompareForm {
    fn values(&self) -> Vec<String> {
        [
            &self.source1,
            &self.source2,
            &self.source3,
            &self.source4,
            &self.source5,
        ]
        .into_iter()
        .cloned()
        .collect()
    }

    /// Filled-in fields with their 0-based field position, each detected as
    /// URL or text.
    pub fn sources(&self) -> Vec<(usize, ArticleSource)> {
        numbered_sources(&self.values())
    }
}

fn page_error(e: &Error, html: String) -> Response {
    (status_for(e), Html(html)).into_response()
}

/// GET /
pub async fn index() -> Html<String> {
    Html(render::index_page(None, "", ""))
}

/// POST /analyze
pub async fn analyze(State(state): State<AppState>, Form(form): Form<AnalyzeForm>) -> Response {
    let result = match source_from_fields(Some(&form.url), Some(&form.text)) {
        Ok(source) => state.pipeline.analyze(&source).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(outcome) => Html(render::results_page(&outcome)).into_response(),
        Err(e) => page_error(&e, render::index_page(Some(&e), &form.url, &form.text)),
    }
}

/// GET /compare
pub async fn compare_form() -> Html<String> {
    Html(render::compare_form_page(None, &[]))
}

/// POST /compare
pub async fn compare(State(state): State<AppState>, Form(form): Form<CompareForm>) -> Response {
    match state.pipeline.compare_numbered(&form.sources()).await {
        Ok(report) => Html(render::compare_results_page(&report)).into_response(),
        Err(e) => page_error(&e, render::compare_form_page(Some(&e), &form.values())),
    }
}

/// GET /history
pub async fn history(State(state): State<AppState>) -> Response {
    let store = state.pipeline.store();
    let (records, trends) = tokio::join!(
        store.recent_analyses(DEFAULT_LIMIT),
        store.trends(DEFAULT_LIMIT)
    );
    match records.and_then(|r| trends.map(|t| (r, t))) {
        Ok((records, trends)) => Html(render::history_page(&records, &trends)).into_response(),
        Err(e) => {
            let body = render::error_box(&e.to_string(), None);
            page_error(&e, body)
        }
    }
}
