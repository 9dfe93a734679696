//! Web dashboard and JSON API.
//!
//! - [`pages`]: server-rendered HTML (analyze, compare, history)
//! - [`api`]: the same operations as JSON, plus `/status`
//! - [`render`]: HTML builders used by [`pages`]

pub mod api;
pub mod pages;
pub mod render;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::error::{Error, Result};
use crate::pipeline::Pipeline;

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

/// HTTP status for an error surfaced by a handler.
pub fn status_for(e: &Error) -> StatusCode {
    match e {
        _ if e.is_user_error() => StatusCode::BAD_REQUEST,
        Error::Extraction(_) | Error::Http(_) | Error::LlmStatus { .. } => StatusCode::BAD_GATEWAY,
        Error::LlmUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        let body = json!({
            "error": self.to_string(),
            "suggestion": self.suggestion(),
        });
        (status, Json(body)).into_response()
    }
}

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Pages
        .route("/", get(pages::index))
        .route("/analyze", get(pages::index).post(pages::analyze))
        .route("/compare", get(pages::compare_form).post(pages::compare))
        .route("/history", get(pages::history))
        // JSON API
        .route("/status", get(api::status))
        .route("/api/analyze", post(api::analyze))
        .route("/api/compare", post(api::compare))
        .route("/api/similarity", post(api::similarity))
        .route("/api/analyses", get(api::recent))
        .route("/api/analyses/by-url", get(api::by_url))
        .route("/api/trends", get(api::trends))
        .with_state(state)
}

/// Serve the dashboard until the process is stopped.
pub async fn serve(pipeline: Pipeline, addr: SocketAddr) -> Result<()> {
    let app = create_router(AppState::new(pipeline)).layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Dashboard listening on http://{addr}");
    axum::serve(listener, app).await?;
    info!("Server shutdown");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::{SAMPLE, offline_pipeline};
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use tower::ServiceExt;

    fn app() -> Router {
        create_router(AppState::new(offline_pipeline()))
    }

    async fn body_string(resp: Response) -> String {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn form(uri: &str, body: String) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    fn json_req(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&Error::EmptyText), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&Error::Extraction("x".into())), StatusCode::BAD_GATEWAY);
        assert_eq!(status_for(&Error::LlmUnavailable), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            status_for(&Error::LlmStatus {
                status: 401,
                body: String::new()
            }),
            StatusCode::BAD_GATEWAY
        );
    }

    #[tokio::test]
    async fn test_index_page() {
        let resp = app()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_string(resp).await.contains("action=\"/analyze\""));
    }

    #[tokio::test]
    async fn test_analyze_page_renders_four_tabs() {
        let body = format!("url=&text={}", urlencoding::encode(SAMPLE));
        let resp = app().oneshot(form("/analyze", body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_string(resp).await;
        for tab in ["Overview", "Fact vs Opinion", "Bias Analysis", "AI Analysis"] {
            assert!(html.contains(tab), "missing tab {tab}");
        }
        assert!(html.contains("OpenAI client not available"));
    }

    #[tokio::test]
    async fn test_analyze_page_rejects_empty_form() {
        let resp = app().oneshot(form("/analyze", "url=&text=".into())).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(resp).await.contains("class=\"error\""));
    }

    #[tokio::test]
    async fn test_api_analyze_then_list_and_lookup() {
        let app = app();
        let resp = app
            .clone()
            .oneshot(json_req("/api/analyze", json!({ "text": SAMPLE })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let outcome: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert!(outcome["record_id"].is_i64());

        let resp = app
            .clone()
            .oneshot(Request::get("/api/analyses?limit=5").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let list: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(list.as_array().unwrap().len(), 1);

        let resp = app
            .clone()
            .oneshot(
                Request::get("/api/analyses/by-url?url=direct_input")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app
            .oneshot(
                Request::get("/api/analyses/by-url?url=https%3A%2F%2Fmissing.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_api_social_url_is_bad_request() {
        let resp = app()
            .oneshot(json_req("/api/analyze", json!({ "url": "https://www.facebook.com/post/1" })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert!(body["suggestion"].as_str().unwrap().contains("Direct Text"));
    }

    #[tokio::test]
    async fn test_api_compare_needs_two_sources() {
        let resp = app()
            .oneshot(json_req("/api/compare", json!({ "sources": [SAMPLE] })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_api_similarity() {
        let app = app();
        let resp = app
            .clone()
            .oneshot(json_req(
                "/api/similarity",
                json!({ "text1": "Storm floods the coastal town", "text2": "Storm floods the coastal town" }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(body["similarity"], 1.0);
        assert_eq!(body["model"], "local-hashing-bow");

        let resp = app
            .oneshot(json_req("/api/similarity", json!({ "text1": " ", "text2": "anything" })))
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(body["similarity"], 0.0);
    }

    #[tokio::test]
    async fn test_compare_page() {
        let body = format!(
            "source1={}&source2={}&source3=",
            urlencoding::encode(SAMPLE),
            urlencoding::encode("Officials said the council approved the budget on March 3.")
        );
        let resp = app().oneshot(form("/compare", body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_string(resp).await;
        assert!(html.contains("Content Similarity Analysis"));
        assert!(html.contains("Source 2"));
    }

    #[tokio::test]
    async fn test_compare_page_numbers_sources_by_field() {
        let body = format!(
            "source1={}&source2=&source3={}",
            urlencoding::encode(SAMPLE),
            urlencoding::encode("Officials said the council approved the budget on March 3.")
        );
        let resp = app().oneshot(form("/compare", body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_string(resp).await;
        assert!(html.contains("<td>Source 3</td>"));
        assert!(!html.contains("<td>Source 2</td>"));
    }

    #[tokio::test]
    async fn test_status_and_history() {
        let app = app();
        let resp = app
            .clone()
            .oneshot(Request::get("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let status: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(status["status"], "healthy");
        assert_eq!(status["llm_available"], false);

        let resp = app
            .clone()
            .oneshot(json_req("/api/analyze", json!({ "text": SAMPLE })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app
            .oneshot(Request::get("/history").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_string(resp).await.contains("Analysis Trends"));
    }
}
