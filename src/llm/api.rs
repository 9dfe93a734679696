//! Chat-completion API interaction with exponential backoff retry logic.
//!
//! This module provides the interface for communicating with an
//! OpenAI-compatible chat-completion API. Every call goes through
//! [`RetryAsk`], which retries transient failures (429, 5xx, transport
//! errors) with exponential backoff and jitter.
//!
//! # Architecture
//!
//! - [`AskAsync`]: Core trait defining async LLM interaction
//! - [`ChatClient`]: Posts a [`ChatRequest`] to `{api_base}/chat/completions`
//! - [`RetryAsk`]: Decorator that adds retry logic to any `AskAsync` implementation
//!
//! # Retry Strategy
//!
//! - Attempt count taken from `openai.max_retries` (3 by default)
//! - Only errors for which [`Error::is_retryable`] holds are retried
//! - Exponential backoff starting at 1 second
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd

use rand::{Rng, rng};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{Error, Result};
use crate::utils::truncate_for_log;

/// One system + user exchange and its sampling parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: Option<f32>,
}

/// Trait for async LLM interaction.
///
/// Implementors send a [`ChatRequest`] to an LLM and return its response.
/// This abstraction allows for different LLM backends or decorators (like retry logic).
pub trait AskAsync {
    /// The type of response returned by the LLM.
    type Response;

    /// Send the request to the LLM and receive a response.
    async fn ask(&self, request: &ChatRequest) -> Result<Self::Response>;
}

/// Wrapper that adds exponential backoff retry logic to any [`AskAsync`] implementation.
///
/// # Backoff Strategy
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryAsk<T> {
    /// The underlying LLM client to wrap.
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }

    fn backoff(&self, attempt: usize) -> StdDuration {
        let shift = (attempt.saturating_sub(1)).min(16) as u32;
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=250);
        delay + StdDuration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync + fmt::Debug,
{
    type Response = T::Response;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, request: &ChatRequest) -> Result<Self::Response> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.ask(request).await {
                Ok(resp) => {
                    return Ok(resp);
                }
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if !e.is_retryable() {
                        error!(
                            attempt,
                            elapsed_ms_total = total_dt.as_millis(),
                            error = %e,
                            "ask() failed with a non-retryable error"
                        );
                        return Err(e);
                    }

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis(),
                            elapsed_ms_total = total_dt.as_millis(),
                            error = %e,
                            "ask() exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis(),
                        elapsed_ms_total = total_dt.as_millis(),
                        ?delay,
                        error = %e,
                        "ask() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Client for `{api_base}/chat/completions`.
#[derive(Clone)]
pub struct ChatClient {
    http: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl ChatClient {
    pub fn new(http: Client, api_base: &str, api_key: String, model: String) -> Self {
        Self {
            http,
            endpoint: format!("{}/chat/completions", api_base.trim_end_matches('/')),
            api_key,
            model,
        }
    }
}

impl fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl AskAsync for ChatClient {
    type Response = String;

    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn ask(&self, request: &ChatRequest) -> Result<Self::Response> {
        let t0 = Instant::now();
        let body = CompletionRequest {
            model: &self.model,
            messages: [
                Message {
                    role: "system",
                    content: &request.system,
                },
                Message {
                    role: "user",
                    content: &request.user,
                },
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            top_p: request.top_p,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(
                elapsed_ms = t0.elapsed().as_millis(),
                %status,
                "API call failed"
            );
            return Err(Error::LlmStatus {
                status: status.as_u16(),
                body: truncate_for_log(&text, 200),
            });
        }

        let parsed: CompletionResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        debug!(
            elapsed_ms = t0.elapsed().as_millis(),
            response = %truncate_for_log(&content, 100),
            "LLM response"
        );
        Ok(content)
    }
}

/// Send one request through [`RetryAsk`].
///
/// # Retry Behavior
///
/// - Up to `max_retries` retry attempts
/// - Exponential backoff: 1s, 2s, 4s, ... (capped at 30s)
/// - Random jitter added to prevent thundering herd
#[instrument(level = "info", skip_all)]
pub async fn ask_with_backoff(
    client: &ChatClient,
    request: &ChatRequest,
    max_retries: usize,
) -> Result<String> {
    let t0 = Instant::now();
    let api = RetryAsk::new(client.clone(), max_retries, StdDuration::from_secs(1));
    let res = api.ask(request).await;
    let dt = t0.elapsed();

    match &res {
        Ok(_) => info!(elapsed_ms_total = dt.as_millis(), "ask_with_backoff succeeded"),
        Err(e) => {
            error!(elapsed_ms_total = dt.as_millis(), error = %e, "ask_with_backoff failed")
        }
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Flaky {
        failures: usize,
        status: u16,
        calls: AtomicUsize,
    }

    impl Flaky {
        fn new(failures: usize, status: u16) -> Self {
            Self {
                failures,
                status,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl AskAsync for Flaky {
        type Response = String;

        async fn ask(&self, request: &ChatRequest) -> Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(Error::LlmStatus {
                    status: self.status,
                    body: "transient".into(),
                })
            } else {
                Ok(request.user.to_uppercase())
            }
        }
    }

    fn request() -> ChatRequest {
        ChatRequest {
            system: "sys".into(),
            user: "hello".into(),
            max_tokens: 10,
            temperature: 0.1,
            top_p: None,
        }
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_failures() {
        let retry = RetryAsk::new(Flaky::new(2, 503), 3, StdDuration::from_millis(1));
        assert_eq!(retry.ask(&request()).await.unwrap(), "HELLO");
        assert_eq!(retry.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_on_rate_limit() {
        let retry = RetryAsk::new(Flaky::new(1, 429), 3, StdDuration::from_millis(1));
        assert_eq!(retry.ask(&request()).await.unwrap(), "HELLO");
        assert_eq!(retry.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_no_retry_on_client_errors() {
        for status in [400, 401, 403] {
            let retry = RetryAsk::new(Flaky::new(usize::MAX, status), 3, StdDuration::from_millis(1));
            let err = retry.ask(&request()).await.unwrap_err();
            assert!(matches!(err, Error::LlmStatus { status: s, .. } if s == status));
            assert_eq!(retry.inner.calls.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max() {
        let retry = RetryAsk::new(Flaky::new(usize::MAX, 500), 1, StdDuration::from_millis(1));
        assert!(retry.ask(&request()).await.is_err());
        // first try plus one retry
        assert_eq!(retry.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_backoff_is_capped() {
        let retry = RetryAsk::new(Flaky::new(0, 500), 3, StdDuration::from_secs(1));
        let first = retry.backoff(1);
        assert!(first >= StdDuration::from_secs(1) && first <= StdDuration::from_millis(1250));
        let late = retry.backoff(10);
        assert!(late <= StdDuration::from_millis(30_250));
    }

    #[test]
    fn test_debug_hides_api_key() {
        let client = ChatClient::new(
            Client::new(),
            "https://api.example.com/v1/",
            "sk-secret".into(),
            "gpt".into(),
        );
        let shown = format!("{client:?}");
        assert!(!shown.contains("sk-secret"));
        assert!(shown.contains("https://api.example.com/v1/chat/completions"));
    }
}
