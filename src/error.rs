//! Error taxonomy shared by every stage of the analysis pipeline.
//!
//! Extraction problems the user can fix (bad URL, social-media link, empty
//! input) get their own variants so the dashboard can show a targeted
//! message. Transport and storage errors wrap the underlying library error.

use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid URL")]
    InvalidUrl,

    #[error(
        "Social media URLs ({domain}) are not supported for automatic extraction. Please copy and paste the text content directly."
    )]
    SocialMediaUrl { domain: String },

    #[error("Empty text provided")]
    EmptyText,

    #[error("Insufficient content found for meaningful analysis")]
    InsufficientContent,

    #[error("Text too short for meaningful analysis")]
    TextTooShort,

    #[error("No sentences found")]
    NoSentences,

    #[error("Failed to extract content: {0}")]
    Extraction(String),

    #[error("Could not extract content from enough sources")]
    NotEnoughSources,

    #[error("Please provide between {min} and {max} sources to compare")]
    SourceCount { min: usize, max: usize },

    #[error("At least 2 articles required")]
    TooFewArticles,

    #[error("OpenAI client not available")]
    LlmUnavailable,

    #[error("LLM analysis failed: {0}")]
    Llm(String),

    #[error("LLM analysis failed: {status}: {body}")]
    LlmStatus { status: u16, body: String },

    #[error("Empty response from LLM")]
    EmptyLlmResponse,

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Sentiment model failed: {0}")]
    Inference(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    /// Follow-up hint shown next to the error on the dashboard, if any.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::SocialMediaUrl { .. } => {
                Some("Copy the tweet/post text and use the 'Direct Text' input option instead.")
            }
            Error::LlmUnavailable => Some("Set OPENAI_API_KEY to enable AI analysis."),
            _ => None,
        }
    }

    /// Whether the caller supplied bad input, as opposed to a backend failing.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidUrl
                | Error::SocialMediaUrl { .. }
                | Error::EmptyText
                | Error::InsufficientContent
                | Error::TextTooShort
                | Error::NoSentences
                | Error::NotEnoughSources
                | Error::SourceCount { .. }
                | Error::TooFewArticles
        )
    }

    /// Whether repeating the same request could succeed: rate limits, server
    /// errors and transport failures. Other 4xx answers and bad payloads are
    /// final.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::LlmStatus { status, .. } => *status == 429 || (500..600).contains(status),
            Error::Http(e) => !e.is_decode() && !e.is_builder() && !e.is_status(),
            _ => false,
        }
    }
}
