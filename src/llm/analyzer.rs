use futures::future::join_all;
use reqwest::Client;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::llm::LlmReport;
use crate::llm::api::{ChatClient, ChatRequest, ask_with_backoff};
use crate::llm::parse::parse_llm_response;
use crate::llm::prompts::{PromptKind, PromptLibrary, render};
use crate::models::SourceComparison;
use crate::utils::take_chars;

/// Characters of each text sent to the model.
const PROMPT_TEXT_CHARS: usize = 1500;
const STRICT_MAX_TOKENS: u32 = 300;
const STRICT_TEMPERATURE: f32 = 0.1;
const STRICT_TOP_P: f32 = 0.9;
const INSIGHT_MAX_TOKENS: u32 = 250;

/// Bias, fact/opinion, comparison and insight calls against the chat API.
///
/// Without an API key every call fails with [`Error::LlmUnavailable`].
#[derive(Debug, Clone)]
pub struct LlmAnalyzer {
    client: Option<ChatClient>,
    prompts: PromptLibrary,
    max_tokens: u32,
    temperature: f32,
    max_retries: usize,
}

impl LlmAnalyzer {
    pub fn from_config(http: Client, config: &AppConfig) -> Self {
        let client = config.openai_api_key.as_ref().map(|key| {
            info!(model = %config.openai.model, "LLM client initialized");
            ChatClient::new(
                http,
                &config.openai.api_base,
                key.clone(),
                config.openai.model.clone(),
            )
        });
        Self {
            client,
            prompts: PromptLibrary::new(&config.prompts.dir),
            max_tokens: config.openai.max_tokens,
            temperature: config.openai.temperature,
            max_retries: config.openai.max_retries,
        }
    }

    pub fn is_available(&self) -> bool {
        self.client.is_some()
    }

    async fn complete(
        &self,
        kind: PromptKind,
        user: String,
        max_tokens: u32,
        temperature: f32,
        top_p: Option<f32>,
    ) -> Result<String> {
        let client = self.client.as_ref().ok_or(Error::LlmUnavailable)?;
        let request = ChatRequest {
            system: kind.system_prompt().to_string(),
            user,
            max_tokens,
            temperature,
            top_p,
        };
        ask_with_backoff(client, &request, self.max_retries).await
    }

    async fn strict_json(&self, kind: PromptKind, text: &str) -> Result<Value> {
        if self.client.is_none() {
            return Err(Error::LlmUnavailable);
        }
        let template = self.prompts.load(kind).await;
        let prompt = render(&template, &[("text", take_chars(text, PROMPT_TEXT_CHARS))]);
        let content = self
            .complete(kind, prompt, STRICT_MAX_TOKENS, STRICT_TEMPERATURE, Some(STRICT_TOP_P))
            .await?;
        parse_llm_response(&content)
    }

    #[instrument(level = "info", skip_all)]
    pub async fn analyze_bias_with_llm(&self, text: &str) -> Result<Value> {
        self.strict_json(PromptKind::BiasDetection, text).await
    }

    #[instrument(level = "info", skip_all)]
    pub async fn classify_fact_opinion_with_llm(&self, text: &str) -> Result<Value> {
        self.strict_json(PromptKind::FactOpinion, text).await
    }

    #[instrument(level = "info", skip_all)]
    pub async fn compare_sources_with_llm(&self, source1: &str, source2: &str) -> Result<Value> {
        if self.client.is_none() {
            return Err(Error::LlmUnavailable);
        }
        let template = self.prompts.load(PromptKind::SourceComparison).await;
        let prompt = render(&template, &[
            ("source1", take_chars(source1, PROMPT_TEXT_CHARS)),
            ("source2", take_chars(source2, PROMPT_TEXT_CHARS)),
        ]);
        let content = self
            .complete(PromptKind::SourceComparison, prompt, self.max_tokens, self.temperature, None)
            .await?;
        parse_llm_response(&content)
    }

    /// Free-text editorial insight on the article.
    #[instrument(level = "info", skip_all)]
    pub async fn generate_insight(&self, text: &str) -> Result<String> {
        if self.client.is_none() {
            return Err(Error::LlmUnavailable);
        }
        let template = self.prompts.load(PromptKind::Insight).await;
        let prompt = render(&template, &[("text", take_chars(text, PROMPT_TEXT_CHARS))]);
        let content = self
            .complete(PromptKind::Insight, prompt, INSIGHT_MAX_TOKENS, self.temperature, None)
            .await?;
        let insight = content.trim();
        if insight.is_empty() {
            return Err(Error::EmptyLlmResponse);
        }
        Ok(insight.to_string())
    }

    /// Comparisons of `text` against each of `others`, in order.
    pub async fn compare_against(&self, text: &str, others: &[String]) -> Vec<SourceComparison> {
        join_all(others.iter().enumerate().map(|(i, other)| async move {
            let comparison = self.compare_sources_with_llm(text, other).await;
            if let Err(e) = &comparison {
                warn!(source_index = i, error = %e, "Source comparison failed");
            }
            SourceComparison {
                source_index: i,
                comparison: comparison.into(),
            }
        }))
        .await
    }

    /// Bias, fact/opinion and insight concurrently, then one comparison per
    /// additional source.
    #[instrument(level = "info", skip_all, fields(additional = additional_sources.len()))]
    pub async fn comprehensive_llm_analysis(
        &self,
        text: &str,
        additional_sources: &[String],
    ) -> Result<LlmReport> {
        if self.client.is_none() {
            return Err(Error::LlmUnavailable);
        }
        let (bias, fact_opinion, insight, comparisons) = tokio::join!(
            self.analyze_bias_with_llm(text),
            self.classify_fact_opinion_with_llm(text),
            self.generate_insight(text),
            self.compare_against(text, additional_sources),
        );
        Ok(LlmReport {
            bias_analysis: bias.into(),
            fact_opinion_analysis: fact_opinion.into(),
            insight: insight.into(),
            source_comparisons: comparisons,
        })
    }
}
