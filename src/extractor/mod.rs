//! Article extraction from URLs and pasted text.
//!
//! URLs are validated, social-media links are refused (their pages need a
//! logged-in session), and everything else is fetched and handed to
//! [`article::parse_article`].

pub mod article;

use futures::stream::{self, StreamExt};
use reqwest::Client;
use tracing::{debug, error, info, instrument, warn};

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::models::{ArticleSource, DIRECT_INPUT, ExtractedArticle};
use crate::utils::{
    SOCIAL_DOMAINS, classify_source_type, domain_matches, extract_domain, is_valid_url,
    truncate_text, word_count,
};

/// Characters of content kept in [`ExtractedArticle::summary`].
const SUMMARY_CHARS: usize = 200;

/// Parallel fetches when extracting several sources.
const FETCH_CONCURRENCY: usize = 5;

#[derive(Debug, Clone)]
pub struct ContentExtractor {
    client: Client,
}

impl ContentExtractor {
    /// HTTP client with the configured timeout and user agent.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.scraping.timeout())
            .user_agent(&config.scraping.user_agent)
            .build()?;
        Ok(Self::new(client))
    }

    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn extract(&self, source: &ArticleSource) -> Result<ExtractedArticle> {
        match source {
            ArticleSource::Url(url) => self.extract_from_url(url).await,
            ArticleSource::Text(text) => extract_from_text(text),
        }
    }

    /// Extract every source, keeping input order; failures stay in place.
    #[instrument(level = "info", skip_all, fields(count = sources.len()))]
    pub async fn extract_many(&self, sources: &[ArticleSource]) -> Vec<Result<ExtractedArticle>> {
        let futures: Vec<_> = sources
            .iter()
            .enumerate()
            .map(|(i, source)| self.extract_indexed(i, source))
            .collect();
        let mut results: Vec<(usize, Result<ExtractedArticle>)> =
            stream::iter(futures)
                .buffer_unordered(FETCH_CONCURRENCY)
                .collect()
                .await;
        results.sort_by_key(|(i, _)| *i);
        results.into_iter().map(|(_, r)| r).collect()
    }

    async fn extract_indexed(
        &self,
        index: usize,
        source: &ArticleSource,
    ) -> (usize, Result<ExtractedArticle>) {
        let res = self.extract(source).await;
        match &res {
            Ok(a) => debug!(index, words = a.word_count, "Extracted source"),
            Err(e) => warn!(index, error = %e, "Source extraction failed"),
        }
        (index, res)
    }

    /// Fetch and parse an article page.
    #[instrument(level = "info", skip_all, fields(%url))]
    pub async fn extract_from_url(&self, url: &str) -> Result<ExtractedArticle> {
        let url = url.trim();
        if !is_valid_url(url) {
            return Err(Error::InvalidUrl);
        }
        let domain = extract_domain(url);
        if SOCIAL_DOMAINS.iter().any(|base| domain_matches(&domain, base)) {
            return Err(Error::SocialMediaUrl { domain });
        }

        let body = self.fetch(url).await.map_err(|e| {
            error!(error = %e, "Fetch failed");
            Error::Extraction(e.to_string())
        })?;
        let page = article::parse_article(&body);

        let article = ExtractedArticle {
            url: url.to_string(),
            summary: truncate_text(&page.content, SUMMARY_CHARS),
            word_count: word_count(&page.content),
            title: page.title,
            content: page.content,
            authors: page.authors,
            publish_date: page.publish_date,
            source_type: classify_source_type(url).to_string(),
            domain,
        };
        info!(
            domain = %article.domain,
            words = article.word_count,
            "Extracted article"
        );
        Ok(article)
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

/// Wrap pasted text as an article.
pub fn extract_from_text(text: &str) -> Result<ExtractedArticle> {
    let content = text.trim();
    if content.is_empty() {
        return Err(Error::EmptyText);
    }
    Ok(ExtractedArticle {
        url: DIRECT_INPUT.to_string(),
        title: "Direct Text Input".to_string(),
        content: content.to_string(),
        authors: Vec::new(),
        publish_date: None,
        summary: truncate_text(content, SUMMARY_CHARS),
        domain: DIRECT_INPUT.to_string(),
        word_count: word_count(content),
        source_type: "other".to_string(),
    })
}
