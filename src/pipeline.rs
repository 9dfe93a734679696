//! The analysis pipeline: extraction, the classifier bank, the LLM stage,
//! credibility scoring and persistence.
//!
//! # Single source
//!
//! 1. **Extract** the article from a URL or pasted text
//! 2. **Analyze** fact/opinion, bias and LLM stages concurrently; a failing
//!    stage becomes `{ "error": ... }` without touching the others
//! 3. **Score** credibility from whatever stages succeeded
//! 4. **Persist** the document when at least one stage succeeded
//!
//! # Multi-source comparison
//!
//! Sources are extracted concurrently; the ones that fail are skipped and
//! reported. The rest get the classifier bank, pairwise content overlap, a
//! sentence-level look at the closest pair, and LLM comparisons of the first
//! source against each other one.

use futures::future::join_all;
use reqwest::Client;
use std::time::Duration;
use tracing::{info, instrument, warn};

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::extractor::ContentExtractor;
use crate::llm::{LlmAnalyzer, LlmReport};
use crate::models::{
    AnalysisOutcome, AnalysisReport, AnalysisSummary, ArticleSource, ComparisonReport,
    ExtractedArticle, SkippedSource, SourceAnalysis, SourceComparison, Stage,
};
use crate::nlp::bias::{BiasReport, comprehensive_bias_analysis};
use crate::nlp::embedding::EmbeddingBackend;
use crate::nlp::fact_opinion::{FactOpinionReport, classify_text};
use crate::nlp::sentiment::{HostedSentimentModel, SentimentAnalyzer};
use crate::nlp::similarity::{ArticleComparison, ContentOverlap, SimilarityAnalyzer};
use crate::store::AnalysisStore;
use crate::utils::round_to;

/// Non-blank characters an article needs before it is analyzed.
pub const MIN_CONTENT_CHARS: usize = 20;
pub const MIN_SOURCES: usize = 2;
pub const MAX_SOURCES: usize = 5;

const API_TIMEOUT: Duration = Duration::from_secs(90);

/// Mean of the available contributions, 0.5 when nothing is available.
///
/// - fact percentage / 100
/// - sentiment: neutral 0.8, anything else 0.5
/// - political bias: neutral or balanced 0.8, anything else 0.4
pub fn calculate_credibility(
    fact_opinion: &Stage<FactOpinionReport>,
    bias: &Stage<BiasReport>,
) -> f64 {
    let mut scores = Vec::with_capacity(3);
    if let Some(fo) = fact_opinion.value() {
        scores.push(fo.statistics.fact_percentage / 100.0);
    }
    if let Some(b) = bias.value() {
        if let Some(s) = b.sentiment_analysis.value() {
            scores.push(if s.primary_sentiment == "neutral" { 0.8 } else { 0.5 });
        }
        scores.push(if b.political_bias.political_bias.is_even_handed() {
            0.8
        } else {
            0.4
        });
    }
    if scores.is_empty() {
        return 0.5;
    }
    round_to(scores.iter().sum::<f64>() / scores.len() as f64, 3)
}

/// Flat fields for the overview tab and history rows.
pub fn summarize(
    fact_opinion: &Stage<FactOpinionReport>,
    bias: &Stage<BiasReport>,
    llm: Option<&Stage<LlmReport>>,
) -> AnalysisSummary {
    let mut summary = AnalysisSummary {
        credibility: calculate_credibility(fact_opinion, bias),
        ..AnalysisSummary::default()
    };
    if let Some(fo) = fact_opinion.value() {
        summary.fact_percentage = Some(fo.statistics.fact_percentage);
        summary.opinion_percentage = Some(fo.statistics.opinion_percentage);
    }
    if let Some(b) = bias.value() {
        if let Some(s) = b.sentiment_analysis.value() {
            summary.sentiment = Some(s.primary_sentiment.clone());
            summary.sentiment_confidence = Some(s.confidence);
        }
        summary.political_bias = Some(b.political_bias.political_bias.as_str().to_string());
        summary.political_score = Some(b.political_bias.confidence);
        summary.emotional_bias = Some(b.emotional_bias.emotional_bias.as_str().to_string());
    }
    summary.ai_insight = llm
        .and_then(Stage::value)
        .and_then(|r| r.insight.value())
        .cloned();
    summary
}

fn ensure_content(article: &ExtractedArticle) -> Result<()> {
    if article.content.trim().chars().count() < MIN_CONTENT_CHARS {
        return Err(Error::InsufficientContent);
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    extractor: ContentExtractor,
    sentiment: SentimentAnalyzer,
    llm: LlmAnalyzer,
    similarity: SimilarityAnalyzer,
    store: AnalysisStore,
}

impl Pipeline {
    pub fn new(
        extractor: ContentExtractor,
        sentiment: SentimentAnalyzer,
        llm: LlmAnalyzer,
        similarity: SimilarityAnalyzer,
        store: AnalysisStore,
    ) -> Self {
        Self {
            extractor,
            sentiment,
            llm,
            similarity,
            store,
        }
    }

    /// Wire every component from configuration. Fails when the store cannot
    /// be opened.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api = Client::builder().timeout(API_TIMEOUT).build()?;
        let sentiment = if config.models.remote_sentiment {
            SentimentAnalyzer::new(Some(HostedSentimentModel::new(api.clone(), config)))
        } else {
            SentimentAnalyzer::rule_based()
        };
        let similarity = SimilarityAnalyzer::new(EmbeddingBackend::from_config(api.clone(), config));

        let pipeline = Self::new(
            ContentExtractor::from_config(config)?,
            sentiment,
            LlmAnalyzer::from_config(api, config),
            similarity,
            AnalysisStore::open(&config.database)?,
        );
        info!(
            llm = pipeline.llm.is_available(),
            embeddings = %pipeline.similarity.model_name(),
            "Pipeline ready"
        );
        Ok(pipeline)
    }

    pub fn store(&self) -> &AnalysisStore {
        &self.store
    }

    pub fn llm_available(&self) -> bool {
        self.llm.is_available()
    }

    pub fn embedding_model(&self) -> &str {
        self.similarity.model_name()
    }

    /// Embedding similarity of two texts.
    pub async fn text_similarity(&self, text1: &str, text2: &str) -> Result<f64> {
        self.similarity.calculate_similarity(text1, text2).await
    }

    async fn classify(&self, text: &str) -> (Stage<FactOpinionReport>, Stage<BiasReport>) {
        let (fact_opinion, bias) = tokio::join!(
            async { classify_text(text) },
            comprehensive_bias_analysis(&self.sentiment, text),
        );
        (fact_opinion.into(), bias.into())
    }

    /// Analyze one article and store the result.
    #[instrument(level = "info", skip_all, fields(source = %source.identifier()))]
    pub async fn analyze(&self, source: &ArticleSource) -> Result<AnalysisOutcome> {
        let article = self.extractor.extract(source).await?;
        ensure_content(&article)?;
        let text = article.content.as_str();

        let ((fact_opinion, bias_analysis), llm_analysis) = tokio::join!(
            self.classify(text),
            self.llm.comprehensive_llm_analysis(text, &[]),
        );
        let llm_analysis: Stage<LlmReport> = llm_analysis.into();

        for (stage, error) in [
            ("fact_opinion", fact_opinion.error()),
            ("bias_analysis", bias_analysis.error()),
            ("llm_analysis", llm_analysis.error()),
        ] {
            if let Some(error) = error {
                warn!(stage, %error, "Analysis stage failed");
            }
        }

        let summary = summarize(&fact_opinion, &bias_analysis, Some(&llm_analysis));
        let report = AnalysisReport {
            article,
            fact_opinion,
            bias_analysis,
            llm_analysis,
            summary,
            timestamp: chrono::Utc::now(),
        };

        let mut outcome = AnalysisOutcome {
            report,
            record_id: None,
            persistence_error: None,
        };
        if !outcome.report.any_stage_succeeded() {
            warn!("Every analysis stage failed; not saving");
            return Ok(outcome);
        }
        match self
            .store
            .save_analysis(source.identifier(), &outcome.report.article.content, &outcome.report)
            .await
        {
            Ok(id) => outcome.record_id = Some(id),
            Err(e) => {
                warn!(error = %e, "Failed to save analysis to database");
                outcome.persistence_error = Some(e.to_string());
            }
        }
        info!(
            credibility = outcome.report.summary.credibility,
            saved = outcome.record_id.is_some(),
            "Analysis complete"
        );
        Ok(outcome)
    }

    /// Compare two to five sources covering the same story.
    pub async fn compare(&self, inputs: &[ArticleSource]) -> Result<ComparisonReport> {
        let numbered: Vec<(usize, ArticleSource)> = inputs.iter().cloned().enumerate().collect();
        self.compare_numbered(&numbered).await
    }

    /// [`Pipeline::compare`] over sources tagged with their position in the
    /// user's input, so blank form fields do not shift the reported indices.
    #[instrument(level = "info", skip_all, fields(count = inputs.len()))]
    pub async fn compare_numbered(
        &self,
        inputs: &[(usize, ArticleSource)],
    ) -> Result<ComparisonReport> {
        if !(MIN_SOURCES..=MAX_SOURCES).contains(&inputs.len()) {
            return Err(Error::SourceCount {
                min: MIN_SOURCES,
                max: MAX_SOURCES,
            });
        }

        let mut usable = Vec::new();
        let mut skipped = Vec::new();
        let to_extract: Vec<ArticleSource> = inputs.iter().map(|(_, s)| s.clone()).collect();
        let extracted = self.extractor.extract_many(&to_extract).await;
        for ((index, source), result) in inputs.iter().zip(extracted) {
            match result.and_then(|a| ensure_content(&a).map(|_| a)) {
                Ok(article) => usable.push((*index, article)),
                Err(e) => skipped.push(SkippedSource {
                    index: *index,
                    source: source.identifier().to_string(),
                    error: e.to_string(),
                }),
            }
        }
        if usable.len() < MIN_SOURCES {
            return Err(Error::NotEnoughSources);
        }

        let sources: Vec<SourceAnalysis> =
            join_all(usable.into_iter().map(|(index, article)| async move {
                let (fact_opinion, bias_analysis) = self.classify(&article.content).await;
                let summary = summarize(&fact_opinion, &bias_analysis, None);
                SourceAnalysis {
                    index,
                    article,
                    fact_opinion,
                    bias_analysis,
                    summary,
                }
            }))
            .await;

        let texts: Vec<String> = sources.iter().map(|s| s.article.content.clone()).collect();
        let ((overlap, closest_pair), llm_comparisons) =
            tokio::join!(self.overlap(&texts), self.llm_comparisons(&texts));

        info!(
            sources = sources.len(),
            skipped = skipped.len(),
            "Comparison complete"
        );
        Ok(ComparisonReport {
            sources,
            skipped,
            overlap,
            closest_pair,
            llm_comparisons,
            timestamp: chrono::Utc::now(),
        })
    }

    /// Pairwise overlap, then a sentence-level comparison of the closest pair.
    async fn overlap(&self, texts: &[String]) -> (Stage<ContentOverlap>, Stage<ArticleComparison>) {
        let overlap = match self.similarity.detect_content_overlap(texts).await {
            Ok(o) => o,
            Err(e) => {
                warn!(error = %e, "Content overlap failed");
                let message = e.to_string();
                return (Stage::failed(&message), Stage::failed(message));
            }
        };
        let closest = match &overlap.highest_similarity {
            Some(top) => {
                let [i, j] = top.article_pair;
                self.similarity
                    .compare_articles(&texts[i], &texts[j])
                    .await
                    .into()
            }
            None => Stage::failed(Error::TooFewArticles),
        };
        (Stage::Done(overlap), closest)
    }

    /// The first source against every other one; `source_index` is the
    /// position in the comparison's `sources`.
    async fn llm_comparisons(&self, texts: &[String]) -> Stage<Vec<SourceComparison>> {
        if !self.llm.is_available() {
            return Stage::failed(Error::LlmUnavailable);
        }
        let Some((first, others)) = texts.split_first() else {
            return Stage::failed(Error::TooFewArticles);
        };
        let comparisons = self
            .llm
            .compare_against(first, others)
            .await
            .into_iter()
            .map(|c| SourceComparison {
                source_index: c.source_index + 1,
                comparison: c.comparison,
            })
            .collect();
        Stage::Done(comparisons)
    }
}
