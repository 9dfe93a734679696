//! Embedding-based similarity between articles.
//!
//! All texts needed for one comparison are embedded in a single batch so a
//! remote embedder is called once per operation, not once per pair.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::{Error, Result};
use crate::nlp::embedding::{Embedder, EmbeddingBackend};
use crate::text::tokenize_sentences;
use crate::utils::round_to;

/// Sentences considered from each article in [`SimilarityAnalyzer::compare_articles`].
const MAX_SENTENCES: usize = 10;
const SENTENCE_PAIR_THRESHOLD: f64 = 0.6;
const MAX_SENTENCE_PAIRS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentencePair {
    pub sentence1: String,
    pub sentence2: String,
    pub similarity: f64,
    pub indices: [usize; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleComparison {
    pub overall_similarity: f64,
    pub similar_sentence_pairs: Vec<SentencePair>,
    pub total_sentences: [usize; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairSimilarity {
    pub article_pair: [usize; 2],
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentOverlap {
    pub pairwise_similarities: Vec<PairSimilarity>,
    pub average_similarity: f64,
    pub highest_similarity: Option<PairSimilarity>,
    pub total_comparisons: usize,
    pub model: String,
}

/// Cosine similarity; zero vectors compare as 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let (mut dot, mut na, mut nb) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

fn rounded_cosine(a: &[f32], b: &[f32]) -> f64 {
    round_to(cosine_similarity(a, b), 3)
}

#[derive(Debug, Clone)]
pub struct SimilarityAnalyzer {
    embedder: EmbeddingBackend,
}

impl SimilarityAnalyzer {
    pub fn new(embedder: EmbeddingBackend) -> Self {
        Self { embedder }
    }

    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let expected = texts.len();
        let vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != expected {
            return Err(Error::Embedding(format!(
                "expected {expected} vectors, got {}",
                vectors.len()
            )));
        }
        Ok(vectors)
    }

    /// Similarity of two texts; empty input compares as 0.0.
    pub async fn calculate_similarity(&self, text1: &str, text2: &str) -> Result<f64> {
        if text1.trim().is_empty() || text2.trim().is_empty() {
            return Ok(0.0);
        }
        let v = self.embed(vec![text1.to_string(), text2.to_string()]).await?;
        Ok(rounded_cosine(&v[0], &v[1]))
    }

    /// Overall similarity plus the closest sentence pairs of two articles.
    #[instrument(level = "info", skip_all)]
    pub async fn compare_articles(&self, article1: &str, article2: &str) -> Result<ArticleComparison> {
        if article1.trim().is_empty() || article2.trim().is_empty() {
            return Err(Error::TooFewArticles);
        }
        let sentences1 = tokenize_sentences(article1);
        let sentences2 = tokenize_sentences(article2);
        let head1 = &sentences1[..sentences1.len().min(MAX_SENTENCES)];
        let head2 = &sentences2[..sentences2.len().min(MAX_SENTENCES)];

        let mut batch = vec![article1.to_string(), article2.to_string()];
        batch.extend(head1.iter().cloned());
        batch.extend(head2.iter().cloned());
        let vectors = self.embed(batch).await?;

        let (s1_vecs, s2_vecs) = vectors[2..].split_at(head1.len());
        let mut pairs = Vec::new();
        for (i, v1) in s1_vecs.iter().enumerate() {
            for (j, v2) in s2_vecs.iter().enumerate() {
                let similarity = rounded_cosine(v1, v2);
                if similarity > SENTENCE_PAIR_THRESHOLD {
                    pairs.push(SentencePair {
                        sentence1: head1[i].clone(),
                        sentence2: head2[j].clone(),
                        similarity,
                        indices: [i, j],
                    });
                }
            }
        }
        pairs.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        pairs.truncate(MAX_SENTENCE_PAIRS);

        Ok(ArticleComparison {
            overall_similarity: rounded_cosine(&vectors[0], &vectors[1]),
            similar_sentence_pairs: pairs,
            total_sentences: [sentences1.len(), sentences2.len()],
        })
    }

    /// Pairwise similarity across two or more articles, most similar first.
    #[instrument(level = "info", skip_all, fields(count = articles.len()))]
    pub async fn detect_content_overlap(&self, articles: &[String]) -> Result<ContentOverlap> {
        if articles.len() < 2 {
            return Err(Error::TooFewArticles);
        }
        let vectors = self.embed(articles.to_vec()).await?;

        let mut pairs = Vec::new();
        for i in 0..vectors.len() {
            for j in (i + 1)..vectors.len() {
                pairs.push(PairSimilarity {
                    article_pair: [i, j],
                    similarity: rounded_cosine(&vectors[i], &vectors[j]),
                });
            }
        }
        // stable sort keeps (i, j) order among ties
        pairs.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));

        let average = pairs.iter().map(|p| p.similarity).sum::<f64>() / pairs.len() as f64;
        info!(comparisons = pairs.len(), average, "Computed content overlap");

        Ok(ContentOverlap {
            highest_similarity: pairs.first().cloned(),
            average_similarity: round_to(average, 3),
            total_comparisons: pairs.len(),
            pairwise_similarities: pairs,
            model: self.model_name().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nlp::embedding::HashingEmbedder;

    fn analyzer() -> SimilarityAnalyzer {
        SimilarityAnalyzer::new(EmbeddingBackend::Hashing(HashingEmbedder::default()))
    }

    #[test]
    fn test_cosine_basics() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]), 1.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_identical_texts_are_fully_similar() {
        let a = analyzer();
        let s = a
            .calculate_similarity("Storm floods the coastal town", "Storm floods the coastal town")
            .await
            .unwrap();
        assert_eq!(s, 1.0);
        assert_eq!(a.calculate_similarity("", "anything").await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn test_overlap_orders_pairs() {
        let a = analyzer();
        let articles = vec![
            "Parliament passed the new climate bill after a long debate.".to_string(),
            "The new climate bill passed parliament after a long debate.".to_string(),
            "Local bakery wins award for sourdough bread.".to_string(),
        ];
        let overlap = a.detect_content_overlap(&articles).await.unwrap();
        assert_eq!(overlap.total_comparisons, 3);
        let top = overlap.highest_similarity.unwrap();
        assert_eq!(top.article_pair, [0, 1]);
        assert!(top.similarity > overlap.pairwise_similarities[2].similarity);
    }

    #[tokio::test]
    async fn test_overlap_needs_two_articles() {
        let a = analyzer();
        assert!(matches!(
            a.detect_content_overlap(&["only one".to_string()]).await,
            Err(Error::TooFewArticles)
        ));
    }

    #[tokio::test]
    async fn test_compare_articles_finds_matching_sentence() {
        let a = analyzer();
        let cmp = a
            .compare_articles(
                "Wildfires forced thousands to evacuate. Officials opened shelters.",
                "Officials opened shelters. Rain is expected next week.",
            )
            .await
            .unwrap();
        assert_eq!(cmp.total_sentences, [2, 2]);
        let best = &cmp.similar_sentence_pairs[0];
        assert_eq!(best.indices, [1, 0]);
        assert_eq!(best.similarity, 1.0);
    }
}
