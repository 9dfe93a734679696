//! Document store for analysis results.
//!
//! One SQLite table holds one row per analysis: the source identifier, the
//! first 500 characters of the article, and the full [`AnalysisReport`] as a
//! JSON document. Rows are never updated.
//!
//! The connection sits behind a mutex and every query runs on the blocking
//! pool, so handlers can share one [`AnalysisStore`] by cloning it.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::{info, instrument, warn};

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::models::{AnalysisRecord, AnalysisReport};
use crate::utils::{round_to, take_chars};

/// Characters of article body stored next to the analysis.
pub const STORED_CONTENT_CHARS: usize = 500;

const DEFAULT_TABLE: &str = "analyses";

/// Aggregates over the most recent analyses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trends {
    pub total_analyses: usize,
    pub average_fact_percentage: Option<f64>,
    pub average_credibility: Option<f64>,
    pub sentiment_distribution: BTreeMap<String, usize>,
    pub political_distribution: BTreeMap<String, usize>,
}

#[derive(Debug, Clone)]
pub struct AnalysisStore {
    conn: Arc<Mutex<Connection>>,
    table: String,
}

/// Table names come from configuration, so only identifier characters pass.
fn table_name(collection: &str) -> String {
    let valid = !collection.is_empty()
        && collection.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !collection.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        collection.to_string()
    } else {
        warn!(%collection, "Invalid collection name; using default");
        DEFAULT_TABLE.to_string()
    }
}

fn parse_ts(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn mean(values: &[f64], places: i32) -> Option<f64> {
    (!values.is_empty())
        .then(|| round_to(values.iter().sum::<f64>() / values.len() as f64, places))
}

impl AnalysisStore {
    /// Open (or create) the store. `:memory:` gives a private in-memory database.
    #[instrument(level = "info", skip_all, fields(url = %config.url))]
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        let path = config.url.strip_prefix("sqlite://").unwrap_or(&config.url);
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };
        let table = table_name(&config.collection_name);
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL,
                content TEXT NOT NULL,
                analysis TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_{table}_url ON {table}(url);"
        ))?;
        info!(%table, "Analysis store ready");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            table,
        })
    }

    /// In-memory store with the default table.
    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        Self::open(&DatabaseConfig {
            url: ":memory:".to_string(),
            ..DatabaseConfig::default()
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection, &str) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let table = self.table.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            f(&guard, &table)
        })
        .await?
    }

    /// Insert one analysis document and return its id.
    #[instrument(level = "info", skip_all, fields(%source))]
    pub async fn save_analysis(
        &self,
        source: &str,
        content: &str,
        report: &AnalysisReport,
    ) -> Result<i64> {
        let document = serde_json::to_string(report)?;
        let source = source.to_string();
        let content = take_chars(content, STORED_CONTENT_CHARS).to_string();
        let now = Utc::now().to_rfc3339();

        let id = self
            .with_conn(move |conn, table| {
                conn.execute(
                    &format!(
                        "INSERT INTO {table} (url, content, analysis, timestamp, created_at)
                         VALUES (?1, ?2, ?3, ?4, ?4)"
                    ),
                    params![source, content, document, now],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        info!(id, "Saved analysis");
        Ok(id)
    }

    /// Most recent analyses, newest first.
    pub async fn recent_analyses(&self, limit: usize) -> Result<Vec<AnalysisRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_conn(move |conn, table| {
            let mut stmt = conn.prepare(&format!(
                "SELECT id, url, content, analysis, timestamp, created_at
                 FROM {table} ORDER BY id DESC LIMIT ?1"
            ))?;
            let rows = stmt.query_map([limit], raw_row)?;
            let mut records = Vec::new();
            for row in rows {
                if let Some(record) = decode(row?) {
                    records.push(record);
                }
            }
            Ok(records)
        })
        .await
    }

    /// The newest analysis stored for `url`.
    pub async fn find_by_url(&self, url: &str) -> Result<Option<AnalysisRecord>> {
        let url = url.trim().to_string();
        self.with_conn(move |conn, table| {
            let raw = conn
                .query_row(
                    &format!(
                        "SELECT id, url, content, analysis, timestamp, created_at
                         FROM {table} WHERE url = ?1 ORDER BY id DESC LIMIT 1"
                    ),
                    [url],
                    raw_row,
                )
                .optional()?;
            Ok(raw.and_then(decode))
        })
        .await
    }

    pub async fn count(&self) -> Result<usize> {
        self.with_conn(|conn, table| {
            let n: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
            Ok(usize::try_from(n).unwrap_or_default())
        })
        .await
    }

    /// Aggregates over the `limit` most recent analyses.
    pub async fn trends(&self, limit: usize) -> Result<Trends> {
        let records = self.recent_analyses(limit).await?;
        let mut trends = Trends {
            total_analyses: records.len(),
            ..Trends::default()
        };

        let mut facts = Vec::new();
        let mut credibility = Vec::new();
        for record in &records {
            let summary = &record.analysis.summary;
            facts.extend(summary.fact_percentage);
            credibility.push(summary.credibility);
            if let Some(label) = &summary.sentiment {
                *trends.sentiment_distribution.entry(label.clone()).or_default() += 1;
            }
            if let Some(label) = &summary.political_bias {
                *trends.political_distribution.entry(label.clone()).or_default() += 1;
            }
        }
        trends.average_fact_percentage = mean(&facts, 1);
        trends.average_credibility = mean(&credibility, 3);
        Ok(trends)
    }
}

type RawRow = (i64, String, String, String, String, String);

fn raw_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

/// Rows whose document no longer parses are skipped with a warning.
fn decode((id, url, content, analysis, timestamp, created_at): RawRow) -> Option<AnalysisRecord> {
    let analysis: AnalysisReport = match serde_json::from_str(&analysis) {
        Ok(a) => a,
        Err(e) => {
            warn!(id, error = %e, "Skipping unreadable analysis document");
            return None;
        }
    };
    Some(AnalysisRecord {
        id,
        url,
        content,
        analysis,
        timestamp: parse_ts(&timestamp)?,
        created_at: parse_ts(&created_at)?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{AnalysisSummary, ExtractedArticle, Stage};

    pub(crate) fn report(sentiment: &str, political: &str, fact: f64, credibility: f64) -> AnalysisReport {
        AnalysisReport {
            article: ExtractedArticle {
                url: "direct_input".into(),
                title: "Direct Text Input".into(),
                content: "body".into(),
                authors: vec![],
                publish_date: None,
                summary: "body".into(),
                domain: "direct_input".into(),
                word_count: 1,
                source_type: "other".into(),
            },
            fact_opinion: Stage::failed("No sentences found"),
            bias_analysis: Stage::failed("Empty text provided"),
            llm_analysis: Stage::failed("OpenAI client not available"),
            summary: AnalysisSummary {
                fact_percentage: Some(fact),
                sentiment: Some(sentiment.into()),
                political_bias: Some(political.into()),
                credibility,
                ..AnalysisSummary::default()
            },
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_save_and_recent_newest_first() {
        let store = AnalysisStore::in_memory().unwrap();
        let long = "x".repeat(800);
        let first = store
            .save_analysis("https://a.example/1", &long, &report("positive", "neutral", 50.0, 0.7))
            .await
            .unwrap();
        let second = store
            .save_analysis("direct_input", "short", &report("negative", "left_leaning", 10.0, 0.5))
            .await
            .unwrap();
        assert!(second > first);

        let recent = store.recent_analyses(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, second);
        assert_eq!(recent[1].content.chars().count(), STORED_CONTENT_CHARS);
        assert_eq!(recent[1].analysis.summary.sentiment.as_deref(), Some("positive"));

        assert_eq!(store.recent_analyses(1).await.unwrap().len(), 1);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_find_by_url_returns_latest() {
        let store = AnalysisStore::in_memory().unwrap();
        let url = "https://news.example/story";
        store.save_analysis(url, "a", &report("neutral", "neutral", 10.0, 0.5)).await.unwrap();
        let latest = store
            .save_analysis(url, "b", &report("neutral", "neutral", 90.0, 0.8))
            .await
            .unwrap();

        let found = store.find_by_url(url).await.unwrap().unwrap();
        assert_eq!(found.id, latest);
        assert_eq!(found.content, "b");
        assert!(store.find_by_url("https://missing.example").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_trends() {
        let store = AnalysisStore::in_memory().unwrap();
        for (s, p, f, c) in [
            ("positive", "neutral", 80.0, 0.8),
            ("positive", "left_leaning", 40.0, 0.6),
            ("negative", "neutral", 30.0, 0.4),
        ] {
            store.save_analysis("direct_input", "x", &report(s, p, f, c)).await.unwrap();
        }
        let trends = store.trends(50).await.unwrap();
        assert_eq!(trends.total_analyses, 3);
        assert_eq!(trends.average_fact_percentage, Some(50.0));
        assert_eq!(trends.average_credibility, Some(0.6));
        assert_eq!(trends.sentiment_distribution["positive"], 2);
        assert_eq!(trends.political_distribution["neutral"], 2);

        let empty = AnalysisStore::in_memory().unwrap().trends(50).await.unwrap();
        assert_eq!(empty, Trends::default());
    }

    #[test]
    fn test_table_name_sanitized() {
        assert_eq!(table_name("analyses_v2"), "analyses_v2");
        assert_eq!(table_name("drop table; --"), DEFAULT_TABLE);
        assert_eq!(table_name("1abc"), DEFAULT_TABLE);
    }
}
