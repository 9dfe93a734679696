//! JSON export of analysis results.
//!
//! Reports are written into per-day directories:
//! ```text
//! json_output_dir/
//! └── 2026-05-06/
//!     ├── analysis-17.json
//!     ├── analysis-20260506T141502Z.json
//!     └── comparison-20260506T142210Z.json
//! ```
//!
//! Stored analyses are named after their record id; anything that was not
//! persisted gets a UTC timestamp instead.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

use crate::error::Result;
use crate::models::{AnalysisOutcome, ComparisonReport};
use crate::utils::ensure_writable_dir;

fn file_stem(kind: &str, record_id: Option<i64>, at: &DateTime<Utc>) -> String {
    match record_id {
        Some(id) => format!("{kind}-{id}"),
        None => format!("{kind}-{}", at.format("%Y%m%dT%H%M%SZ")),
    }
}

fn output_path(json_output_dir: &str, at: &DateTime<Utc>, stem: &str) -> PathBuf {
    PathBuf::from(json_output_dir)
        .join(at.date_naive().to_string())
        .join(format!("{stem}.json"))
}

async fn write_json<T: Serialize>(value: &T, path: PathBuf) -> Result<PathBuf> {
    let json = serde_json::to_string_pretty(value)?;
    if let Some(dir) = path.parent() {
        let dir = dir.to_string_lossy();
        if let Err(e) = ensure_writable_dir(&dir).await {
            error!(%dir, error = %e, "Failed to create JSON dir");
            return Err(e);
        }
    }
    info!(path = %path.display(), "Writing JSON");
    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote JSON export");
    Ok(path)
}

/// Write a single-article analysis to `{json_output_dir}/{date}/analysis-<id>.json`.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir))]
pub async fn write_analysis(outcome: &AnalysisOutcome, json_output_dir: &str) -> Result<PathBuf> {
    let at = outcome.report.timestamp;
    let stem = file_stem("analysis", outcome.record_id, &at);
    write_json(outcome, output_path(json_output_dir, &at, &stem)).await
}

/// Write a multi-source comparison to `{json_output_dir}/{date}/comparison-<timestamp>.json`.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir))]
pub async fn write_comparison(report: &ComparisonReport, json_output_dir: &str) -> Result<PathBuf> {
    let at = report.timestamp;
    let stem = file_stem("comparison", None, &at);
    write_json(report, output_path(json_output_dir, &at, &stem)).await
}
