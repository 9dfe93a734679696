//! # SourceShield
//!
//! News credibility analysis: extracts an article from a URL or pasted text,
//! classifies each sentence as fact or opinion, scores sentiment, political
//! and emotional bias, asks an OpenAI-compatible LLM for a second opinion,
//! and stores every result for later trend reporting.
//!
//! ## Usage
//!
//! ```sh
//! sourceshield serve
//! sourceshield analyze --url https://example.com/story
//! sourceshield compare https://a.example/story https://b.example/story
//! sourceshield history --limit 20
//! ```
//!
//! ## Architecture
//!
//! 1. **Extraction**: fetch and parse the article ([`extractor`])
//! 2. **Classification**: fact/opinion, sentiment and bias ([`nlp`])
//! 3. **LLM**: bias, fact/opinion and insight prompts ([`llm`])
//! 4. **Scoring and storage**: credibility and persistence ([`pipeline`], [`store`])
//! 5. **Presentation**: dashboard, JSON API and exports ([`dashboard`], [`export`])

use clap::Parser;
use tracing::{error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod dashboard;
mod error;
mod export;
mod extractor;
mod llm;
mod models;
mod nlp;
mod pipeline;
mod store;
mod text;
mod utils;

use cli::{Cli, Command};
use config::AppConfig;
use error::{Error, Result};
use models::{AnalysisOutcome, ArticleSource, ComparisonReport, Stage};
use pipeline::Pipeline;
use utils::{format_timestamp, humanize_label, truncate_text};

#[tokio::main]
#[instrument]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let args = Cli::parse();
    info!(command = ?args.command, "sourceshield starting up");

    let config = AppConfig::load(args.config.as_deref())?;
    let pipeline = match Pipeline::from_config(&config) {
        Ok(p) => p,
        Err(e) => {
            error!(error = %e, database = %config.database.url, "Failed to initialize pipeline");
            return Err(e);
        }
    };

    match args.command {
        Command::Serve { bind } => {
            let addr = bind.unwrap_or(config.server.bind);
            dashboard::serve(pipeline, addr).await?;
        }
        Command::Analyze {
            input,
            json_output_dir,
        } => {
            let source = match (input.url, input.text) {
                (Some(url), _) => ArticleSource::Url(url),
                (None, Some(text)) => ArticleSource::Text(text),
                (None, None) => return Err(Error::EmptyText),
            };
            let outcome = pipeline.analyze(&source).await?;
            print_analysis(&outcome);
            if let Some(dir) = json_output_dir {
                let path = export::write_analysis(&outcome, &dir).await?;
                println!("\nReport written to {}", path.display());
            }
        }
        Command::Compare {
            sources,
            json_output_dir,
        } => {
            let sources: Vec<ArticleSource> =
                sources.iter().map(|s| ArticleSource::detect(s)).collect();
            let report = pipeline.compare(&sources).await?;
            print_comparison(&report);
            if let Some(dir) = json_output_dir {
                let path = export::write_comparison(&report, &dir).await?;
                println!("\nReport written to {}", path.display());
            }
        }
        Command::History { limit } => {
            let store = pipeline.store();
            let records = store.recent_analyses(limit).await?;
            let trends = store.trends(limit).await?;
            if records.is_empty() {
                println!("No previous analyses found. Analyze some articles first!");
            }
            for record in &records {
                let summary = &record.analysis.summary;
                println!(
                    "#{:<5} {}  {:<50}  credibility {:.0}%",
                    record.id,
                    format_timestamp(&record.timestamp),
                    truncate_text(&record.analysis.article.title, 50),
                    summary.credibility * 100.0
                );
            }
            if trends.total_analyses > 0 {
                println!("\nAnalysis Trends ({} analyses)", trends.total_analyses);
                if let Some(avg) = trends.average_fact_percentage {
                    println!("  Average fact content: {avg:.1}%");
                }
                if let Some(avg) = trends.average_credibility {
                    println!("  Average credibility:  {:.0}%", avg * 100.0);
                }
                for (label, n) in &trends.sentiment_distribution {
                    println!("  Sentiment {}: {n}", humanize_label(label));
                }
                for (label, n) in &trends.political_distribution {
                    println!("  Political {}: {n}", humanize_label(label));
                }
            }
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

fn opt_label(label: &Option<String>) -> String {
    label
        .as_deref()
        .map(humanize_label)
        .unwrap_or_else(|| "Unavailable".to_string())
}

fn opt_percent(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:.1}%"))
        .unwrap_or_else(|| "Unavailable".to_string())
}

fn print_analysis(outcome: &AnalysisOutcome) {
    let report = &outcome.report;
    let summary = &report.summary;
    println!("{}", report.article.title);
    println!("{} ({} words)", report.article.url, report.article.word_count);
    println!();
    println!("Credibility:     {:.0}%", summary.credibility * 100.0);
    println!("Fact content:    {}", opt_percent(summary.fact_percentage));
    println!("Opinion content: {}", opt_percent(summary.opinion_percentage));
    println!("Sentiment:       {}", opt_label(&summary.sentiment));
    println!("Political bias:  {}", opt_label(&summary.political_bias));
    println!("Emotional tone:  {}", opt_label(&summary.emotional_bias));
    match &summary.ai_insight {
        Some(insight) => println!("\nAI insight: {insight}"),
        None => {
            if let Some(e) = report.llm_analysis.error() {
                println!("\nAI analysis unavailable: {e}");
            }
        }
    }
    match (outcome.record_id, &outcome.persistence_error) {
        (Some(id), _) => println!("\nSaved as analysis #{id}"),
        (None, Some(e)) => println!("\nNot saved: {e}"),
        (None, None) => {}
    }
}

fn print_comparison(report: &ComparisonReport) {
    for source in &report.sources {
        println!(
            "Source {}: {} ({})  credibility {:.0}%  political {}",
            source.index + 1,
            truncate_text(&source.article.title, 50),
            source.article.domain,
            source.summary.credibility * 100.0,
            opt_label(&source.summary.political_bias)
        );
    }
    for skipped in &report.skipped {
        println!("Source {} skipped: {}", skipped.index + 1, skipped.error);
    }
    let source_no = |pos: usize| report.sources.get(pos).map_or(pos + 1, |s| s.index + 1);
    match &report.overlap {
        Stage::Done(overlap) => {
            println!("\nContent Similarity Analysis ({})", overlap.model);
            println!("  Average similarity: {:.0}%", overlap.average_similarity * 100.0);
            for pair in &overlap.pairwise_similarities {
                println!(
                    "  Source {} vs Source {}: {:.0}%",
                    source_no(pair.article_pair[0]),
                    source_no(pair.article_pair[1]),
                    pair.similarity * 100.0
                );
            }
        }
        Stage::Failed { error } => println!("\nContent similarity unavailable: {error}"),
    }
}
