//! HTML rendering for the dashboard pages.
//!
//! Pages are plain server-rendered HTML; the four result tabs switch with
//! CSS radio buttons, so no JavaScript is served.

use serde_json::Value;

use crate::error::Error;
use crate::llm::LlmReport;
use crate::models::{AnalysisOutcome, AnalysisRecord, ComparisonReport, DIRECT_INPUT, Stage};
use crate::nlp::bias::BiasReport;
use crate::nlp::fact_opinion::FactOpinionReport;
use crate::store::Trends;
use crate::utils::{format_timestamp, humanize_label, truncate_text};

/// Sentences listed in the fact/opinion breakdown table.
const BREAKDOWN_ROWS: usize = 10;

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; background: #f6f7f9; color: #1d2330; }
header { background: #1d2a44; color: #fff; padding: 0.8rem 1.5rem; display: flex; gap: 1.5rem; align-items: center; }
header a { color: #cfd8ea; text-decoration: none; }
header a.active { color: #fff; font-weight: 600; }
main { max-width: 70rem; margin: 1.5rem auto; padding: 0 1.5rem; }
.card { background: #fff; border-radius: 8px; padding: 1rem 1.25rem; margin-bottom: 1rem; box-shadow: 0 1px 2px rgba(0,0,0,.08); }
.metrics { display: grid; grid-template-columns: repeat(auto-fit, minmax(10rem, 1fr)); gap: 0.75rem; }
.metric { background: #f0f3f8; border-radius: 6px; padding: 0.6rem 0.8rem; }
.metric .label { font-size: 0.8rem; color: #5b6475; }
.metric .value { font-size: 1.3rem; font-weight: 600; }
.error { background: #fdecec; border-left: 4px solid #d33; padding: 0.6rem 0.9rem; margin: 0.5rem 0; }
.hint { background: #eef5ff; border-left: 4px solid #3a7bd5; padding: 0.6rem 0.9rem; margin: 0.5rem 0; }
.bar { background: #e3e7ee; border-radius: 4px; height: 0.8rem; }
.bar span { display: block; height: 100%; border-radius: 4px; background: #1f77b4; }
.bar.opinion span { background: #ff7f0e; }
table { border-collapse: collapse; width: 100%; }
th, td { text-align: left; padding: 0.4rem 0.5rem; border-bottom: 1px solid #e3e7ee; vertical-align: top; }
textarea, input[type=text], input[type=url] { width: 100%; box-sizing: border-box; padding: 0.5rem; }
textarea { min-height: 8rem; }
button { background: #1d2a44; color: #fff; border: 0; border-radius: 6px; padding: 0.55rem 1.2rem; cursor: pointer; }
.tabs > input { display: none; }
.tabs > label { display: inline-block; padding: 0.5rem 1rem; cursor: pointer; border-bottom: 2px solid transparent; }
.tabs > input:checked + label { border-color: #1d2a44; font-weight: 600; }
.tabs > .panel { display: none; }
#tab-overview:checked ~ #panel-overview,
#tab-fact-opinion:checked ~ #panel-fact-opinion,
#tab-bias:checked ~ #panel-bias,
#tab-ai:checked ~ #panel-ai { display: block; }
"#;

/// Escape text for HTML element content and quoted attributes.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, active: &str, body: &str) -> String {
    let link = |href: &str, name: &str, label: &str| {
        let class = if name == active { " class=\"active\"" } else { "" };
        format!("<a href=\"{href}\"{class}>{label}</a>")
    };
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\"><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <title>{title} | SourceShield</title><style>{STYLE}</style></head><body>\
         <header><strong>SourceShield</strong>{}{}{}</header><main>{body}</main></body></html>",
        link("/", "analyze", "Single Article"),
        link("/compare", "compare", "Multi-Source Comparison"),
        link("/history", "history", "Historical Analysis"),
        title = escape(title),
    )
}

fn metric(label: &str, value: &str) -> String {
    format!(
        "<div class=\"metric\"><div class=\"label\">{}</div><div class=\"value\">{}</div></div>",
        escape(label),
        escape(value)
    )
}

fn percent_bar(class: &str, label: &str, pct: f64) -> String {
    let width = pct.clamp(0.0, 100.0);
    format!(
        "<p>{} {pct:.1}%</p><div class=\"bar {class}\"><span style=\"width:{width:.1}%\"></span></div>",
        escape(label)
    )
}

/// Error box plus the follow-up hint when the error has one.
pub fn error_box(message: &str, suggestion: Option<&str>) -> String {
    let mut out = format!("<div class=\"error\">{}</div>", escape(message));
    if let Some(hint) = suggestion {
        out.push_str(&format!("<div class=\"hint\">Suggestion: {}</div>", escape(hint)));
    }
    out
}

fn stage_error<T>(stage: &Stage<T>) -> Option<String> {
    stage.error().map(|e| error_box(e, None))
}

fn json_scalar(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

/// Key/value rows of an LLM JSON object, skipping raw model echoes.
fn json_table(value: &Value, hidden: &[&str]) -> String {
    let Some(map) = value.as_object() else {
        return format!("<p>{}</p>", escape(&json_scalar(value)));
    };
    let rows: String = map
        .iter()
        .filter(|(k, _)| !hidden.contains(&k.as_str()))
        .map(|(k, v)| {
            format!(
                "<tr><th>{}</th><td>{}</td></tr>",
                escape(&humanize_label(k)),
                escape(&json_scalar(v))
            )
        })
        .collect();
    format!("<table>{rows}</table>")
}

pub fn index_page(error: Option<&Error>, url: &str, text: &str) -> String {
    let mut body = String::from(
        "<h1>Single Article Analysis</h1>\
         <p>Analyze news articles for bias, sentiment, and fact vs opinion classification.</p>",
    );
    if let Some(e) = error {
        body.push_str(&error_box(&e.to_string(), e.suggestion()));
    }
    body.push_str(&format!(
        "<form class=\"card\" method=\"post\" action=\"/analyze\">\
         <p><label>News article URL<br><input type=\"url\" name=\"url\" value=\"{}\" placeholder=\"https://example.com/news-article\"></label></p>\
         <p><label>Or paste the text to analyze<br><textarea name=\"text\" placeholder=\"Paste your news text here...\">{}</textarea></label></p>\
         <button type=\"submit\">Analyze</button></form>",
        escape(url),
        escape(text)
    ));
    layout("Analyze", "analyze", &body)
}

fn overview_tab(outcome: &AnalysisOutcome) -> String {
    let report = &outcome.report;
    let article = &report.article;
    let summary = &report.summary;
    let published = article
        .publish_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "Unknown".to_string());

    let mut out = String::from("<div class=\"metrics\">");
    out.push_str(&metric("Word Count", &article.word_count.to_string()));
    out.push_str(&metric("Domain", &article.domain));
    out.push_str(&metric("Published", &published));
    out.push_str(&metric("Credibility Score", &format!("{:.2}", summary.credibility)));
    if let Some(f) = summary.fact_percentage {
        out.push_str(&metric("Fact Percentage", &format!("{f}%")));
    }
    if let Some(c) = summary.sentiment_confidence {
        out.push_str(&metric("Sentiment Confidence", &format!("{c:.2}")));
    }
    if let Some(c) = summary.political_score {
        out.push_str(&metric("Bias Confidence", &format!("{c:.2}")));
    }
    out.push_str("</div>");

    if !article.title.is_empty() {
        out.push_str(&format!("<p><strong>Title:</strong> {}</p>", escape(&article.title)));
    }
    if !article.authors.is_empty() {
        out.push_str(&format!(
            "<p><strong>Authors:</strong> {}</p>",
            escape(&article.authors.join(", "))
        ));
    }
    if let (Some(fact), Some(opinion)) = (summary.fact_percentage, summary.opinion_percentage) {
        out.push_str(&percent_bar("fact", "Facts", fact));
        out.push_str(&percent_bar("opinion", "Opinions", opinion));
    }
    if let Some(lean) = &summary.political_bias {
        out.push_str(&format!(
            "<p><strong>Political Bias:</strong> {}</p>",
            escape(&humanize_label(lean))
        ));
    }
    if let Some(insight) = &summary.ai_insight {
        out.push_str(&format!("<div class=\"hint\"><strong>AI insight:</strong> {}</div>", escape(insight)));
    }
    match (&outcome.record_id, &outcome.persistence_error) {
        (_, Some(e)) => out.push_str(&error_box(&format!("Failed to save analysis to database: {e}"), None)),
        (Some(id), None) => out.push_str(&format!("<p>Saved as analysis #{id}.</p>")),
        (None, None) => {}
    }
    out
}

fn fact_opinion_tab(stage: &Stage<FactOpinionReport>) -> String {
    if let Some(err) = stage_error(stage) {
        return err;
    }
    let Some(report) = stage.value() else {
        return String::new();
    };
    let stats = &report.statistics;
    let mut out = format!(
        "<div class=\"hint\"><strong>Overall Classification:</strong> {}</div><div class=\"metrics\">{}{}{}{}</div>",
        escape(&humanize_label(report.overall_classification.as_str())),
        metric("Total Sentences", &stats.total_sentences.to_string()),
        metric("Fact Sentences", &stats.fact_sentences.to_string()),
        metric("Opinion Sentences", &stats.opinion_sentences.to_string()),
        metric("Neutral Sentences", &stats.neutral_sentences.to_string()),
    );
    out.push_str("<h3>Sentence-by-Sentence Analysis</h3><table><tr><th>Sentence</th><th>Classification</th><th>Confidence</th></tr>");
    for item in report.sentence_breakdown.iter().take(BREAKDOWN_ROWS) {
        out.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{:.2}</td></tr>",
            escape(&truncate_text(&item.sentence, 100)),
            escape(&humanize_label(item.classification.as_str())),
            item.confidence
        ));
    }
    out.push_str("</table>");
    out
}

fn bias_tab(stage: &Stage<BiasReport>) -> String {
    if let Some(err) = stage_error(stage) {
        return err;
    }
    let Some(report) = stage.value() else {
        return String::new();
    };
    let mut out = String::from("<h3>Sentiment Analysis</h3>");
    match &report.sentiment_analysis {
        Stage::Done(s) => {
            out.push_str(&format!(
                "<div class=\"metrics\">{}{}{}</div><table><tr><th>Sentiment</th><th>Score</th></tr>",
                metric("Primary Sentiment", &humanize_label(&s.primary_sentiment)),
                metric("Confidence", &format!("{:.2}", s.confidence)),
                metric("Method", &humanize_label(match s.method {
                    crate::nlp::sentiment::SentimentMethod::Model => "model",
                    crate::nlp::sentiment::SentimentMethod::FallbackRuleBased => "fallback_rule_based",
                })),
            ));
            for (label, score) in &s.all_scores {
                out.push_str(&format!(
                    "<tr><td>{}</td><td>{score:.3}</td></tr>",
                    escape(&humanize_label(label))
                ));
            }
            out.push_str("</table>");
        }
        Stage::Failed { error } => out.push_str(&error_box(error, None)),
    }

    let political = &report.political_bias;
    out.push_str(&format!(
        "<h3>Political Bias Analysis</h3><div class=\"metrics\">{}{}</div><table><tr><th>Bias Type</th><th>Count</th></tr>",
        metric("Political Lean", &humanize_label(political.political_bias.as_str())),
        metric("Confidence", &format!("{:.2}", political.confidence)),
    ));
    for (kind, count) in &political.keyword_counts {
        out.push_str(&format!("<tr><td>{}</td><td>{count}</td></tr>", escape(&humanize_label(kind))));
    }
    out.push_str("</table>");

    let emotional = &report.emotional_bias;
    out.push_str(&format!(
        "<h3>Emotional Bias Analysis</h3><div class=\"metrics\">{}{}</div>",
        metric("Emotional Level", &humanize_label(emotional.emotional_bias.as_str())),
        metric("Emotional Score", &format!("{:.2}", emotional.emotional_score)),
    ));
    out
}

fn ai_tab(stage: &Stage<LlmReport>) -> String {
    let report = match stage {
        Stage::Failed { error } => {
            let hint = (error == &Error::LlmUnavailable.to_string())
                .then(|| Error::LlmUnavailable.suggestion())
                .flatten();
            return format!(
                "<p>LLM analysis not available.</p>{}",
                error_box(error, hint)
            );
        }
        Stage::Done(report) => report,
    };

    let mut out = String::new();
    if let Stage::Done(insight) = &report.insight {
        out.push_str(&format!("<h3>AI Insight</h3><p>{}</p>", escape(insight)));
    }
    out.push_str("<h3>AI Bias Analysis</h3>");
    out.push_str(&match &report.bias_analysis {
        Stage::Done(v) => json_table(v, &["raw_response", "original_response"]),
        Stage::Failed { error } => error_box(error, None),
    });
    out.push_str("<h3>AI Fact vs Opinion Analysis</h3>");
    out.push_str(&match &report.fact_opinion_analysis {
        Stage::Done(v) => json_table(v, &["raw_response", "original_response", "analysis"]),
        Stage::Failed { error } => error_box(error, None),
    });
    out
}

pub fn results_page(outcome: &AnalysisOutcome) -> String {
    let report = &outcome.report;
    let tabs = [
        ("overview", "Overview", overview_tab(outcome)),
        ("fact-opinion", "Fact vs Opinion", fact_opinion_tab(&report.fact_opinion)),
        ("bias", "Bias Analysis", bias_tab(&report.bias_analysis)),
        ("ai", "AI Analysis", ai_tab(&report.llm_analysis)),
    ];

    let mut body = String::from("<h1>Analysis Results</h1><div class=\"card tabs\">");
    for (i, (id, label, _)) in tabs.iter().enumerate() {
        let checked = if i == 0 { " checked" } else { "" };
        body.push_str(&format!(
            "<input type=\"radio\" name=\"tab\" id=\"tab-{id}\"{checked}><label for=\"tab-{id}\">{label}</label>"
        ));
    }
    for (id, label, content) in &tabs {
        body.push_str(&format!(
            "<section class=\"panel\" id=\"panel-{id}\"><h2>{label}</h2>{content}</section>"
        ));
    }
    body.push_str("</div><p><a href=\"/\">Analyze another article</a></p>");
    layout("Results", "analyze", &body)
}

pub fn compare_form_page(error: Option<&Error>, values: &[String]) -> String {
    let mut body = String::from(
        "<h1>Multi-Source Comparison</h1>\
         <p>Compare multiple sources covering the same story to identify bias and perspective differences. \
         Enter a URL or paste text for each source; at least two are required.</p>",
    );
    if let Some(e) = error {
        body.push_str(&error_box(&e.to_string(), e.suggestion()));
    }
    body.push_str("<form class=\"card\" method=\"post\" action=\"/compare\">");
    for n in 1..=crate::pipeline::MAX_SOURCES {
        let value = values.get(n - 1).map(String::as_str).unwrap_or_default();
        body.push_str(&format!(
            "<p><label>Source {n}<br><textarea name=\"source{n}\" placeholder=\"URL or article text\">{}</textarea></label></p>",
            escape(value)
        ));
    }
    body.push_str("<button type=\"submit\">Compare Sources</button></form>");
    layout("Compare", "compare", &body)
}

pub fn compare_results_page(report: &ComparisonReport) -> String {
    let mut body = String::from(
        "<h1>Source Comparison Results</h1><div class=\"card\"><table>\
         <tr><th>Source</th><th>Domain</th><th>Word Count</th><th>Fact %</th><th>Political Bias</th><th>Sentiment</th><th>Credibility</th></tr>",
    );
    for source in &report.sources {
        let s = &source.summary;
        body.push_str(&format!(
            "<tr><td>Source {}</td><td>{}</td><td>{}</td><td>{}%</td><td>{}</td><td>{}</td><td>{:.2}</td></tr>",
            source.index + 1,
            escape(&source.article.domain),
            source.article.word_count,
            s.fact_percentage.unwrap_or(0.0),
            escape(&humanize_label(s.political_bias.as_deref().unwrap_or("unknown"))),
            escape(&humanize_label(s.sentiment.as_deref().unwrap_or("unknown"))),
            s.credibility,
        ));
    }
    body.push_str("</table></div>");

    for skipped in &report.skipped {
        body.push_str(&error_box(
            &format!("Source {} skipped: {}", skipped.index + 1, skipped.error),
            None,
        ));
    }

    // overlap pairs index into report.sources, not the submitted list
    let source_no = |pos: usize| report.sources.get(pos).map_or(pos + 1, |s| s.index + 1);
    body.push_str("<div class=\"card\"><h2>Content Similarity Analysis</h2>");
    match &report.overlap {
        Stage::Done(overlap) => {
            body.push_str("<div class=\"metrics\">");
            body.push_str(&metric(
                "Average Similarity",
                &format!("{:.2}", overlap.average_similarity),
            ));
            if let Some(top) = &overlap.highest_similarity {
                body.push_str(&metric(
                    "Highest Similarity",
                    &format!(
                        "Sources {} & {}: {:.2}",
                        source_no(top.article_pair[0]),
                        source_no(top.article_pair[1]),
                        top.similarity
                    ),
                ));
            }
            body.push_str(&metric("Embedding Model", &overlap.model));
            body.push_str("</div>");
        }
        Stage::Failed { error } => body.push_str(&error_box(error, None)),
    }
    if let Stage::Done(closest) = &report.closest_pair {
        body.push_str("<h3>Most Similar Sentences</h3><table><tr><th>Sentence</th><th>Sentence</th><th>Similarity</th></tr>");
        for pair in &closest.similar_sentence_pairs {
            body.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{:.2}</td></tr>",
                escape(&pair.sentence1),
                escape(&pair.sentence2),
                pair.similarity
            ));
        }
        body.push_str("</table>");
    }
    body.push_str("</div><div class=\"card\"><h2>AI Source Comparison</h2>");
    match &report.llm_comparisons {
        Stage::Done(comparisons) => {
            for c in comparisons {
                body.push_str(&format!(
                    "<h3>Source {} vs Source {}</h3>",
                    source_no(0),
                    source_no(c.source_index)
                ));
                body.push_str(&match &c.comparison {
                    Stage::Done(v) => json_table(v, &["raw_response", "original_response"]),
                    Stage::Failed { error } => error_box(error, None),
                });
            }
        }
        Stage::Failed { error } => body.push_str(&error_box(error, None)),
    }
    body.push_str("</div>");
    layout("Comparison", "compare", &body)
}

fn source_cell(url: &str) -> String {
    let shown = escape(&truncate_text(url, 50));
    if url == DIRECT_INPUT {
        return shown;
    }
    format!(
        "<a href=\"/api/analyses/by-url?url={}\">{shown}</a>",
        urlencoding::encode(url)
    )
}

fn distribution(title: &str, counts: &std::collections::BTreeMap<String, usize>) -> String {
    let rows: String = counts
        .iter()
        .map(|(label, n)| format!("<tr><td>{}</td><td>{n}</td></tr>", escape(&humanize_label(label))))
        .collect();
    format!("<h3>{}</h3><table>{rows}</table>", escape(title))
}

pub fn history_page(records: &[AnalysisRecord], trends: &Trends) -> String {
    let mut body = String::from("<h1>Historical Analysis</h1>");
    if records.is_empty() {
        body.push_str("<div class=\"hint\">No previous analyses found. Analyze some articles first!</div>");
        return layout("History", "history", &body);
    }

    body.push_str(
        "<div class=\"card\"><h2>Recent Analyses</h2><table>\
         <tr><th>Timestamp</th><th>URL/Source</th><th>Content Preview</th><th>Credibility</th></tr>",
    );
    for record in records {
        body.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{:.2}</td></tr>",
            format_timestamp(&record.timestamp),
            source_cell(&record.url),
            escape(&truncate_text(&record.content, 100)),
            record.analysis.summary.credibility,
        ));
    }
    body.push_str("</table></div>");

    body.push_str("<div class=\"card\"><h2>Analysis Trends</h2><div class=\"metrics\">");
    body.push_str(&metric("Analyses", &trends.total_analyses.to_string()));
    if let Some(f) = trends.average_fact_percentage {
        body.push_str(&metric("Average Fact %", &format!("{f:.1}%")));
    }
    if let Some(c) = trends.average_credibility {
        body.push_str(&metric("Average Credibility", &format!("{c:.2}")));
    }
    body.push_str("</div>");
    body.push_str(&distribution("Sentiment", &trends.sentiment_distribution));
    body.push_str(&distribution("Political Bias", &trends.political_distribution));
    body.push_str("</div>");
    layout("History", "history", &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<b a="1">Tom & 'Jerry'</b>"#),
            "&lt;b a=&quot;1&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_error_box_with_suggestion() {
        let e = Error::SocialMediaUrl {
            domain: "x.com".into(),
        };
        let html = index_page(Some(&e), "https://x.com/a", "");
        assert!(html.contains("class=\"error\""));
        assert!(html.contains("Suggestion: Copy the tweet/post text"));
        assert!(html.contains("value=\"https://x.com/a\""));
    }

    #[test]
    fn test_json_table_hides_raw_fields() {
        let v = serde_json::json!({"political_bias": "neutral", "raw_response": "<junk>"});
        let html = json_table(&v, &["raw_response"]);
        assert!(html.contains("Political Bias"));
        assert!(!html.contains("junk"));
    }

    #[test]
    fn test_ai_tab_unavailable_hint() {
        let stage: Stage<LlmReport> = Stage::failed(Error::LlmUnavailable);
        let html = ai_tab(&stage);
        assert!(html.contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_history_empty_state() {
        let html = history_page(&[], &Trends::default());
        assert!(html.contains("No previous analyses found"));
    }

    #[test]
    fn test_source_cell_links_urls_only() {
        assert_eq!(source_cell(DIRECT_INPUT), DIRECT_INPUT);
        assert!(source_cell("https://a.example/x?y=1").contains("url=https%3A%2F%2Fa.example%2Fx%3Fy%3D1"));
    }
}
