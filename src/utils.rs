//! Utility functions for URLs, string shaping, rounding and the file system.
//!
//! This module provides helper functions used throughout the application:
//! - URL validation, domain extraction and source-type classification
//! - String truncation for previews and logging (always on char boundaries)
//! - Label humanization for the dashboard ("left_leaning" -> "Left Leaning")
//! - JSON error detection for handling LLM response truncation
//! - File system validation for export directories

use chrono::{DateTime, Utc};
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

use crate::error::Result;

const NEWS_DOMAINS: &[&str] = &[
    "bbc.com",
    "bbc.co.uk",
    "cnn.com",
    "reuters.com",
    "ap.org",
    "apnews.com",
    "npr.org",
    "theguardian.com",
    "nytimes.com",
    "washingtonpost.com",
    "timesofindia.com",
    "hindustantimes.com",
    "indianexpress.com",
];

/// Domains whose pages cannot be extracted without a logged-in session.
pub const SOCIAL_DOMAINS: &[&str] = &[
    "twitter.com",
    "x.com",
    "facebook.com",
    "instagram.com",
    "linkedin.com",
];

const BLOG_DOMAINS: &[&str] = &["medium.com", "wordpress.com", "blogspot.com", "substack.com"];

/// Check that `url` parses and carries both a scheme and a host.
pub fn is_valid_url(url: &str) -> bool {
    match Url::parse(url.trim()) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some()
        }
        Err(_) => false,
    }
}

/// Host part of `url`, lowercased, or an empty string when it does not parse.
pub fn extract_domain(url: &str) -> String {
    Url::parse(url.trim())
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
        .unwrap_or_default()
}

/// `true` when `domain` is `base` or one of its subdomains.
pub fn domain_matches(domain: &str, base: &str) -> bool {
    domain == base || domain.ends_with(&format!(".{base}"))
}

/// Classify a URL as `news`, `social`, `blog` or `other` from its domain.
pub fn classify_source_type(url: &str) -> &'static str {
    let domain = extract_domain(url);
    let any = |list: &[&str]| list.iter().any(|base| domain_matches(&domain, base));

    if any(NEWS_DOMAINS) {
        "news"
    } else if any(SOCIAL_DOMAINS) {
        "social"
    } else if any(BLOG_DOMAINS) {
        "blog"
    } else {
        "other"
    }
}

/// Format a timestamp for display.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Largest byte index `<= max` that sits on a char boundary of `s`.
fn floor_char_boundary(s: &str, max: usize) -> usize {
    if max >= s.len() {
        return s.len();
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    end
}

/// First `max_chars` characters of `s`, without any marker.
pub fn take_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Truncate text to `max_chars` characters, appending `...` when cut.
pub fn truncate_text(s: &str, max_chars: usize) -> String {
    let head = take_chars(s, max_chars);
    if head.len() == s.len() {
        s.to_string()
    } else {
        format!("{head}...")
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to roughly `max` bytes with an ellipsis and
/// byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log("a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let end = floor_char_boundary(s, max);
        format!("{}…(+{} bytes)", &s[..end], s.len() - end)
    }
}

/// Detect if a serde_json error indicates truncated/incomplete JSON.
///
/// When the LLM response is cut off (e.g., due to token limits), the
/// resulting JSON will fail to parse with an EOF error.
pub fn looks_truncated(e: &serde_json::Error) -> bool {
    use serde_json::error::Category;
    matches!(e.classify(), Category::Eof)
}

/// Capitalize the first character of a string.
pub fn upcase(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().collect::<String>() + c.as_str(),
    }
}

/// Turn a snake_case label into title case words.
///
/// ```ignore
/// assert_eq!(humanize_label("mostly_factual"), "Mostly Factual");
/// ```
pub fn humanize_label(label: &str) -> String {
    label
        .split('_')
        .filter(|w| !w.is_empty())
        .map(upcase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Round to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Whitespace-separated word count.
pub fn word_count(s: &str) -> usize {
    s.split_whitespace().count()
}

/// Ensure a directory exists and is writable.
///
/// This function creates the directory if it doesn't exist, then performs
/// a write test by creating and immediately deleting a marker file.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<()> {
    fs::create_dir_all(path).await?;
    // Try a small sync write using std fs (simpler error surface)
    let marker_path = format!("{}/..__write_check__", path.trim_end_matches('/'));
    stdfs::File::create(&marker_path)?;
    let _ = stdfs::remove_file(&marker_path);
    info!("Output directory is writable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_is_valid_url() {
        assert!(is_valid_url("https://example.com/news/story"));
        assert!(is_valid_url("  http://example.com  "));
        assert!(!is_valid_url("example.com/news"));
        assert!(!is_valid_url("ftp://example.com/file"));
        assert!(!is_valid_url(""));
    }

    #[test]
    fn test_extract_domain() {
        assert_eq!(extract_domain("https://WWW.BBC.com/news/1"), "www.bbc.com");
        assert_eq!(extract_domain("not a url"), "");
    }

    #[test]
    fn test_domain_matches_subdomains_only() {
        assert!(domain_matches("x.com", "x.com"));
        assert!(domain_matches("mobile.x.com", "x.com"));
        assert!(!domain_matches("box.com", "x.com"));
    }

    #[test]
    fn test_classify_source_type() {
        assert_eq!(classify_source_type("https://www.reuters.com/world/"), "news");
        assert_eq!(classify_source_type("https://twitter.com/someone/status/1"), "social");
        assert_eq!(classify_source_type("https://someone.medium.com/post"), "blog");
        assert_eq!(classify_source_type("https://example.org"), "other");
        assert_eq!(classify_source_type("direct_input"), "other");
    }

    #[test]
    fn test_truncate_text_is_char_safe() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("abcdef", 3), "abc...");
        assert_eq!(truncate_text("ééééé", 2), "éé...");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
        // multi-byte input must not panic
        let _ = truncate_for_log(&"é".repeat(100), 3);
    }

    #[test]
    fn test_humanize_label() {
        assert_eq!(humanize_label("left_leaning"), "Left Leaning");
        assert_eq!(humanize_label("neutral"), "Neutral");
        assert_eq!(humanize_label(""), "");
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(66.666, 1), 66.7);
        assert_eq!(round_to(0.12345, 3), 0.123);
    }

    #[test]
    fn test_format_timestamp() {
        let ts = Utc.with_ymd_and_hms(2025, 5, 6, 14, 30, 0).unwrap();
        assert_eq!(format_timestamp(&ts), "2025-05-06 14:30:00");
    }

    #[test]
    fn test_looks_truncated() {
        let json_eof = r#"{"field": "value"#;
        let result: std::result::Result<serde_json::Value, _> = serde_json::from_str(json_eof);
        assert!(looks_truncated(&result.unwrap_err()));
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a/b/c");
        ensure_writable_dir(nested.to_str().unwrap()).await.unwrap();
        assert!(nested.is_dir());
    }
}
