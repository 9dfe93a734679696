//! Article markup parsing.
//!
//! Everything here is synchronous: the fetched body is parsed into a
//! [`ParsedPage`] in one go so no `scraper::Html` lives across an await.

use chrono::{DateTime, NaiveDate, Utc};
use itertools::Itertools;
use scraper::{ElementRef, Html, Node, Selector};
use serde_json::Value;
use tracing::{debug, info};

/// Containers tried, in order, for `<p>` paragraphs of the article body.
const BODY_SELECTORS: &[&str] = &["article p", "[itemprop=\"articleBody\"] p", "main p"];

/// Class fragments that mark the main content block in fallback extraction.
const CONTENT_CLASS_HINTS: &[&str] = &["content", "article", "story", "post"];

const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPage {
    pub title: String,
    pub content: String,
    pub authors: Vec<String>,
    pub publish_date: Option<DateTime<Utc>>,
    /// The body came from the class-hint or whole-page fallback.
    pub used_fallback: bool,
}

fn select_all<'a>(doc: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => doc.select(&selector).collect(),
        Err(e) => {
            debug!(%css, error = %e, "Invalid selector");
            Vec::new()
        }
    }
}

fn first_attr(doc: &Html, css: &str, attr: &str) -> Option<String> {
    select_all(doc, css)
        .into_iter()
        .filter_map(|el| el.value().attr(attr))
        .map(normalize_whitespace)
        .find(|v| !v.is_empty())
}

fn first_text(doc: &Html, css: &str) -> Option<String> {
    select_all(doc, css)
        .into_iter()
        .map(visible_text)
        .find(|v| !v.is_empty())
}

/// Collapse runs of whitespace into single spaces.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().join(" ")
}

/// Text of `element` with script and style contents left out.
pub fn visible_text(element: ElementRef<'_>) -> String {
    let pieces = element.descendants().filter_map(|node| {
        let Node::Text(text) = node.value() else {
            return None;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| HIDDEN_TAGS.contains(&e.name()))
        });
        (!hidden).then_some(&**text)
    });
    normalize_whitespace(&pieces.collect::<Vec<_>>().join(" "))
}

fn extract_title(doc: &Html) -> String {
    first_attr(doc, "meta[property=\"og:title\"]", "content")
        .or_else(|| first_text(doc, "title"))
        .or_else(|| first_text(doc, "h1"))
        .unwrap_or_default()
}

fn extract_authors(doc: &Html) -> Vec<String> {
    let from_meta = select_all(doc, "meta[name=\"author\"], meta[property=\"article:author\"]")
        .into_iter()
        .filter_map(|el| el.value().attr("content").map(normalize_whitespace));
    let from_links = select_all(doc, "[rel=\"author\"]")
        .into_iter()
        .map(visible_text);

    from_meta
        .chain(from_links)
        .filter(|a| !a.is_empty() && !a.starts_with("http"))
        .unique_by(|a| a.to_lowercase())
        .collect()
}

/// RFC 3339 timestamps or bare `YYYY-MM-DD` dates (taken as midnight UTC).
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let day = raw.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn json_ld_date(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => map
            .get("datePublished")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| map.get("@graph").and_then(json_ld_date)),
        Value::Array(items) => items.iter().find_map(json_ld_date),
        _ => None,
    }
}

fn extract_publish_date(doc: &Html) -> Option<DateTime<Utc>> {
    let candidates = [
        first_attr(doc, "meta[property=\"article:published_time\"]", "content"),
        first_attr(doc, "time[datetime]", "datetime"),
    ];
    candidates
        .into_iter()
        .flatten()
        .find_map(|raw| parse_date(&raw))
        .or_else(|| {
            select_all(doc, "script[type=\"application/ld+json\"]")
                .into_iter()
                .filter_map(|el| serde_json::from_str::<Value>(&el.inner_html()).ok())
                .filter_map(|v| json_ld_date(&v))
                .find_map(|raw| parse_date(&raw))
        })
}

fn extract_paragraphs(doc: &Html) -> String {
    for css in BODY_SELECTORS {
        let paragraphs: Vec<String> = select_all(doc, css)
            .into_iter()
            .map(visible_text)
            .filter(|p| !p.is_empty())
            .collect();
        if !paragraphs.is_empty() {
            return paragraphs.join("\n\n");
        }
    }
    String::new()
}

/// First `article`/`div` whose class mentions a content hint, else the whole body.
fn fallback_content(doc: &Html) -> String {
    let hinted = select_all(doc, "article[class], div[class]")
        .into_iter()
        .find(|el| {
            el.value().attr("class").is_some_and(|class| {
                let class = class.to_lowercase();
                CONTENT_CLASS_HINTS.iter().any(|hint| class.contains(hint))
            })
        });
    match hinted {
        Some(el) => visible_text(el),
        None => first_text(doc, "body").unwrap_or_default(),
    }
}

/// Title, body, authors and publish date of an article page.
pub fn parse_article(html: &str) -> ParsedPage {
    let doc = Html::parse_document(html);
    let mut content = extract_paragraphs(&doc);
    let used_fallback = content.is_empty();
    if used_fallback {
        content = fallback_content(&doc);
    }

    let page = ParsedPage {
        title: extract_title(&doc),
        content,
        authors: extract_authors(&doc),
        publish_date: extract_publish_date(&doc),
        used_fallback,
    };
    info!(
        bytes = page.content.len(),
        authors = page.authors.len(),
        fallback = page.used_fallback,
        "Parsed article"
    );
    page
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const STORY: &str = r#"
<html><head>
  <title>Fallback title</title>
  <meta property="og:title" content="Council Approves  Budget">
  <meta name="author" content="Jane Roe">
  <meta property="article:published_time" content="2024-03-05T14:30:00Z">
  <script>var tracking = "ignore me";</script>
</head><body>
  <a rel="author" href="/staff/jane">Jane Roe</a>
  <a rel="author" href="/staff/sam">Sam Poe</a>
  <article>
    <h1>Council Approves Budget</h1>
    <p>The council approved the budget on Monday.</p>
    <p>Officials said   spending rises 4%.<script>alert(1)</script></p>
    <p>   </p>
  </article>
</body></html>"#;

    #[test]
    fn test_primary_extraction() {
        let page = parse_article(STORY);
        assert_eq!(page.title, "Council Approves Budget");
        assert_eq!(
            page.content,
            "The council approved the budget on Monday.\n\nOfficials said spending rises 4%."
        );
        assert_eq!(page.authors, vec!["Jane Roe", "Sam Poe"]);
        assert_eq!(
            page.publish_date,
            Some(Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap())
        );
        assert!(!page.used_fallback);
    }

    #[test]
    fn test_fallback_uses_content_class() {
        let html = r#"<html><head><title> Plain page </title></head><body>
            <div class="nav">Home | About</div>
            <div class="Story-Body">Storm hits coast. <style>.x{}</style>Residents evacuated.</div>
        </body></html>"#;
        let page = parse_article(html);
        assert!(page.used_fallback);
        assert_eq!(page.title, "Plain page");
        assert_eq!(page.content, "Storm hits coast. Residents evacuated.");
    }

    #[test]
    fn test_fallback_to_body_text() {
        let html = "<html><body><span>Just some text</span><script>x()</script></body></html>";
        let page = parse_article(html);
        assert_eq!(page.content, "Just some text");
        assert!(page.authors.is_empty());
        assert!(page.publish_date.is_none());
    }

    #[test]
    fn test_json_ld_date() {
        let html = r#"<html><head><script type="application/ld+json">
            {"@graph": [{"@type": "WebPage"}, {"@type": "NewsArticle", "datePublished": "2023-11-02"}]}
        </script></head><body><article><p>Body</p></article></body></html>"#;
        let page = parse_article(html);
        assert_eq!(
            page.publish_date,
            Some(Utc.with_ymd_and_hms(2023, 11, 2, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_date_variants() {
        assert!(parse_date("2024-01-02T03:04:05+02:00").is_some());
        assert!(parse_date("2024-01-02T03:04:05").is_some());
        assert!(parse_date("yesterday").is_none());
    }
}
