//! Turning free-form model output into a JSON object.
//!
//! Models asked for "JSON only" still wrap it in fences, add a preamble, or
//! get cut off by the token limit. [`parse_llm_response`] tries, in order:
//!
//! 1. strip markdown fences
//! 2. parse the whole response
//! 3. parse the first brace-balanced block (one level of nesting)
//! 4. append missing closing braces and parse again
//! 5. pull known keys out with regexes (`parsing_method = regex_extraction`)
//! 6. give up with a structured fallback (`parsing_method = fallback`)

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::error::{Error, Result};
use crate::utils::{looks_truncated, take_chars};

static JSON_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{[^{}]*(?:\{[^{}]*\}[^{}]*)*\}").expect("JSON block pattern is valid")
});

static KEY_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("political_bias", r#""political_bias":\s*"([^"]+)""#),
        ("political_confidence", r#""political_confidence":\s*([0-9.]+)"#),
        ("emotional_bias", r#""emotional_bias":\s*"([^"]+)""#),
        ("emotional_confidence", r#""emotional_confidence":\s*([0-9.]+)"#),
        ("overall_classification", r#""overall_classification":\s*"([^"]+)""#),
        ("confidence", r#""confidence":\s*([0-9.]+)"#),
        ("explanation", r#""explanation":\s*"([^"]*)""#),
        ("reasoning", r#""reasoning":\s*"([^"]*)""#),
    ]
    .into_iter()
    .map(|(key, pattern)| (key, Regex::new(pattern).expect("key pattern is valid")))
    .collect()
});

fn strip_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn parse_object(candidate: &str) -> std::result::Result<Value, serde_json::Error> {
    serde_json::from_str::<Value>(candidate).and_then(|v| {
        if v.is_object() {
            Ok(v)
        } else {
            Err(serde::de::Error::custom("top-level value is not an object"))
        }
    })
}

fn close_braces(content: &str) -> Option<String> {
    let open = content.matches('{').count();
    let close = content.matches('}').count();
    (open > close).then(|| format!("{content}{}", "}".repeat(open - close)))
}

fn number_or_text(raw: &str) -> Value {
    match raw.parse::<f64>() {
        Ok(n) => json!(n),
        Err(_) => Value::String(raw.to_string()),
    }
}

fn extract_known_keys(content: &str) -> Option<Value> {
    let mut out = Map::new();
    for (key, re) in KEY_PATTERNS.iter() {
        if let Some(caps) = re.captures(content) {
            out.insert((*key).to_string(), number_or_text(&caps[1]));
        }
    }
    if out.is_empty() {
        return None;
    }
    out.insert("parsing_method".into(), json!("regex_extraction"));
    out.insert("original_response".into(), json!(take_chars(content, 200)));
    Some(Value::Object(out))
}

/// Parse a model response into a JSON object; only an empty response is an error.
pub fn parse_llm_response(content: &str) -> Result<Value> {
    if content.trim().is_empty() {
        return Err(Error::EmptyLlmResponse);
    }
    let content = strip_fences(content);

    match parse_object(content) {
        Ok(v) => return Ok(v),
        Err(e) => debug!(error = %e, truncated = looks_truncated(&e), "Direct JSON parse failed"),
    }

    if let Some(v) = JSON_BLOCK
        .find_iter(content)
        .find_map(|m| parse_object(m.as_str()).ok())
    {
        return Ok(v);
    }

    if let Some(v) = close_braces(content).and_then(|fixed| parse_object(&fixed).ok()) {
        return Ok(v);
    }

    if let Some(v) = extract_known_keys(content) {
        return Ok(v);
    }

    Ok(json!({
        "analysis": "LLM analysis completed but response format was unclear",
        "confidence": 0.5,
        "parsing_method": "fallback",
        "raw_response": take_chars(content, 300),
        "note": "Response could not be parsed as JSON",
        "status": "completed_with_issues",
    }))
}
