//! Model output cleanup — fence stripping + forgiving JSON recovery.
//!
//! Gemini is asked for bare JSON but routinely wraps it in ```json fences
//! or adds a sentence before/after. Recovery is two pure steps:
//!   1. parse the whole (fence-stripped, trimmed) text
//!   2. parse the span from the first `{` to the last `}`
//!
//! This is a heuristic, not a tokenizer. Unbalanced braces inside string
//! literals can still defeat step 2; the caller gets `Unparseable` then.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

/// Opening (with optional `json` tag) or closing fence, anywhere, any case.
static FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)```(?:json)?").expect("fence pattern is valid")
});

/// The model reply could not be turned into a JSON object.
///
/// `raw` is the fence-stripped, trimmed text, kept verbatim for diagnosis.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no JSON object found in model output ({} chars)", raw.len())]
pub struct Unparseable {
    pub raw: String,
}

/// Remove every fence marker. Unpaired fences are removed too.
pub fn strip_code_fences(text: &str) -> String {
    FENCE.replace_all(text, "").into_owned()
}

/// Step 1: the whole string is a JSON object.
pub fn parse_direct(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Step 2: the outermost `{ ... }` span is a JSON object.
pub fn parse_brace_span(text: &str) -> Option<Map<String, Value>> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    parse_direct(&text[start..=end])
}

/// Recover a JSON object from raw model output.
pub fn sanitize(raw: &str) -> Result<Map<String, Value>, Unparseable> {
    let stripped = strip_code_fences(raw);
    let cleaned = stripped.trim();

    if let Some(map) = parse_direct(cleaned) {
        return Ok(map);
    }
    if let Some(map) = parse_brace_span(cleaned) {
        log::info!("[SANITIZE] Recovered JSON from surrounding prose");
        return Ok(map);
    }

    log::warn!("[SANITIZE] Unparseable model output: {}", preview(cleaned, 200));
    Err(Unparseable {
        raw: cleaned.to_string(),
    })
}

/// Leading slice of `text` for log lines, cut on a char boundary.
pub(crate) fn preview(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fenced_object_round_trips() {
        let original = json!({
            "categories": {
                "Complete Blood Count": [
                    {"test": "Hemoglobin", "value": "10.2", "status": "Low"}
                ]
            },
            "overall_summary": "Mild anemia."
        });
        let wrapped = format!("```json\n{}\n```", serde_json::to_string_pretty(&original).unwrap());
        let map = sanitize(&wrapped).unwrap();
        assert_eq!(Value::Object(map), original);
    }

    #[test]
    fn uppercase_fence_tag_is_stripped() {
        let map = sanitize("```JSON\n{\"a\": 1}\n```").unwrap();
        assert_eq!(map["a"], json!(1));
    }

    #[test]
    fn unpaired_fence_is_stripped() {
        let map = sanitize("```json\n{\"a\": 1}").unwrap();
        assert_eq!(map["a"], json!(1));
        let map = sanitize("{\"a\": 2}\n```").unwrap();
        assert_eq!(map["a"], json!(2));
    }

    #[test]
    fn prose_wrapped_json_is_recovered() {
        let map = sanitize("Here is the result:\n{\"a\":1}\nThanks.").unwrap();
        assert_eq!(Value::Object(map), json!({"a": 1}));
    }

    #[test]
    fn nested_braces_use_outermost_span() {
        let map = sanitize("Result: {\"a\": {\"b\": {\"c\": 3}}} done").unwrap();
        assert_eq!(map["a"]["b"]["c"], json!(3));
    }

    #[test]
    fn plain_text_is_unparseable_with_raw() {
        let err = sanitize("  No JSON here at all \n").unwrap_err();
        assert_eq!(err.raw, "No JSON here at all");
    }

    #[test]
    fn empty_output_is_unparseable_not_empty_object() {
        let err = sanitize("").unwrap_err();
        assert_eq!(err.raw, "");
        let err = sanitize("```json\n```").unwrap_err();
        assert_eq!(err.raw, "");
    }

    #[test]
    fn failure_is_idempotent() {
        let first = sanitize("```json\nnot json } {\n```").unwrap_err();
        let second = sanitize(&first.raw).unwrap_err();
        assert_eq!(first, second);
    }

    #[test]
    fn top_level_array_is_rejected() {
        assert!(sanitize("[1, 2, 3]").is_err());
    }

    #[test]
    fn reversed_braces_are_rejected() {
        assert!(parse_brace_span("} nothing {").is_none());
    }

    #[test]
    fn stray_closing_brace_in_prose_fails() {
        // The last `}` is outside the object, so the span is not valid JSON.
        assert!(sanitize("{\"a\": 1} and a stray }").is_err());
    }
}
