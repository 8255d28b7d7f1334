//! Response types returned to the caller.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const STATUS_OK: &str = "ok";

/// Successful analysis of one report.
///
/// `summary` is whatever JSON object the model produced; its shape is
/// requested by the prompt but not enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub input_text: String,
    pub summary: Map<String, Value>,
    pub status: String,
    /// Plain-language paragraph from the optional second completion call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
}

impl AnalysisResult {
    pub fn ok(input_text: String, summary: Map<String, Value>) -> Self {
        Self {
            input_text,
            summary,
            status: STATUS_OK.to_string(),
            narrative: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_without_narrative_when_absent() {
        let summary = json!({"summary": "low hemoglobin"}).as_object().unwrap().clone();
        let result = AnalysisResult::ok("Hemoglobin 10.2 (Low)".into(), summary);
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "input_text": "Hemoglobin 10.2 (Low)",
                "summary": {"summary": "low hemoglobin"},
                "status": "ok"
            })
        );
    }

    #[test]
    fn narrative_is_included_when_present() {
        let mut result = AnalysisResult::ok("TSH 2.1".into(), Map::new());
        result.narrative = Some("All normal.".into());
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["narrative"], json!("All normal."));
    }
}
