//! LLM prompt templates for lab report analysis.
//!
//! These templates are the contract between the relay and the model. The
//! model is not guaranteed to honor the shape; the sanitizer only promises
//! a JSON object back.

use crate::ocr::heuristics;

/// Buckets the model must sort tests into.
pub const LAB_CATEGORIES: [&str; 9] = [
    "Complete Blood Count",
    "Lipid Profile",
    "Liver Function",
    "Kidney Function",
    "Thyroid Function",
    "Blood Sugar",
    "Electrolytes",
    "Vitamins & Minerals",
    "Other",
];

/// ANALYZE instructions. `{categories}` and `{report}` are filled in by
/// `build_analysis_prompt`.
const ANALYSIS_PROMPT: &str = r#"You are a medical lab report assistant. You receive the text of a lab report, typed by a user or extracted by OCR, and explain it to a non-specialist.

<rules>
1. Identify every lab test in the report, with its value, unit and reference range when present.
2. Put each test into exactly ONE of these categories: {categories}.
3. Give each test a status of "High", "Low" or "Normal" by comparing the value with its reference range. If no range is given, use common adult reference ranges.
4. Give each test a short explanation (max 30 words) in plain language.
5. Do not diagnose. Do not invent tests that are not in the report.
6. Respond with ONLY the JSON object below. No commentary, no markdown, no code fences.
</rules>

<response_format>
{
  "categories": {
    "<category name>": [
      {
        "test": "<test name>",
        "value": "<value as written>",
        "unit": "<unit or empty string>",
        "reference_range": "<range or empty string>",
        "status": "High" | "Low" | "Normal",
        "explanation": "<plain-language explanation>"
      }
    ]
  },
  "abnormal_count": <number of tests that are High or Low>,
  "overall_summary": "<two or three sentences summarizing the report>"
}
Omit categories that have no tests.
</response_format>
{hint}
<lab_report>
{report}
</lab_report>"#;

/// NARRATIVE instructions: structured summary JSON → one paragraph.
const NARRATIVE_PROMPT: &str = r#"You are a medical lab report assistant. Below is a structured JSON summary of a patient's lab results.

Write ONE short paragraph (max 120 words) in plain, calm language that tells the patient which results are outside the normal range and what they generally relate to. Mention that a doctor should interpret the results. Respond with the paragraph only: no JSON, no markdown, no headings.

<summary_json>
{summary}
</summary_json>"#;

/// Build the ANALYZE prompt for `report`.
///
/// Deterministic: the same text always yields the same prompt.
pub fn build_analysis_prompt(report: &str) -> String {
    let shape = heuristics::inspect(report);
    let hint = if shape.looks_tabular() {
        format!(
            "\n<report_hint>The report looks tabular: about {} result rows, {} values flagged by the lab.</report_hint>\n",
            shape.result_rows, shape.flag_markers
        )
    } else {
        String::new()
    };

    ANALYSIS_PROMPT
        .replace("{categories}", &quoted_categories())
        .replace("{hint}", &hint)
        .replace("{report}", report)
}

/// Build the NARRATIVE prompt for an already-sanitized summary.
pub fn build_narrative_prompt(summary: &serde_json::Map<String, serde_json::Value>) -> String {
    let json = serde_json::to_string_pretty(summary).unwrap_or_else(|_| "{}".to_string());
    NARRATIVE_PROMPT.replace("{summary}", &json)
}

fn quoted_categories() -> String {
    LAB_CATEGORIES
        .iter()
        .map(|c| format!("\"{}\"", c))
        .collect::<Vec<_>>()
        .join(", ")
}
