//! Report shape heuristics for extracted text.
//!
//! Counts result rows (a test name followed by a numeric value) and
//! explicit lab flags like `H`, `L`, `(High)`. These signals are logged
//! and turned into a one-line hint for the model.

use std::sync::LazyLock;

use regex::Regex;

/// `<name> <value>`: a name starting with a letter, then a number, optionally
/// with a comparison prefix (`<5`, `>200`).
static RESULT_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9 ,()/%.\-]*?[\s:]+[<>]?=?\s*\d+(?:[.,]\d+)?")
        .expect("result row pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportShape {
    pub non_blank_lines: usize,
    pub result_rows: usize,
    pub flag_markers: usize,
}

impl ReportShape {
    /// Most lines look like `<test> <value>` rows.
    pub fn looks_tabular(&self) -> bool {
        self.result_rows >= 2 && self.result_rows * 2 >= self.non_blank_lines
    }
}

pub fn inspect(text: &str) -> ReportShape {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    ReportShape {
        non_blank_lines: lines.len(),
        result_rows: lines.iter().filter(|l| RESULT_ROW.is_match(l)).count(),
        flag_markers: text.split_whitespace().filter(|t| is_flag_token(t)).count(),
    }
}

/// `H`, `L`, `HH`, `LL`, `High`, `Low`, optionally wrapped in `()`, `[]` or `*`.
fn is_flag_token(token: &str) -> bool {
    let core = token.trim_matches(|c: char| matches!(c, '(' | ')' | '[' | ']' | '*' | ',' | ';'));
    matches!(core, "H" | "L" | "HH" | "LL")
        || core.eq_ignore_ascii_case("high")
        || core.eq_ignore_ascii_case("low")
}
