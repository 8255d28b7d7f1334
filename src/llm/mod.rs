//! LLM domain — prompt building, Gemini completion, output sanitizing.
//!
//! Public API used by the pipeline:
//!   - prompts.rs  — ANALYZE / NARRATIVE templates
//!   - gemini.rs   — `CompletionClient` trait + Gemini implementation
//!   - sanitize.rs — fence stripping + JSON object recovery
//!   - types.rs    — `AnalysisResult`

pub mod gemini;
pub mod prompts;
pub mod sanitize;
pub mod types;

pub use gemini::{CompletionClient, GeminiClient};
pub use sanitize::{sanitize, Unparseable};
pub use types::AnalysisResult;
