//! Report analysis pipeline.
//!
//! resolve input → (stage upload → OCR) → build prompt → complete →
//! sanitize → (optional narrative). Strictly sequential per request: the
//! completion prompt depends on the OCR output. No stage is retried.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::RelayError;
use crate::input::{resolve_input, AnalysisRequest, ResolvedInput};
use crate::llm::{self, prompts, AnalysisResult, CompletionClient, GeminiClient};
use crate::ocr::{self, HttpOcrClient, TextRecognizer};
use crate::upload::StagedUpload;

pub struct Analyzer {
    ocr: Arc<dyn TextRecognizer>,
    completion: Arc<dyn CompletionClient>,
    upload_dir: PathBuf,
    narrative_summary: bool,
}

impl Analyzer {
    pub fn new(
        config: &AppConfig,
        ocr: Arc<dyn TextRecognizer>,
        completion: Arc<dyn CompletionClient>,
    ) -> Self {
        Self {
            ocr,
            completion,
            upload_dir: config.upload_dir.clone(),
            narrative_summary: config.narrative_summary,
        }
    }

    /// Production wiring: HTTP OCR client + Gemini.
    pub fn from_config(config: &AppConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(
            config,
            Arc::new(HttpOcrClient::new(config)?),
            Arc::new(GeminiClient::new(config)?),
        ))
    }

    /// Analyze one report. On failure nothing partial is returned.
    pub async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResult, RelayError> {
        let pipeline_start = std::time::Instant::now();

        let input_text = match resolve_input(&request)? {
            ResolvedInput::Text(text) => text,
            ResolvedInput::Upload(upload) => {
                let staged = StagedUpload::stage(&self.upload_dir, upload).await?;
                let text = self.recognize_staged(&staged).await;
                staged.release();
                text?
            }
        };
        let input_ms = pipeline_start.elapsed().as_millis();

        let prompt = prompts::build_analysis_prompt(&input_text);
        let llm_start = std::time::Instant::now();
        let raw = self.completion.complete(&prompt).await?;
        let llm_ms = llm_start.elapsed().as_millis();

        let summary = llm::sanitize(&raw)?;
        log::info!("[PIPELINE] Summary keys: {}", summary.len());

        let mut result = AnalysisResult::ok(input_text, summary);
        if self.narrative_summary {
            let narrative = self.narrate(&result).await?;
            result.narrative = Some(narrative);
        }

        log::info!(
            "[PIPELINE] Total: {}ms (input={} + completion={})",
            pipeline_start.elapsed().as_millis(),
            input_ms,
            llm_ms
        );
        Ok(result)
    }

    async fn recognize_staged(&self, staged: &StagedUpload) -> Result<String, RelayError> {
        let bytes = staged.read().await?;
        let lines = self.ocr.recognize(staged.filename(), bytes).await?;
        let text = ocr::extract_text(&lines)?;
        log::info!("[OCR] Extracted {} chars", text.len());
        Ok(text)
    }

    /// Second completion call: summary JSON → one plain-language paragraph.
    async fn narrate(&self, result: &AnalysisResult) -> Result<String, RelayError> {
        let prompt = prompts::build_narrative_prompt(&result.summary);
        let raw = self.completion.complete(&prompt).await?;
        let paragraph = llm::sanitize::strip_code_fences(&raw).trim().to_string();
        if paragraph.is_empty() {
            log::warn!("[LLM] Narrative call returned no text");
            return Err(RelayError::ModelOutputUnparseable { raw: paragraph });
        }
        log::info!("[LLM] Narrative: {} chars", paragraph.len());
        Ok(paragraph)
    }
}
