//! Input resolution — literal text vs uploaded report image.
//!
//! Literal text wins when both are present and the text is non-blank.
//! A blank `text_input` next to a file falls through to the file.

use crate::error::RelayError;

/// An uploaded file as received from the caller.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// What the caller sent. Built by the HTTP layer from multipart, JSON or form bodies.
#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    pub text_input: Option<String>,
    pub file: Option<Upload>,
}

impl AnalysisRequest {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text_input: Some(text.into()),
            file: None,
        }
    }

    pub fn upload(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            text_input: None,
            file: Some(Upload {
                filename: filename.into(),
                bytes,
            }),
        }
    }
}

/// Which path the pipeline takes.
#[derive(Debug)]
pub enum ResolvedInput<'a> {
    /// Trimmed literal text; OCR is skipped.
    Text(String),
    /// File that must go through OCR.
    Upload(&'a Upload),
}

pub fn resolve_input(request: &AnalysisRequest) -> Result<ResolvedInput<'_>, RelayError> {
    if let Some(text) = request.text_input.as_deref() {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            log::info!("[INPUT] Literal text: {} chars", trimmed.len());
            return Ok(ResolvedInput::Text(trimmed.to_string()));
        }
    }

    if let Some(upload) = &request.file {
        log::info!(
            "[INPUT] Upload: {} ({} bytes)",
            upload.filename,
            upload.bytes.len()
        );
        return Ok(ResolvedInput::Upload(upload));
    }

    match request.text_input {
        Some(_) => Err(RelayError::EmptyInput),
        None => Err(RelayError::MissingInput),
    }
}
