//! OCR domain — forwards uploaded report images to the external OCR service.
//!
//! The pipeline only sees the `TextRecognizer` trait; `HttpOcrClient` is
//! the production implementation. External code should use `extract_text`
//! to turn recognized lines into the text handed to the prompt builder.

pub mod heuristics;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::AppConfig;
use crate::error::RelayError;

/// "Submit bytes, get recognized lines."
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, filename: &str, bytes: Vec<u8>) -> Result<Vec<String>, RelayError>;
}

/// Multipart client for the OCR HTTP service.
pub struct HttpOcrClient {
    client: reqwest::Client,
    url: String,
    lines_field: String,
}

impl HttpOcrClient {
    pub fn new(config: &AppConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.ocr_timeout)
            .build()?;
        Ok(Self {
            client,
            url: config.ocr_url.clone(),
            lines_field: config.ocr_lines_field.clone(),
        })
    }
}

#[async_trait]
impl TextRecognizer for HttpOcrClient {
    async fn recognize(&self, filename: &str, bytes: Vec<u8>) -> Result<Vec<String>, RelayError> {
        let start = std::time::Instant::now();
        let mime = mime_guess::from_path(filename).first_or_octet_stream();
        log::info!("[OCR] POST {} ({} bytes, {})", self.url, bytes.len(), mime);

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mime.essence_str())
            .map_err(|e| RelayError::ServerError(format!("invalid upload mime type: {}", e)))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(ocr_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(ocr_transport_error)?;
        log::info!("[OCR] {} in {}ms", status, start.elapsed().as_millis());

        if !status.is_success() {
            log::error!("[OCR] Service returned {}: {}", status, body);
            return Err(RelayError::OcrServiceFailed {
                status: Some(status.as_u16()),
                body,
            });
        }

        let json: Value = match serde_json::from_str(&body) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("[OCR] Response is not JSON ({}), treating as no lines", e);
                Value::Null
            }
        };
        let lines = lines_from_response(&json, &self.lines_field);
        log::info!("[OCR] {} lines in '{}'", lines.len(), self.lines_field);
        Ok(lines)
    }
}

fn ocr_transport_error(e: reqwest::Error) -> RelayError {
    if e.is_timeout() {
        log::error!("[OCR] Timed out: {}", e);
        RelayError::OcrTimeout
    } else {
        log::error!("[OCR] HTTP request failed: {}", e);
        RelayError::OcrServiceFailed {
            status: None,
            body: e.to_string(),
        }
    }
}

/// Read `field` as a list of strings. Absent or malformed → empty;
/// non-string entries are skipped.
pub fn lines_from_response(json: &Value, field: &str) -> Vec<String> {
    json.get(field)
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Join recognized lines into the report text, one line per row.
///
/// The OCR engine pads rows with whitespace and emits blank rows between
/// table sections, so each line is trimmed and blank ones are dropped
/// before joining with `\n`. Nothing left is `OcrEmptyResult`.
pub fn extract_text(lines: &[String]) -> Result<String, RelayError> {
    let text = lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    if text.is_empty() {
        return Err(RelayError::OcrEmptyResult);
    }
    Ok(text)
}
