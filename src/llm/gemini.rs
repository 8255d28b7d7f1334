//! Gemini completion client — non-streaming `generateContent`.
//!
//! Key differences from the usual bearer-token APIs:
//! - API key goes in the URL query param, not a header
//! - Generated text lives at `candidates[0].content.parts[0].text`
//!
//! The key is checked before any network call. Missing response fields
//! yield an empty string; the sanitizer reports that as unparseable.

use async_trait::async_trait;
use serde_json::Value;

use crate::config::AppConfig;
use crate::error::RelayError;

pub const GEMINI_TEMPERATURE: f64 = 0.2;

/// "Submit prompt, get generated text."
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, RelayError>;
}

pub struct GeminiClient {
    client: reqwest::Client,
    api_key: Option<String>,
    api_base: String,
    model: String,
}

impl GeminiClient {
    pub fn new(config: &AppConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.completion_timeout)
            .build()?;
        Ok(Self {
            client,
            api_key: config.gemini_api_key.clone(),
            api_base: config.gemini_api_base.clone(),
            model: config.gemini_model.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }
}

#[async_trait]
impl CompletionClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, RelayError> {
        let api_key = match self.api_key.as_deref() {
            Some(key) => key,
            None => {
                log::warn!("[LLM] No GEMINI_API_KEY set — refusing completion call");
                return Err(RelayError::CompletionAuthMissing);
            }
        };

        log::info!("[LLM] Model: {}", self.model);
        log::info!("[LLM] Prompt: {} chars", prompt.len());
        let start = std::time::Instant::now();

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", api_key)])
            .header("content-type", "application/json")
            .json(&serde_json::json!({
                "contents": [
                    {
                        "parts": [
                            {
                                "text": prompt
                            }
                        ]
                    }
                ],
                "generationConfig": {
                    "temperature": GEMINI_TEMPERATURE
                }
            }))
            .send()
            .await
            .map_err(completion_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(completion_transport_error)?;
        log::info!("[LLM] API latency: {}ms", start.elapsed().as_millis());

        if !status.is_success() {
            log::error!("[LLM] Gemini API returned {}: {}", status, body);
            return Err(RelayError::CompletionServiceFailed {
                status: Some(status.as_u16()),
                body,
            });
        }

        let json: Value = serde_json::from_str(&body).unwrap_or_else(|e| {
            log::warn!("[LLM] Response is not JSON: {}", e);
            Value::Null
        });

        if let Some(usage) = json.get("usageMetadata") {
            log::info!(
                "[LLM] Input tokens: {}, output tokens: {}",
                usage["promptTokenCount"].as_u64().unwrap_or(0),
                usage["candidatesTokenCount"].as_u64().unwrap_or(0)
            );
        }

        let text = extract_candidate_text(&json);
        log::info!("[LLM] Generated {} chars", text.len());
        Ok(text)
    }
}

/// The request URL carries the API key, so it is dropped before the error
/// is logged or handed back to the caller.
fn completion_transport_error(e: reqwest::Error) -> RelayError {
    let e = e.without_url();
    if e.is_timeout() {
        log::error!("[LLM] Timed out: {}", e);
        RelayError::CompletionTimeout
    } else {
        log::error!("[LLM] HTTP request failed: {}", e);
        RelayError::CompletionServiceFailed {
            status: None,
            body: e.to_string(),
        }
    }
}

/// `candidates[0].content.parts[0].text`, or `""` if any step is missing.
pub fn extract_candidate_text(json: &Value) -> String {
    json.get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.get(0))
        .and_then(|p| p.get("text"))
        .and_then(|t| t.as_str())
        .unwrap_or_default()
        .to_string()
}
