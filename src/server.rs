//! HTTP surface — axum router, body decoding, CORS.
//!
//! `POST /analyze-report` accepts multipart (`file`, `text_input`), JSON
//! (`{"text_input": ...}`) or a urlencoded form. `GET /health` is liveness.

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, FromRequest, Multipart, Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::AppConfig;
use crate::error::RelayError;
use crate::input::{AnalysisRequest, Upload};
use crate::llm::AnalysisResult;
use crate::pipeline::Analyzer;

/// Shared across handlers. Immutable after startup.
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<Analyzer>,
}

impl AppState {
    pub fn new(analyzer: Analyzer) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
        }
    }
}

pub fn build_router(state: AppState, config: &AppConfig) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/analyze-report", post(analyze_report))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors_layer(&config.allowed_origins))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn analyze_report(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<AnalysisResult>, RelayError> {
    let analysis_request = read_analysis_request(request).await?;
    let result = state.analyzer.analyze(analysis_request).await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
struct TextPayload {
    text_input: Option<String>,
}

/// Decode the body according to its content type.
async fn read_analysis_request(request: Request) -> Result<AnalysisRequest, RelayError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| body_rejection(e.status(), e.body_text()))?;
        read_multipart(multipart).await
    } else if content_type.starts_with("application/json") {
        let Json(payload) = Json::<TextPayload>::from_request(request, &())
            .await
            .map_err(|e| body_rejection(e.status(), e.body_text()))?;
        Ok(text_request(payload))
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let Form(payload) = Form::<TextPayload>::from_request(request, &())
            .await
            .map_err(|e| body_rejection(e.status(), e.body_text()))?;
        Ok(text_request(payload))
    } else if content_type.is_empty() {
        // No body to speak of.
        Ok(AnalysisRequest::default())
    } else {
        Err(RelayError::InvalidRequest(format!(
            "unsupported content type: {}",
            content_type
        )))
    }
}

/// Extractor rejection → caller error. An oversized body keeps its 413.
fn body_rejection(status: StatusCode, message: String) -> RelayError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        RelayError::PayloadTooLarge
    } else {
        RelayError::InvalidRequest(message)
    }
}

fn text_request(payload: TextPayload) -> AnalysisRequest {
    AnalysisRequest {
        text_input: payload.text_input,
        file: None,
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<AnalysisRequest, RelayError> {
    let mut request = AnalysisRequest::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| body_rejection(e.status(), e.body_text()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("text_input") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| body_rejection(e.status(), e.body_text()))?;
                request.text_input = Some(text);
            }
            Some("file") => {
                let filename = field
                    .file_name()
                    .filter(|n| !n.is_empty())
                    .unwrap_or("upload")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| body_rejection(e.status(), e.body_text()))?;
                // Browsers send an empty part when no file was chosen.
                if bytes.is_empty() {
                    log::info!("[SERVER] Ignoring empty file part '{}'", filename);
                    continue;
                }
                request.file = Some(Upload {
                    filename,
                    bytes: bytes.to_vec(),
                });
            }
            other => log::debug!("[SERVER] Ignoring multipart field {:?}", other),
        }
    }

    Ok(request)
}

/// CORS from the configured allow-list. `*` opens it to any origin.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("[SERVER] Skipping invalid origin {:?}: {}", origin, e);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}
