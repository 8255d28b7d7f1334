//! Request-scoped error taxonomy and its HTTP mapping.
//!
//! Every stage of the pipeline fails with one of these kinds. The HTTP
//! layer turns them into `{ error, details?, raw? }` bodies; nothing here
//! is ever retried.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::llm::sanitize::{preview, Unparseable};

/// Everything that can go wrong while analyzing one report.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("no text_input or file provided")]
    MissingInput,

    #[error("text_input is empty")]
    EmptyInput,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("request body exceeds the upload size limit")]
    PayloadTooLarge,

    #[error("OCR service failed")]
    OcrServiceFailed {
        status: Option<u16>,
        body: String,
    },

    #[error("OCR service timed out")]
    OcrTimeout,

    #[error("OCR found no text in the uploaded file")]
    OcrEmptyResult,

    #[error("completion API key is not configured")]
    CompletionAuthMissing,

    #[error("completion service failed")]
    CompletionServiceFailed {
        status: Option<u16>,
        body: String,
    },

    #[error("completion service timed out")]
    CompletionTimeout,

    #[error("model output is not valid JSON")]
    ModelOutputUnparseable { raw: String },

    #[error("internal server error: {0}")]
    ServerError(String),
}

impl From<Unparseable> for RelayError {
    fn from(e: Unparseable) -> Self {
        RelayError::ModelOutputUnparseable { raw: e.raw }
    }
}

/// JSON body sent to the caller on failure.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::MissingInput | RelayError::EmptyInput | RelayError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            RelayError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            RelayError::OcrEmptyResult => StatusCode::UNPROCESSABLE_ENTITY,
            RelayError::OcrServiceFailed { .. }
            | RelayError::CompletionServiceFailed { .. }
            | RelayError::ModelOutputUnparseable { .. } => StatusCode::BAD_GATEWAY,
            RelayError::OcrTimeout | RelayError::CompletionTimeout => StatusCode::GATEWAY_TIMEOUT,
            RelayError::CompletionAuthMissing | RelayError::ServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable name for the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::MissingInput => "MissingInput",
            RelayError::EmptyInput => "EmptyInput",
            RelayError::InvalidRequest(_) => "InvalidRequest",
            RelayError::PayloadTooLarge => "PayloadTooLarge",
            RelayError::OcrServiceFailed { .. } => "OcrServiceFailed",
            RelayError::OcrTimeout => "OcrTimeout",
            RelayError::OcrEmptyResult => "OcrEmptyResult",
            RelayError::CompletionAuthMissing => "CompletionAuthMissing",
            RelayError::CompletionServiceFailed { .. } => "CompletionServiceFailed",
            RelayError::CompletionTimeout => "CompletionTimeout",
            RelayError::ModelOutputUnparseable { .. } => "ModelOutputUnparseable",
            RelayError::ServerError(_) => "ServerError",
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        let (details, raw) = match self {
            RelayError::InvalidRequest(msg) => (Some(msg.clone()), None),
            RelayError::OcrServiceFailed { status, body }
            | RelayError::CompletionServiceFailed { status, body } => {
                (Some(upstream_details(*status, body)), None)
            }
            RelayError::ModelOutputUnparseable { raw } => (None, Some(raw.clone())),
            _ => (None, None),
        };
        let error = match self {
            // Internal detail stays in the server log.
            RelayError::ServerError(_) => "internal server error".to_string(),
            RelayError::InvalidRequest(_) => "invalid request".to_string(),
            other => other.to_string(),
        };
        ErrorBody { error, details, raw }
    }
}

fn upstream_details(status: Option<u16>, body: &str) -> String {
    let body = preview(body, 500);
    match status {
        Some(code) => format!("upstream returned {}: {}", code, body),
        None => format!("upstream request failed: {}", body),
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("[PIPELINE] {} ({}): {:?}", self.kind(), status.as_u16(), self);
        } else {
            log::warn!("[PIPELINE] {} ({}): {}", self.kind(), status.as_u16(), self);
        }
        (status, Json(self.to_body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_errors_are_bad_request() {
        assert_eq!(RelayError::MissingInput.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(RelayError::EmptyInput.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            RelayError::PayloadTooLarge.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn upstream_errors_are_gateway_errors() {
        let e = RelayError::OcrServiceFailed {
            status: Some(500),
            body: "boom".into(),
        };
        assert_eq!(e.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(RelayError::OcrTimeout.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            RelayError::CompletionTimeout.status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn unparseable_body_carries_raw_text() {
        let body = RelayError::ModelOutputUnparseable {
            raw: "No JSON here at all".into(),
        }
        .to_body();
        assert_eq!(body.raw.as_deref(), Some("No JSON here at all"));
        assert!(body.details.is_none());
    }

    #[test]
    fn server_error_hides_internal_detail() {
        let body = RelayError::ServerError("disk full at /var/tmp/x".into()).to_body();
        assert_eq!(body.error, "internal server error");
        assert!(body.details.is_none());
    }

    #[test]
    fn upstream_details_include_status_and_body() {
        let body = RelayError::CompletionServiceFailed {
            status: Some(403),
            body: "key invalid".into(),
        }
        .to_body();
        assert_eq!(
            body.details.as_deref(),
            Some("upstream returned 403: key invalid")
        );
    }
}
