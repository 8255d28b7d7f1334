//! Process configuration — read once at startup, then passed around immutably.
//!
//! Values come from the environment (after `.env.local` / `.env` have been
//! loaded by `run()`). Nothing downstream reads the environment again.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_OCR_URL: &str = "http://127.0.0.1:8001/ocr";
pub const DEFAULT_OCR_LINES_FIELD: &str = "tests_raw";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be {expected}, got {value:?}")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Gemini API key. `None` is allowed at startup; requests then fail
    /// with `CompletionAuthMissing`.
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_api_base: String,
    pub ocr_url: String,
    /// JSON field in the OCR response holding the recognized lines.
    pub ocr_lines_field: String,
    pub ocr_timeout: Duration,
    pub completion_timeout: Duration,
    pub port: u16,
    /// `*` means any origin.
    pub allowed_origins: Vec<String>,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// Run the second completion call that turns the JSON into prose.
    pub narrative_summary: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            ocr_url: DEFAULT_OCR_URL.to_string(),
            ocr_lines_field: DEFAULT_OCR_LINES_FIELD.to_string(),
            ocr_timeout: Duration::from_secs(30),
            completion_timeout: Duration::from_secs(60),
            port: DEFAULT_PORT,
            allowed_origins: vec![DEFAULT_ALLOWED_ORIGIN.to_string()],
            upload_dir: std::env::temp_dir(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            narrative_summary: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let allowed_origins = match get("ALLOWED_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(|o| o.trim().trim_end_matches('/').to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            None => defaults.allowed_origins,
        };

        Ok(Self {
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_model: get("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            gemini_api_base: get("GEMINI_API_BASE")
                .map(|b| b.trim_end_matches('/').to_string())
                .unwrap_or(defaults.gemini_api_base),
            ocr_url: get("OCR_SERVICE_URL").unwrap_or(defaults.ocr_url),
            ocr_lines_field: get("OCR_LINES_FIELD").unwrap_or(defaults.ocr_lines_field),
            ocr_timeout: match get("OCR_TIMEOUT_SECS") {
                Some(v) => Duration::from_secs(parse_secs("OCR_TIMEOUT_SECS", &v)?),
                None => defaults.ocr_timeout,
            },
            completion_timeout: match get("COMPLETION_TIMEOUT_SECS") {
                Some(v) => Duration::from_secs(parse_secs("COMPLETION_TIMEOUT_SECS", &v)?),
                None => defaults.completion_timeout,
            },
            port: match get("PORT") {
                Some(v) => v.parse().map_err(|_| ConfigError::Invalid {
                    key: "PORT",
                    expected: "a port number",
                    value: v,
                })?,
                None => defaults.port,
            },
            allowed_origins,
            upload_dir: get("UPLOAD_DIR").map(PathBuf::from).unwrap_or(defaults.upload_dir),
            max_upload_bytes: match get("MAX_UPLOAD_BYTES") {
                Some(v) => v.parse().map_err(|_| ConfigError::Invalid {
                    key: "MAX_UPLOAD_BYTES",
                    expected: "a byte count",
                    value: v,
                })?,
                None => defaults.max_upload_bytes,
            },
            narrative_summary: match get("NARRATIVE_SUMMARY") {
                Some(v) => parse_bool("NARRATIVE_SUMMARY", &v)?,
                None => defaults.narrative_summary,
            },
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.gemini_api_key.is_some()
    }
}

fn parse_secs(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    match value.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(ConfigError::Invalid {
            key,
            expected: "a positive number of seconds",
            value: value.to_string(),
        }),
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            expected: "true or false",
            value: value.to_string(),
        }),
    }
}
