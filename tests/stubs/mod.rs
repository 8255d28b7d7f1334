//! Shared test stubs for the OCR and completion seams.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lab_relay_lib::config::AppConfig;
use lab_relay_lib::error::RelayError;
use lab_relay_lib::llm::CompletionClient;
use lab_relay_lib::ocr::TextRecognizer;
use lab_relay_lib::pipeline::Analyzer;

/// What the stub OCR service does when called.
pub enum OcrReply {
    Lines(Vec<String>),
    Status(u16, String),
    Timeout,
}

pub struct StubOcr {
    reply: OcrReply,
    calls: AtomicUsize,
    /// (filename, bytes) of every call.
    pub seen: Mutex<Vec<(String, Vec<u8>)>>,
}

impl StubOcr {
    pub fn new(reply: OcrReply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn lines(lines: &[&str]) -> Arc<Self> {
        Self::new(OcrReply::Lines(lines.iter().map(|l| l.to_string()).collect()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextRecognizer for StubOcr {
    async fn recognize(&self, filename: &str, bytes: Vec<u8>) -> Result<Vec<String>, RelayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push((filename.to_string(), bytes));
        match &self.reply {
            OcrReply::Lines(lines) => Ok(lines.clone()),
            OcrReply::Status(code, body) => Err(RelayError::OcrServiceFailed {
                status: Some(*code),
                body: body.clone(),
            }),
            OcrReply::Timeout => Err(RelayError::OcrTimeout),
        }
    }
}

/// Completion stub: pops one scripted reply per call.
pub struct StubCompletion {
    replies: Mutex<VecDeque<Result<String, fn() -> RelayError>>>,
    pub prompts: Mutex<Vec<String>>,
}

impl StubCompletion {
    pub fn replying(texts: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(texts.iter().map(|t| Ok(t.to_string())).collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(make: fn() -> RelayError) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::from([Err(make)])),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionClient for StubCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, RelayError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(make)) => Err(make()),
            None => panic!("completion stub called more times than scripted"),
        }
    }
}

/// Config pointing uploads at `upload_dir`.
pub fn test_config(upload_dir: &Path) -> AppConfig {
    AppConfig {
        gemini_api_key: Some("test-key".to_string()),
        upload_dir: upload_dir.to_path_buf(),
        ..AppConfig::default()
    }
}

pub fn analyzer(
    config: &AppConfig,
    ocr: &Arc<StubOcr>,
    completion: &Arc<StubCompletion>,
) -> Analyzer {
    Analyzer::new(config, ocr.clone(), completion.clone())
}

/// Number of entries left in a directory.
pub fn dir_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}
