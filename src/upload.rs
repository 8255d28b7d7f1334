//! Transient storage for uploaded report files.
//!
//! A `StagedUpload` owns one temp file for the lifetime of a request.
//! The file is removed exactly once: by `release()` on the normal path, or
//! by `Drop` if the request bails out early. Removal failures are logged
//! and never surface to the caller.

use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::RelayError;
use crate::input::Upload;

pub struct StagedUpload {
    file: Option<NamedTempFile>,
    path: PathBuf,
    filename: String,
}

impl StagedUpload {
    /// Write the upload into `dir` under a random name.
    ///
    /// Only the extension of the caller's filename is reused on disk.
    pub async fn stage(dir: &Path, upload: &Upload) -> Result<Self, RelayError> {
        let suffix = safe_extension(&upload.filename)
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();

        let file = tempfile::Builder::new()
            .prefix("lab-relay-")
            .suffix(&suffix)
            .tempfile_in(dir)
            .map_err(|e| RelayError::ServerError(format!("create temp file in {}: {}", dir.display(), e)))?;
        let path = file.path().to_path_buf();

        tokio::fs::write(&path, &upload.bytes)
            .await
            .map_err(|e| RelayError::ServerError(format!("write {}: {}", path.display(), e)))?;

        log::info!(
            "[UPLOAD] Staged {} ({} bytes) at {}",
            upload.filename,
            upload.bytes.len(),
            path.display()
        );

        Ok(Self {
            file: Some(file),
            path,
            filename: upload.filename.clone(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Original filename as declared by the caller.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub async fn read(&self) -> Result<Vec<u8>, RelayError> {
        tokio::fs::read(&self.path)
            .await
            .map_err(|e| RelayError::ServerError(format!("read {}: {}", self.path.display(), e)))
    }

    /// Delete the staged file now.
    pub fn release(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        let Some(file) = self.file.take() else {
            return;
        };
        match file.close() {
            Ok(()) => log::info!("[UPLOAD] Removed {}", self.path.display()),
            Err(e) => log::warn!("[UPLOAD] Failed to remove {}: {}", self.path.display(), e),
        }
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        self.remove();
    }
}

/// Extension of `filename` if it is short and alphanumeric.
fn safe_extension(filename: &str) -> Option<String> {
    let ext = Path::new(filename).extension()?.to_str()?;
    if ext.is_empty() || ext.len() > 8 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, bytes: &[u8]) -> Upload {
        Upload {
            filename: name.to_string(),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn extension_is_sanitized() {
        assert_eq!(safe_extension("scan.PNG").as_deref(), Some("png"));
        assert_eq!(safe_extension("../../etc/passwd"), None);
        assert_eq!(safe_extension("report.p$g"), None);
        assert_eq!(safe_extension("noext"), None);
    }

    #[tokio::test]
    async fn release_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedUpload::stage(dir.path(), &upload("report.jpg", b"img"))
            .await
            .unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());
        assert!(path.to_string_lossy().ends_with(".jpg"));
        assert_eq!(staged.read().await.unwrap(), b"img");

        staged.release();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn drop_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let staged = StagedUpload::stage(dir.path(), &upload("report.png", b"x"))
                .await
                .unwrap();
            staged.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn removal_failure_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedUpload::stage(dir.path(), &upload("report.png", b"x"))
            .await
            .unwrap();
        std::fs::remove_file(staged.path()).unwrap();
        // Already gone: close() errors, release() must not panic.
        staged.release();
    }

    #[tokio::test]
    async fn missing_directory_is_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        let err = StagedUpload::stage(&missing, &upload("a.png", b"x"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, RelayError::ServerError(_)));
    }
}
