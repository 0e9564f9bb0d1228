//! Temporary Artifacts
//!
//! Request-scoped files handed to the engine by path. A `TempArtifact` owns
//! its file: it is removed on `release()` or, at the latest, when the guard
//! is dropped, so every exit path of a request cleans up.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::types::{CleanupError, InputError};

/// Scope guard owning one temporary file
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
    released: bool,
}

impl TempArtifact {
    /// Write `contents` to a unique file under `dir`, named after `original_filename`
    pub async fn acquire(
        dir: &Path,
        original_filename: &str,
        contents: &[u8],
    ) -> Result<Self, InputError> {
        let path = dir.join(format!(
            "ocr_{}_{}",
            Uuid::new_v4(),
            sanitize_filename(original_filename)
        ));

        // Owned before the write so a partial file is removed too
        let artifact = Self {
            path,
            released: false,
        };

        tokio::fs::write(&artifact.path, contents)
            .await
            .map_err(|source| InputError::TempFile {
                path: artifact.path.clone(),
                source,
            })?;

        tracing::debug!(
            path = %artifact.path.display(),
            bytes = contents.len(),
            "Temporary artifact created"
        );

        Ok(artifact)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the file if present. Only the first call does anything.
    pub async fn release(&mut self) {
        if self.released {
            return;
        }

        let result = tokio::fs::remove_file(&self.path).await;
        self.released = true;
        report_removal(&self.path, result);
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        report_removal(&self.path, std::fs::remove_file(&self.path));
    }
}

/// Removal failures are logged and absorbed; a missing file counts as removed
fn report_removal(path: &Path, result: std::io::Result<()>) {
    match result {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "Temporary artifact removed");
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(source) => {
            let error = CleanupError {
                path: path.to_path_buf(),
                source,
            };
            tracing::warn!("{}", error);
        }
    }
}

/// Keep only the final path component and replace anything outside
/// `[A-Za-z0-9._-]`
fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}
