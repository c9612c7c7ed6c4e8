// src/services/photos.rs
//! Local blob storage for candidate photos
//!
//! Stored photos are addressed by a public path of the form
//! `/uploads/photos/<filename>`; filename uniqueness is the caller's job.

use std::path::{Path, PathBuf};
use tracing::warn;

/// Prefix under which stored photos are served
pub const PHOTO_URL_PREFIX: &str = "/uploads/photos/";

pub struct PhotoStore {
    base_dir: PathBuf,
}

impl PhotoStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Create the storage directory, tolerating a pre-existing one
    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.base_dir).await
    }

    /// Filesystem path for a stored filename
    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.base_dir.join(filename)
    }

    /// Write a photo and return its public path
    pub async fn put(&self, filename: &str, bytes: &[u8]) -> std::io::Result<String> {
        let file_path = self.base_dir.join(filename);
        tokio::fs::write(&file_path, bytes).await?;
        Ok(format!("{}{}", PHOTO_URL_PREFIX, filename))
    }

    /// Delete a photo by its public path; missing files are logged, not errors
    pub async fn delete(&self, public_path: &str) {
        let Some(filename) = public_path.strip_prefix(PHOTO_URL_PREFIX) else {
            warn!(path = %public_path, "Refusing to delete photo outside storage prefix");
            return;
        };
        if filename.contains('/') || filename.contains("..") {
            warn!(path = %public_path, "Refusing to delete photo with path traversal");
            return;
        }
        if let Err(e) = tokio::fs::remove_file(self.base_dir.join(filename)).await {
            warn!(error = %e, path = %public_path, "Failed to delete stored photo");
        }
    }

    /// Resolve a serve request filename to a filesystem path, rejecting traversal
    pub fn serve_path(&self, filename: &str) -> Option<PathBuf> {
        if filename.is_empty()
            || filename.contains('/')
            || filename.contains('\\')
            || filename.contains("..")
        {
            return None;
        }
        Some(self.path_for(filename))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}
