//! Filesystem blob store.
//!
//! Blobs are written below a root directory and served by the storefront
//! under `/blobs/` (see `routes::app`). The download URL is the public base
//! URL joined with that prefix and the blob path.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use super::{BackendError, BlobRef, BlobStore, normalize_blob_path};

/// URL prefix the storefront serves blobs from.
pub const BLOB_ROUTE: &str = "/blobs";

/// [`BlobStore`] writing files under a root directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
    public_base: Url,
}

impl FsBlobStore {
    /// Create a store rooted at `root`, serving URLs relative to `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::InvalidPath`] if `base_url` is not a valid URL.
    pub fn new(root: impl Into<PathBuf>, base_url: &str) -> Result<Self, BackendError> {
        let base = format!("{}{BLOB_ROUTE}/", base_url.trim_end_matches('/'));
        let public_base =
            Url::parse(&base).map_err(|e| BackendError::InvalidPath(format!("{base}: {e}")))?;
        Ok(Self {
            root: root.into(),
            public_base,
        })
    }

    /// Root directory on disk.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<BlobRef, BackendError> {
        let path = normalize_blob_path(path)?;
        let target = self.root.join(&path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        debug!(path = %path, size = bytes.len(), "writing blob");
        tokio::fs::write(&target, bytes).await?;
        Ok(BlobRef { path })
    }

    async fn url(&self, blob: &BlobRef) -> Result<String, BackendError> {
        let target = self.root.join(&blob.path);
        if !tokio::fs::try_exists(&target).await? {
            return Err(BackendError::NotFound(blob.path.clone()));
        }
        self.public_base
            .join(&blob.path)
            .map(String::from)
            .map_err(|e| BackendError::InvalidPath(format!("{}: {e}", blob.path)))
    }
}
