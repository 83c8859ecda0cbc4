use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Descriptor of a blob persisted by the backend's upload endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredBlob {
    pub file_id: String,
    pub file_name: String,
    pub file_size: u64,
    pub mime_type: String,
    pub file_url: String,
    /// Server-side classification: "image" or "file".
    pub content_type: String,
}

/// Upload/download surface of the REST collaborator.
///
/// Both directions are fire-once: failures are surfaced to the caller and
/// never retried here.
#[async_trait]
pub trait BlobTransfer: Send + Sync {
    async fn upload_file(&self, path: &Path) -> Result<StoredBlob>;

    async fn upload_bytes(&self, file_name: &str, mime: &str, bytes: Vec<u8>)
        -> Result<StoredBlob>;

    /// Authenticated raw download.
    async fn download(&self, url: &str) -> Result<Vec<u8>>;
}

/// Local cache for downloaded blobs, keyed by source URL.
///
/// The remote-apply path needs a file path to hand to the OS clipboard
/// write primitives; this is where downloaded bytes get one.
pub trait BlobCache: Send + Sync {
    /// Path of an already cached download, if any.
    fn lookup(&self, url: &str) -> Option<PathBuf>;

    /// Persist downloaded bytes and return their cache path.
    fn store(&self, url: &str, bytes: &[u8]) -> Result<PathBuf>;
}
