//! REST collaborator: authenticated blob upload and download.
//!
//! Uploads are multipart POSTs to `{base}/files/upload`; the backend answers
//! with a `{success, data}` envelope describing the stored blob. Downloads
//! resolve relative `/api/v1/files/...` URLs against the configured origin
//! and carry the bearer token.

use std::path::Path;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use cp_core::config::SharedConfig;
use cp_core::ports::{BlobTransfer, StoredBlob};
use serde::Deserialize;

pub struct RestBlobClient {
    http: reqwest::Client,
    config: SharedConfig,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<StoredBlob>,
}

impl RestBlobClient {
    pub fn new(config: SharedConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    async fn upload_part(&self, part: reqwest::multipart::Part) -> Result<StoredBlob> {
        let config = self.config.snapshot();
        if !config.is_configured {
            bail!("sync backend not configured");
        }

        let form = reqwest::multipart::Form::new().part("file", part);
        let response = self
            .http
            .post(format!("{}/files/upload", config.base_url))
            .bearer_auth(&config.token)
            .multipart(form)
            .send()
            .await
            .context("upload request failed")?
            .error_for_status()
            .context("upload rejected")?;

        let body: UploadResponse = response.json().await.context("parsing upload response")?;
        match body.data {
            Some(blob) if body.success => {
                tracing::debug!(file_id = %blob.file_id, size = blob.file_size, "blob uploaded");
                Ok(blob)
            }
            _ => bail!(
                "upload failed: {}",
                body.message.unwrap_or_else(|| "unknown error".into())
            ),
        }
    }
}

#[async_trait]
impl BlobTransfer for RestBlobClient {
    async fn upload_file(&self, path: &Path) -> Result<StoredBlob> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
        self.upload_part(part).await
    }

    async fn upload_bytes(
        &self,
        file_name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredBlob> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)
            .context("invalid mime type")?;
        self.upload_part(part).await
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let config = self.config.snapshot();
        let absolute = config.absolute_url(url);
        let response = self
            .http
            .get(&absolute)
            .bearer_auth(&config.token)
            .send()
            .await
            .context("download request failed")?
            .error_for_status()
            .context("download rejected")?;
        let bytes = response.bytes().await.context("reading download body")?;
        tracing::debug!(url = %absolute, size = bytes.len(), "blob downloaded");
        Ok(bytes.to_vec())
    }
}
