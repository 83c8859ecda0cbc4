//! Turns accepted clipboard content into `sync_clipboard` payloads.
//!
//! Text, Html and Rtf travel inline as their string value. Images and files
//! are uploaded through the blob port first and referenced by the stored id;
//! the server resolves that id into a download URL when it relays the item.
//! Failures never abort a batch: the affected item is reported and skipped.

use std::path::PathBuf;
use std::sync::Arc;

use cp_core::clipboard::{ClipboardContent, EntryContentType, ImageContent, ImageKind};
use cp_core::config::{SharedConfig, UploadPolicy};
use cp_core::ports::{BlobTransfer, Notifier, Severity, StoredBlob};
use cp_core::protocol::ClipboardSyncData;

pub struct Uploader {
    blob: Arc<dyn BlobTransfer>,
    notifier: Arc<dyn Notifier>,
    config: SharedConfig,
    policy: UploadPolicy,
}

impl Uploader {
    pub fn new(
        blob: Arc<dyn BlobTransfer>,
        notifier: Arc<dyn Notifier>,
        config: SharedConfig,
        policy: UploadPolicy,
    ) -> Self {
        Self {
            blob,
            notifier,
            config,
            policy,
        }
    }

    /// Build zero or more payloads for one accepted candidate.
    ///
    /// A multi-file copy yields one payload per accepted file; a rejected or
    /// failed file is skipped individually and the rest still sync.
    pub async fn build_payloads(&self, content: ClipboardContent) -> Vec<ClipboardSyncData> {
        match content {
            ClipboardContent::Image(image) => self.upload_image(image).await.into_iter().collect(),
            ClipboardContent::Files(paths) => self.upload_files(&paths).await,
            inline => match inline.inline_text() {
                Some(text) => vec![self.payload(text.to_owned(), EntryContentType::Text)],
                None => Vec::new(),
            },
        }
    }

    fn payload(&self, content: String, content_type: EntryContentType) -> ClipboardSyncData {
        let config = self.config.snapshot();
        ClipboardSyncData {
            content,
            content_type,
            device_id: Some(config.device_id),
            device_name: Some(config.device_name),
            file_name: None,
            file_size: None,
            mime_type: None,
            file_id: None,
            clipboard_id: None,
            file_url: None,
            updated_at: None,
        }
    }

    /// Payload referencing an uploaded blob: `content` carries the stored id,
    /// which is what the server expects for image/file items.
    fn blob_payload(&self, stored: StoredBlob) -> ClipboardSyncData {
        let content_type = if stored.content_type == "image" {
            EntryContentType::Image
        } else {
            EntryContentType::File
        };
        let mut data = self.payload(stored.file_id.clone(), content_type);
        data.file_name = Some(stored.file_name);
        data.file_size = Some(stored.file_size);
        data.mime_type = Some(stored.mime_type);
        data.file_id = Some(stored.file_id);
        data
    }

    async fn upload_image(&self, image: ImageContent) -> Option<ClipboardSyncData> {
        let kind = ImageKind::infer(&image.bytes, None);
        let file_name = image
            .source_path
            .as_deref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("clipboard.{}", kind.extension()));

        match self.blob.upload_bytes(&file_name, kind.mime(), image.bytes).await {
            Ok(stored) => Some(self.blob_payload(stored)),
            Err(e) => {
                tracing::warn!(error = %e, file_name, "image upload failed");
                self.notifier
                    .notify(Severity::Error, &format!("image upload failed: {e}"));
                None
            }
        }
    }

    async fn upload_files(&self, paths: &[PathBuf]) -> Vec<ClipboardSyncData> {
        let mut payloads = Vec::with_capacity(paths.len());
        for path in paths {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());

            let size = match tokio::fs::metadata(path).await {
                Ok(meta) => meta.len(),
                Err(e) => {
                    tracing::warn!(error = %e, name, "cannot stat copied file");
                    self.notifier
                        .notify(Severity::Warning, &format!("skipping {name}: {e}"));
                    continue;
                }
            };

            if let Err(rejection) = self.policy.check(&name, size) {
                tracing::info!(%rejection, "file skipped by upload policy");
                self.notifier.notify(Severity::Warning, &rejection.to_string());
                continue;
            }

            match self.blob.upload_file(path).await {
                Ok(stored) => payloads.push(self.blob_payload(stored)),
                Err(e) => {
                    tracing::warn!(error = %e, name, "file upload failed");
                    self.notifier
                        .notify(Severity::Error, &format!("upload of {name} failed: {e}"));
                }
            }
        }
        payloads
    }
}
