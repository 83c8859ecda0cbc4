//! Clipboard port - abstracts local clipboard access.

use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;

use crate::clipboard::SystemClipboardSnapshot;

/// Platform-agnostic interface to the OS clipboard.
///
/// Reads happen only in response to a change notification delivered through
/// [`SystemClipboard::start_monitoring`]; the core never polls. Writes are
/// the remote-apply path: text directly, images and files by local path
/// after download.
#[async_trait]
pub trait SystemClipboard: Send + Sync {
    /// Read every available representation of the current clipboard state.
    async fn read_snapshot(&self) -> Result<SystemClipboardSnapshot>;

    async fn write_text(&self, text: &str) -> Result<()>;

    /// Write an image from a local file path (PNG container expected).
    async fn write_image(&self, path: &Path) -> Result<()>;

    /// Put a list of file paths on the clipboard.
    async fn write_files(&self, paths: &[PathBuf]) -> Result<()>;

    /// Subscribe to OS clipboard change notifications.
    ///
    /// Each notification carries the snapshot already read by the platform
    /// layer, so downstream components stay free of platform I/O.
    async fn start_monitoring(
        &self,
    ) -> Result<tokio::sync::mpsc::Receiver<SystemClipboardSnapshot>>;
}
