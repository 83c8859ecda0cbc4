//! OS clipboard adapter over clipboard-rs.
//!
//! Reads pull every representation the OS exposes into one snapshot;
//! classification into a single content item happens downstream. The change
//! watcher runs clipboard-rs's blocking watch loop on a blocking task and
//! bridges notifications into a tokio channel.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use clipboard_rs::common::RustImage;
use clipboard_rs::{
    Clipboard, ClipboardContext, ClipboardHandler, ClipboardWatcher, ClipboardWatcherContext,
    ContentFormat, RustImageData, WatcherShutdown,
};
use cp_core::clipboard::{ImageContent, SystemClipboardSnapshot};
use cp_core::ports::SystemClipboard;
use tokio::sync::mpsc;

fn map_clipboard_err<T>(
    result: std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>,
) -> Result<T> {
    result.map_err(|e| anyhow!(e))
}

pub struct DesktopClipboard {
    inner: Arc<Mutex<ClipboardContext>>,
    shutdown: Mutex<Option<WatcherShutdown>>,
}

impl DesktopClipboard {
    pub fn new() -> Result<Self> {
        let context =
            ClipboardContext::new().map_err(|e| anyhow!("creating clipboard context: {e}"))?;
        Ok(Self {
            inner: Arc::new(Mutex::new(context)),
            shutdown: Mutex::new(None),
        })
    }

    fn read_with(ctx: &mut ClipboardContext) -> SystemClipboardSnapshot {
        let mut snapshot = SystemClipboardSnapshot {
            ts_ms: chrono::Utc::now().timestamp_millis(),
            ..Default::default()
        };

        if ctx.has(ContentFormat::Text) {
            if let Ok(text) = ctx.get_text() {
                snapshot.text = Some(text);
            }
        }
        if ctx.has(ContentFormat::Html) {
            if let Ok(html) = ctx.get_html() {
                snapshot.html = Some(html);
            }
        }
        if ctx.has(ContentFormat::Rtf) {
            if let Ok(rtf) = ctx.get_rich_text() {
                snapshot.rtf = Some(rtf);
            }
        }
        if ctx.has(ContentFormat::Files) {
            if let Ok(files) = ctx.get_files() {
                snapshot.files = files.into_iter().map(PathBuf::from).collect();
            }
        }
        if ctx.has(ContentFormat::Image) {
            if let Ok(img) = ctx.get_image() {
                // normalize to PNG regardless of the native representation
                if let Ok(png) = img.to_png() {
                    snapshot.image = Some(ImageContent {
                        bytes: png.get_bytes().to_vec(),
                        source_path: None,
                    });
                }
            }
        }

        snapshot
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ClipboardContext> {
        self.inner.lock().expect("clipboard lock poisoned")
    }

    /// Stop the watch loop started by `start_monitoring`.
    pub fn stop_monitoring(&self) {
        if let Some(shutdown) = self.shutdown.lock().expect("shutdown lock poisoned").take() {
            shutdown.stop();
        }
    }
}

#[async_trait]
impl SystemClipboard for DesktopClipboard {
    async fn read_snapshot(&self) -> Result<SystemClipboardSnapshot> {
        let mut ctx = self.lock();
        Ok(Self::read_with(&mut ctx))
    }

    async fn write_text(&self, text: &str) -> Result<()> {
        map_clipboard_err(self.lock().set_text(text.to_string()))
    }

    async fn write_image(&self, path: &Path) -> Result<()> {
        let bytes = tokio::fs::read(path).await?;
        let image = RustImageData::from_bytes(&bytes).map_err(|e| anyhow!(e))?;
        map_clipboard_err(self.lock().set_image(image))
    }

    async fn write_files(&self, paths: &[PathBuf]) -> Result<()> {
        let files = paths
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        map_clipboard_err(self.lock().set_files(files))
    }

    async fn start_monitoring(&self) -> Result<mpsc::Receiver<SystemClipboardSnapshot>> {
        let (tx, rx) = mpsc::channel(32);

        let mut watcher_ctx = ClipboardWatcherContext::new()
            .map_err(|e| anyhow!("creating watcher context: {e}"))?;
        let bridge = WatcherBridge {
            clipboard: self.inner.clone(),
            events: tx,
        };
        let shutdown = watcher_ctx.add_handler(bridge).get_shutdown_channel();
        *self.shutdown.lock().expect("shutdown lock poisoned") = Some(shutdown);

        // start_watch blocks its thread until shutdown
        tokio::task::spawn_blocking(move || {
            tracing::info!("clipboard watch started");
            watcher_ctx.start_watch();
            tracing::info!("clipboard watch stopped");
        });

        Ok(rx)
    }
}

/// clipboard-rs change callback bridged into the event channel.
struct WatcherBridge {
    clipboard: Arc<Mutex<ClipboardContext>>,
    events: mpsc::Sender<SystemClipboardSnapshot>,
}

impl ClipboardHandler for WatcherBridge {
    fn on_clipboard_change(&mut self) {
        let snapshot = {
            let mut ctx = self.clipboard.lock().expect("clipboard lock poisoned");
            DesktopClipboard::read_with(&mut ctx)
        };
        if let Err(e) = self.events.try_send(snapshot) {
            tracing::warn!(error = %e, "dropping clipboard event, channel full or closed");
        }
    }
}
