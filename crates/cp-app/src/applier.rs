//! Applies inbound server messages to local state.
//!
//! Three concerns meet here: materializing persisted items into the history
//! store, writing remote clipboard content back to the OS clipboard without
//! re-triggering the outbound pipeline, and keeping the device roster
//! current. The write-back ordering is load-bearing: the feedback suppressor
//! is armed before the OS write and disarmed again if the write fails.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cp_core::clipboard::{EntryContentType, ImageKind};
use cp_core::config::{SharedConfig, SyncSettings};
use cp_core::device::DeviceRoster;
use cp_core::history::{EntryPatch, HistoryStore};
use cp_core::pipeline::SyncPipelineState;
use cp_core::ports::{BlobCache, BlobTransfer, Clock, Notifier, Severity, SystemClipboard};
use cp_core::protocol::{ClipboardSyncData, ServerMessage};
use cp_core::SyncError;

use crate::session::InboundHandler;

pub struct RemoteChangeApplier {
    history: Arc<Mutex<HistoryStore>>,
    roster: Arc<Mutex<DeviceRoster>>,
    clipboard: Arc<dyn SystemClipboard>,
    blob: Arc<dyn BlobTransfer>,
    cache: Arc<dyn BlobCache>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    pipeline: Arc<Mutex<SyncPipelineState>>,
    config: SharedConfig,
    settings: SyncSettings,
}

impl RemoteChangeApplier {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        history: Arc<Mutex<HistoryStore>>,
        roster: Arc<Mutex<DeviceRoster>>,
        clipboard: Arc<dyn SystemClipboard>,
        blob: Arc<dyn BlobTransfer>,
        cache: Arc<dyn BlobCache>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        pipeline: Arc<Mutex<SyncPipelineState>>,
        config: SharedConfig,
        settings: SyncSettings,
    ) -> Self {
        Self {
            history,
            roster,
            clipboard,
            blob,
            cache,
            notifier,
            clock,
            pipeline,
            config,
            settings,
        }
    }

    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.clock.now_ms()).unwrap_or_else(Utc::now)
    }

    fn history(&self) -> std::sync::MutexGuard<'_, HistoryStore> {
        self.history.lock().expect("history lock poisoned")
    }

    fn roster(&self) -> std::sync::MutexGuard<'_, DeviceRoster> {
        self.roster.lock().expect("roster lock poisoned")
    }

    fn pipeline(&self) -> std::sync::MutexGuard<'_, SyncPipelineState> {
        self.pipeline.lock().expect("pipeline lock poisoned")
    }

    /// Another device copied something: record it and, when enabled, put it
    /// on the local OS clipboard.
    async fn apply_remote_copy(&self, data: ClipboardSyncData) {
        tracing::info!(
            content_type = data.content_type.as_str(),
            device = data.device_id.as_deref().unwrap_or("unknown"),
            "clipboard update received"
        );

        if let Some(entry) = data.clone().into_entry(self.now()) {
            self.history().insert_top(entry);
        }

        if !self.settings.auto_write_to_clipboard {
            return;
        }

        // armed BEFORE the write reaches the OS; the reverse order lets the
        // watcher echo our own write straight back to the server
        self.pipeline()
            .arm_suppression(self.clock.now_ms(), self.settings.suppression_ms);

        if let Err(e) = self.write_back(&data).await {
            self.pipeline().disarm_suppression();
            tracing::warn!(error = %e, "clipboard write-back failed");
            self.notifier.notify(
                Severity::Error,
                &format!("applying synced clipboard failed: {e}"),
            );
        }
    }

    async fn write_back(&self, data: &ClipboardSyncData) -> Result<(), SyncError> {
        match data.content_type {
            EntryContentType::Text => self
                .clipboard
                .write_text(&data.content)
                .await
                .map_err(|e| SyncError::WriteBackFailure(e.to_string())),
            EntryContentType::Image | EntryContentType::File => self.write_back_blob(data).await,
        }
    }

    /// Fetch the blob (cache first), then route by actual content: bytes
    /// carrying a recognized image signature go through the image write
    /// primitive, everything else lands as a file on the clipboard.
    async fn write_back_blob(&self, data: &ClipboardSyncData) -> Result<(), SyncError> {
        let relative = data
            .file_url
            .clone()
            .unwrap_or_else(|| format!("/api/v1/files/download/{}", data.content));
        let url = self.config.snapshot().absolute_url(&relative);

        let (bytes, path) = match self.cache.lookup(&url) {
            Some(path) => {
                let bytes = tokio::fs::read(&path).await.map_err(|e| {
                    SyncError::WriteBackFailure(format!("reading cached download: {e}"))
                })?;
                (bytes, path)
            }
            None => {
                let bytes = self
                    .blob
                    .download(&url)
                    .await
                    .map_err(|e| SyncError::TransientIo(format!("download failed: {e}")))?;
                let path = self
                    .cache
                    .store(&url, &bytes)
                    .map_err(|e| SyncError::WriteBackFailure(format!("caching download: {e}")))?;
                (bytes, path)
            }
        };

        let is_image = data.content_type == EntryContentType::Image
            && (ImageKind::sniff(&bytes).is_some()
                || data
                    .mime_type
                    .as_deref()
                    .is_some_and(|m| m.starts_with("image/")));

        if is_image {
            self.clipboard.write_image(&path).await
        } else {
            self.clipboard.write_files(&[path]).await
        }
        .map_err(|e| SyncError::WriteBackFailure(e.to_string()))
    }
}

#[async_trait]
impl InboundHandler for RemoteChangeApplier {
    async fn on_message(&self, message: ServerMessage) {
        match message {
            ServerMessage::Connected {
                device_id,
                online_devices,
            } => {
                tracing::info!(
                    ?device_id,
                    devices = online_devices.len(),
                    "session acknowledged by server"
                );
                self.roster().replace_all(online_devices);
            }
            ServerMessage::ClipboardSync(data) => self.apply_remote_copy(data).await,
            ServerMessage::SyncConfirmed { clipboard_data } => {
                // our own item was persisted: record it, never write it back
                if let Some(entry) = clipboard_data.into_entry(self.now()) {
                    tracing::debug!(id = entry.id, "sync confirmed");
                    self.history().insert_top(entry);
                }
            }
            ServerMessage::SyncSkipped { reason } => {
                tracing::debug!(?reason, "server skipped sync");
            }
            ServerMessage::TimestampUpdated { clipboard_item } => {
                let Some(id) = clipboard_item.clipboard_id else {
                    tracing::debug!("timestamp update without clipboard_id ignored");
                    return;
                };
                let touched = clipboard_item.updated_at.unwrap_or_else(|| self.now());
                if !self.history().move_to_top(id, &EntryPatch::touched_at(touched)) {
                    // benign: the entry is not in the loaded window
                    tracing::debug!(id, "timestamp update for unloaded entry");
                }
            }
            ServerMessage::DeviceOnline { device } => {
                tracing::info!(device_id = %device.device_id, "device online");
                self.roster().mark_online(device);
            }
            ServerMessage::DeviceOffline { device_id } => {
                tracing::info!(%device_id, "device offline");
                self.roster().mark_offline(&device_id);
            }
            ServerMessage::OnlineDevices { devices } => {
                self.roster().replace_all(devices);
            }
            ServerMessage::Pong => tracing::trace!("pong"),
            ServerMessage::ServerError { message } => {
                tracing::warn!(%message, "server reported an error");
                self.notifier.notify(Severity::Error, &message);
            }
            ServerMessage::Unknown(kind) => {
                tracing::debug!(kind, "unhandled message type");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicI64, Ordering};

    use anyhow::{bail, Result};
    use cp_core::config::SessionConfig;
    use cp_core::device::DeviceInfo;
    use cp_core::ports::StoredBlob;
    use tokio::sync::mpsc;

    use super::*;

    struct TestClock(AtomicI64);

    impl Clock for TestClock {
        fn now_ms(&self) -> i64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    /// Records clipboard writes together with whether the suppression window
    /// was armed at write time.
    struct RecordingClipboard {
        pipeline: Arc<Mutex<SyncPipelineState>>,
        clock: Arc<TestClock>,
        writes: Mutex<Vec<(String, bool)>>,
        fail: bool,
    }

    impl RecordingClipboard {
        fn record(&self, what: String) -> Result<()> {
            if self.fail {
                bail!("clipboard busy");
            }
            let suppressed = self
                .pipeline
                .lock()
                .unwrap()
                .is_suppressed(self.clock.now_ms());
            self.writes.lock().unwrap().push((what, suppressed));
            Ok(())
        }
    }

    #[async_trait]
    impl SystemClipboard for RecordingClipboard {
        async fn read_snapshot(&self) -> Result<cp_core::SystemClipboardSnapshot> {
            bail!("not used")
        }

        async fn write_text(&self, text: &str) -> Result<()> {
            self.record(format!("text:{text}"))
        }

        async fn write_image(&self, path: &Path) -> Result<()> {
            self.record(format!("image:{}", path.display()))
        }

        async fn write_files(&self, paths: &[PathBuf]) -> Result<()> {
            self.record(format!("files:{}", paths.len()))
        }

        async fn start_monitoring(
            &self,
        ) -> Result<mpsc::Receiver<cp_core::SystemClipboardSnapshot>> {
            bail!("not used")
        }
    }

    struct BytesBlob {
        bytes: Vec<u8>,
    }

    #[async_trait]
    impl BlobTransfer for BytesBlob {
        async fn upload_file(&self, _: &Path) -> Result<StoredBlob> {
            bail!("not used")
        }
        async fn upload_bytes(&self, _: &str, _: &str, _: Vec<u8>) -> Result<StoredBlob> {
            bail!("not used")
        }
        async fn download(&self, _url: &str) -> Result<Vec<u8>> {
            Ok(self.bytes.clone())
        }
    }

    struct NoBlob;

    #[async_trait]
    impl BlobTransfer for NoBlob {
        async fn upload_file(&self, _: &Path) -> Result<StoredBlob> {
            bail!("network down")
        }
        async fn upload_bytes(&self, _: &str, _: &str, _: Vec<u8>) -> Result<StoredBlob> {
            bail!("network down")
        }
        async fn download(&self, _: &str) -> Result<Vec<u8>> {
            bail!("network down")
        }
    }

    struct DirCache {
        dir: PathBuf,
    }

    impl BlobCache for DirCache {
        fn lookup(&self, url: &str) -> Option<PathBuf> {
            let path = self.path_for(url);
            path.exists().then_some(path)
        }

        fn store(&self, url: &str, bytes: &[u8]) -> Result<PathBuf> {
            let path = self.path_for(url);
            std::fs::write(&path, bytes)?;
            Ok(path)
        }
    }

    impl DirCache {
        fn path_for(&self, url: &str) -> PathBuf {
            let name: String = url
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
                .collect();
            self.dir.join(name)
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        messages: Mutex<Vec<(Severity, String)>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, severity: Severity, message: &str) {
            self.messages
                .lock()
                .unwrap()
                .push((severity, message.to_string()));
        }
    }

    struct Fixture {
        applier: RemoteChangeApplier,
        history: Arc<Mutex<HistoryStore>>,
        roster: Arc<Mutex<DeviceRoster>>,
        pipeline: Arc<Mutex<SyncPipelineState>>,
        clipboard: Arc<RecordingClipboard>,
        notifier: Arc<RecordingNotifier>,
        clock: Arc<TestClock>,
        _dir: tempfile::TempDir,
    }

    fn fixture_with(blob: Arc<dyn BlobTransfer>, clipboard_fails: bool) -> Fixture {
        let history = Arc::new(Mutex::new(HistoryStore::new()));
        let roster = Arc::new(Mutex::new(DeviceRoster::new()));
        let pipeline = Arc::new(Mutex::new(SyncPipelineState::new()));
        let clock = Arc::new(TestClock(AtomicI64::new(10_000)));
        let clipboard = Arc::new(RecordingClipboard {
            pipeline: pipeline.clone(),
            clock: clock.clone(),
            writes: Mutex::new(Vec::new()),
            fail: clipboard_fails,
        });
        let notifier = Arc::new(RecordingNotifier::default());
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(DirCache {
            dir: dir.path().to_path_buf(),
        });
        let mut config = SessionConfig::new("desktop_a", "Desk A");
        config.reconfigure("https://paste.test", "tok");

        let applier = RemoteChangeApplier::new(
            history.clone(),
            roster.clone(),
            clipboard.clone(),
            blob,
            cache,
            notifier.clone(),
            clock.clone(),
            pipeline.clone(),
            SharedConfig::new(config),
            SyncSettings::default(),
        );
        Fixture {
            applier,
            history,
            roster,
            pipeline,
            clipboard,
            notifier,
            clock,
            _dir: dir,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(Arc::new(NoBlob), false)
    }

    fn text_sync(id: i64, content: &str) -> ClipboardSyncData {
        ClipboardSyncData {
            content: content.into(),
            content_type: EntryContentType::Text,
            device_id: Some("desktop_b".into()),
            device_name: Some("B".into()),
            file_name: None,
            file_size: None,
            mime_type: None,
            file_id: None,
            clipboard_id: Some(id),
            file_url: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn remote_text_is_recorded_and_written_under_suppression() {
        let f = fixture();
        f.applier
            .on_message(ServerMessage::ClipboardSync(text_sync(7, "hello")))
            .await;

        assert_eq!(f.history.lock().unwrap().entries()[0].id, 7);

        let writes = f.clipboard.writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].0, "text:hello");
        // the suppressor was already armed when the write happened
        assert!(writes[0].1);
        assert!(f.pipeline.lock().unwrap().is_suppressed(f.clock.now_ms()));
    }

    #[tokio::test]
    async fn sync_confirmed_records_without_write_back() {
        let f = fixture();
        f.applier
            .on_message(ServerMessage::SyncConfirmed {
                clipboard_data: text_sync(42, "mine"),
            })
            .await;

        assert_eq!(f.history.lock().unwrap().entries()[0].id, 42);
        assert!(f.clipboard.writes.lock().unwrap().is_empty());
        assert!(!f.pipeline.lock().unwrap().is_suppressed(f.clock.now_ms()));
    }

    #[tokio::test]
    async fn write_failure_disarms_suppression_and_notifies() {
        let f = fixture_with(Arc::new(NoBlob), true);
        f.applier
            .on_message(ServerMessage::ClipboardSync(text_sync(1, "x")))
            .await;

        // the window must not mask the user's next real copy
        assert!(!f.pipeline.lock().unwrap().is_suppressed(f.clock.now_ms()));
        let messages = f.notifier.messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].0, Severity::Error);
    }

    #[tokio::test]
    async fn png_download_routes_to_image_write() {
        let png = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3];
        let f = fixture_with(Arc::new(BytesBlob { bytes: png }), false);

        let mut data = text_sync(9, "img-abc");
        data.content_type = EntryContentType::Image;
        data.file_url = Some("/api/v1/files/download/img-abc".into());
        data.mime_type = Some("image/png".into());
        f.applier.on_message(ServerMessage::ClipboardSync(data)).await;

        let writes = f.clipboard.writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        assert!(writes[0].0.starts_with("image:"));
        assert!(writes[0].1);
    }

    #[tokio::test]
    async fn unrecognized_bytes_for_file_entry_land_as_file() {
        let f = fixture_with(
            Arc::new(BytesBlob {
                bytes: b"just a document".to_vec(),
            }),
            false,
        );

        let mut data = text_sync(10, "doc-1");
        data.content_type = EntryContentType::File;
        data.file_url = Some("/api/v1/files/download/doc-1".into());
        f.applier.on_message(ServerMessage::ClipboardSync(data)).await;

        let writes = f.clipboard.writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].0, "files:1");
    }

    #[tokio::test]
    async fn cached_download_skips_the_network() {
        // blob transfer that always fails: a cache hit must still succeed
        let f = fixture_with(Arc::new(NoBlob), false);
        let url = "https://paste.test/api/v1/files/download/img-hit";
        let png = [0x89, 0x50, 0x4E, 0x47, 0, 0, 0, 0];
        f.applier.cache.store(url, &png).unwrap();

        let mut data = text_sync(11, "img-hit");
        data.content_type = EntryContentType::Image;
        data.file_url = Some("/api/v1/files/download/img-hit".into());
        f.applier.on_message(ServerMessage::ClipboardSync(data)).await;

        let writes = f.clipboard.writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        assert!(writes[0].0.starts_with("image:"));
    }

    #[tokio::test]
    async fn download_failure_notifies_and_disarms() {
        let f = fixture_with(Arc::new(NoBlob), false);
        let mut data = text_sync(12, "img-gone");
        data.content_type = EntryContentType::Image;
        f.applier.on_message(ServerMessage::ClipboardSync(data)).await;

        assert!(f.clipboard.writes.lock().unwrap().is_empty());
        assert!(!f.pipeline.lock().unwrap().is_suppressed(f.clock.now_ms()));
        assert_eq!(f.notifier.messages.lock().unwrap().len(), 1);
        // the entry is still recorded even though the write-back failed
        assert_eq!(f.history.lock().unwrap().entries()[0].id, 12);
    }

    #[tokio::test]
    async fn timestamp_updated_moves_entry_to_top() {
        let f = fixture();
        for (id, content) in [(1, "a"), (2, "b"), (3, "c")] {
            f.applier
                .on_message(ServerMessage::SyncConfirmed {
                    clipboard_data: text_sync(id, content),
                })
                .await;
        }

        let touched = Utc::now();
        let mut item = text_sync(1, "a");
        item.updated_at = Some(touched);
        f.applier
            .on_message(ServerMessage::TimestampUpdated {
                clipboard_item: item,
            })
            .await;

        let history = f.history.lock().unwrap();
        let ids: Vec<i64> = history.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 3, 2]);
        assert_eq!(history.get(1).unwrap().updated_at, touched);
    }

    #[tokio::test]
    async fn device_events_keep_the_roster_current() {
        let f = fixture();
        let device = |id: &str| DeviceInfo {
            device_id: id.into(),
            device_name: None,
            username: None,
            connected_at: None,
        };

        f.applier
            .on_message(ServerMessage::Connected {
                device_id: Some("desktop_a".into()),
                online_devices: vec![device("desktop_a"), device("desktop_b")],
            })
            .await;
        assert_eq!(f.roster.lock().unwrap().len(), 2);

        f.applier
            .on_message(ServerMessage::DeviceOffline {
                device_id: "desktop_b".into(),
            })
            .await;
        assert!(!f.roster.lock().unwrap().contains("desktop_b"));

        f.applier
            .on_message(ServerMessage::DeviceOnline {
                device: device("desktop_c"),
            })
            .await;
        assert!(f.roster.lock().unwrap().contains("desktop_c"));
    }

    #[tokio::test]
    async fn server_error_surfaces_as_notification() {
        let f = fixture();
        f.applier
            .on_message(ServerMessage::ServerError {
                message: "quota exceeded".into(),
            })
            .await;
        let messages = f.notifier.messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].1.contains("quota exceeded"));
    }
}
