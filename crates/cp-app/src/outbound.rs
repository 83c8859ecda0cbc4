//! Outbound pipeline driver: OS clipboard events in, sync payloads out.
//!
//! The dispatch decisions themselves live in `SyncPipelineState`; this module
//! only supplies the runtime around it - the event loop, the debounce sleep
//! and the upload/send step once a candidate comes due.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cp_core::clipboard::{Fingerprint, SystemClipboardSnapshot};
use cp_core::config::SyncSettings;
use cp_core::pipeline::{DropReason, SyncPipelineState};
use cp_core::ports::Clock;
use cp_core::protocol::ClipboardSyncData;
use cp_core::SyncError;
use tokio::sync::mpsc;

use crate::uploader::Uploader;

/// Destination of accepted payloads. The session handle implements this;
/// tests substitute a recorder.
#[async_trait]
pub trait SyncSender: Send + Sync {
    async fn send_clipboard(&self, data: ClipboardSyncData) -> Result<(), SyncError>;
}

/// Drive clipboard change notifications through the dispatch gates until the
/// watcher channel closes.
pub async fn run_outbound_pipeline(
    mut events: mpsc::Receiver<SystemClipboardSnapshot>,
    state: Arc<Mutex<SyncPipelineState>>,
    clock: Arc<dyn Clock>,
    settings: SyncSettings,
    uploader: Arc<Uploader>,
    sender: Arc<dyn SyncSender>,
) {
    loop {
        let deadline = lock(&state).debounce_deadline();
        tokio::select! {
            event = events.recv() => {
                let Some(snapshot) = event else { break };
                offer_event(&state, &*clock, &settings, snapshot);
            }
            _ = debounce_elapsed(deadline, &*clock) => {
                dispatch_due(&state, &*clock, &settings, &uploader, &*sender).await;
            }
        }
    }
    tracing::debug!("clipboard watcher channel closed, outbound pipeline stopping");
}

fn lock(state: &Mutex<SyncPipelineState>) -> std::sync::MutexGuard<'_, SyncPipelineState> {
    state.lock().expect("pipeline lock poisoned")
}

/// Completes once the pending debounce deadline passes; never completes when
/// nothing is pending.
async fn debounce_elapsed(deadline: Option<i64>, clock: &dyn Clock) {
    match deadline {
        Some(deadline_ms) => {
            let wait = (deadline_ms - clock.now_ms()).max(0) as u64;
            tokio::time::sleep(Duration::from_millis(wait)).await;
        }
        None => futures::future::pending().await,
    }
}

fn offer_event(
    state: &Mutex<SyncPipelineState>,
    clock: &dyn Clock,
    settings: &SyncSettings,
    snapshot: SystemClipboardSnapshot,
) {
    let now = clock.now_ms();
    let Some(content) = snapshot.classify() else {
        tracing::trace!("empty clipboard snapshot ignored");
        return;
    };
    let kind = content.kind();
    match lock(state).offer(content, now, settings.debounce_ms) {
        Ok(()) => tracing::debug!(%kind, "clipboard change accepted for dispatch"),
        Err(DropReason::Suppressed) => {
            tracing::debug!(%kind, "self-inflicted clipboard change suppressed")
        }
        Err(DropReason::Busy) => tracing::trace!(%kind, "pipeline busy, event dropped"),
        Err(DropReason::Duplicate) => tracing::trace!(%kind, "unchanged content dropped"),
    }
}

async fn dispatch_due(
    state: &Mutex<SyncPipelineState>,
    clock: &dyn Clock,
    settings: &SyncSettings,
    uploader: &Uploader,
    sender: &dyn SyncSender,
) {
    let Some(content) = lock(state).take_due(clock.now_ms()) else {
        return;
    };
    // the fingerprint hash is log-safe; the content itself is not
    let fingerprint = Fingerprint::of(&content);
    tracing::debug!(kind = %content.kind(), %fingerprint, "dispatching clipboard candidate");

    let payloads = uploader.build_payloads(content).await;
    for payload in payloads {
        if let Err(e) = sender.send_clipboard(payload).await {
            // fail-fast by design: no queue, the next organic copy retries
            tracing::warn!(error = %e, "clipboard sync send failed");
        }
    }

    lock(state).finish_dispatch(clock.now_ms(), settings.processing_cooldown_ms);
}
