//! Assembles the sync engine: ports in, running background tasks out.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use cp_core::config::{SharedConfig, SyncSettings, UploadPolicy};
use cp_core::device::DeviceRoster;
use cp_core::history::HistoryStore;
use cp_core::pipeline::SyncPipelineState;
use cp_core::ports::{BlobCache, BlobTransfer, Clock, Notifier, SystemClipboard, Transport};
use cp_core::session::SessionState;
use tokio::task::JoinHandle;

use crate::applier::RemoteChangeApplier;
use crate::outbound::run_outbound_pipeline;
use crate::session::{SessionHandle, SyncSession};
use crate::uploader::Uploader;

/// Everything the engine needs from its host.
pub struct SyncEngineDeps {
    pub transport: Arc<dyn Transport>,
    pub clipboard: Arc<dyn SystemClipboard>,
    pub blob: Arc<dyn BlobTransfer>,
    pub cache: Arc<dyn BlobCache>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
    pub config: SharedConfig,
    pub settings: SyncSettings,
    pub policy: UploadPolicy,
}

/// A running sync engine: the session loop and the outbound pipeline, plus
/// handles to the shared state the host UI renders from.
pub struct SyncEngine {
    session: SessionHandle,
    history: Arc<Mutex<HistoryStore>>,
    roster: Arc<Mutex<DeviceRoster>>,
    pipeline: Arc<Mutex<SyncPipelineState>>,
    tasks: Vec<JoinHandle<()>>,
}

impl SyncEngine {
    /// Start clipboard monitoring, the session loop and the outbound
    /// pipeline.
    pub async fn start(deps: SyncEngineDeps) -> Result<Self> {
        let events = deps.clipboard.start_monitoring().await?;

        let pipeline = Arc::new(Mutex::new(SyncPipelineState::new()));
        let history = Arc::new(Mutex::new(HistoryStore::new()));
        let roster = Arc::new(Mutex::new(DeviceRoster::new()));

        let applier = Arc::new(RemoteChangeApplier::new(
            history.clone(),
            roster.clone(),
            deps.clipboard.clone(),
            deps.blob.clone(),
            deps.cache,
            deps.notifier.clone(),
            deps.clock.clone(),
            pipeline.clone(),
            deps.config.clone(),
            deps.settings.clone(),
        ));

        let (session, handle) = SyncSession::new(
            deps.transport,
            applier,
            deps.notifier.clone(),
            deps.clock.clone(),
            deps.config.clone(),
            deps.settings.clone(),
        );
        let session_task = tokio::spawn(session.run());

        let uploader = Arc::new(Uploader::new(
            deps.blob,
            deps.notifier,
            deps.config,
            deps.policy,
        ));
        let sender = Arc::new(handle.clone());
        let outbound_task = tokio::spawn(run_outbound_pipeline(
            events,
            pipeline.clone(),
            deps.clock,
            deps.settings,
            uploader,
            sender,
        ));

        Ok(Self {
            session: handle,
            history,
            roster,
            pipeline,
            tasks: vec![session_task, outbound_task],
        })
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Re-open the session after a manual disconnect or an exhausted retry
    /// budget. History, roster and clipboard monitoring keep running across
    /// the gap; only the connection is rebuilt.
    pub async fn connect(&self) {
        self.session.connect().await;
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn history(&self) -> Arc<Mutex<HistoryStore>> {
        self.history.clone()
    }

    pub fn roster(&self) -> Arc<Mutex<DeviceRoster>> {
        self.roster.clone()
    }

    /// Pipeline flag state, exposed so a host can arm suppression around its
    /// own programmatic clipboard writes (paste-from-history and the like).
    pub fn pipeline(&self) -> Arc<Mutex<SyncPipelineState>> {
        self.pipeline.clone()
    }

    /// Disconnect the session and stop the background tasks.
    pub async fn shutdown(self) {
        self.session.disconnect().await;
        for task in self.tasks {
            task.abort();
        }
    }
}
