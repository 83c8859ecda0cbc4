//! WebSocket session runtime.
//!
//! Wraps the pure `SessionMachine` with the actual sockets, timers and
//! channels: connect with identity query parameters, heartbeat pings while
//! connected, fixed-interval reconnects on loss, and an absorbing manual
//! disconnect. Outbound sends fail fast when not connected; there is no
//! queue.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cp_core::config::{SessionConfig, SharedConfig, SyncSettings};
use cp_core::ports::{Clock, Connection, Notifier, Severity, Transport};
use cp_core::protocol::{ClientMessage, ClipboardSyncData, ServerMessage};
use cp_core::session::{ReconnectDecision, SessionMachine, SessionState};
use cp_core::SyncError;
use tokio::sync::{mpsc, watch};

use crate::outbound::SyncSender;

/// Consumer of inbound server traffic.
#[async_trait]
pub trait InboundHandler: Send + Sync {
    /// Generic observer: sees every raw frame before type dispatch.
    fn on_frame(&self, _raw: &str) {}

    async fn on_message(&self, message: ServerMessage);
}

enum SessionCommand {
    Send(ClientMessage),
    Connect,
    Disconnect,
}

/// Cheap clonable handle to a running session.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    state: watch::Receiver<SessionState>,
}

impl SessionHandle {
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Watch channel for UI indicators; updated on every lifecycle change.
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Fail-fast send: refused immediately unless the session is Connected.
    pub fn send(&self, message: ClientMessage) -> Result<(), SyncError> {
        if self.state() != SessionState::Connected {
            return Err(SyncError::ConnectionLoss);
        }
        self.commands
            .try_send(SessionCommand::Send(message))
            .map_err(|_| SyncError::ConnectionLoss)
    }

    /// Explicit (re)connect: re-opens the session after a manual disconnect
    /// or an exhausted retry budget. No-op while the session is already up.
    pub async fn connect(&self) {
        let _ = self.commands.send(SessionCommand::Connect).await;
    }

    /// Manual disconnect. Absorbing: the session will not reconnect on its
    /// own; only an explicit [`connect`](Self::connect) re-opens it.
    pub async fn disconnect(&self) {
        let _ = self.commands.send(SessionCommand::Disconnect).await;
    }
}

#[async_trait]
impl SyncSender for SessionHandle {
    async fn send_clipboard(&self, data: ClipboardSyncData) -> Result<(), SyncError> {
        self.send(ClientMessage::SyncClipboard(data))
    }
}

pub struct SyncSession {
    transport: Arc<dyn Transport>,
    handler: Arc<dyn InboundHandler>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    config: SharedConfig,
    settings: SyncSettings,
    machine: SessionMachine,
    commands: mpsc::Receiver<SessionCommand>,
    state_tx: watch::Sender<SessionState>,
}

impl SyncSession {
    pub fn new(
        transport: Arc<dyn Transport>,
        handler: Arc<dyn InboundHandler>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        config: SharedConfig,
        settings: SyncSettings,
    ) -> (Self, SessionHandle) {
        let (command_tx, command_rx) = mpsc::channel(64);
        let (state_tx, state_rx) = watch::channel(SessionState::Disconnected);
        let machine = SessionMachine::new(settings.max_reconnect_attempts);
        let session = Self {
            transport,
            handler,
            notifier,
            clock,
            config,
            settings,
            machine,
            commands: command_rx,
            state_tx,
        };
        let handle = SessionHandle {
            commands: command_tx,
            state: state_rx,
        };
        (session, handle)
    }

    /// Session lifecycle loop. Connects immediately, then runs until every
    /// handle is dropped; after a manual close or an exhausted retry budget
    /// the loop idles until an explicit connect command re-opens it.
    pub async fn run(mut self) {
        loop {
            if !self.machine.on_connect_started() {
                break;
            }
            self.publish(SessionState::Connecting);

            let config = self.config.snapshot();
            let decision = match connect_url(&config) {
                Ok(url) => self.attempt(&config, &url).await,
                Err(e) => {
                    // unusable configuration: retrying cannot fix this, only
                    // a reconfigure followed by an explicit connect
                    tracing::error!(error = %e, "invalid sync endpoint");
                    self.notifier
                        .notify(Severity::Error, &format!("invalid sync endpoint: {e}"));
                    self.machine.on_closed(true)
                }
            };

            match decision {
                ReconnectDecision::Retry { attempt } => {
                    self.publish(SessionState::Reconnecting);
                    self.notifier.notify(
                        Severity::Warning,
                        &format!("sync connection lost, reconnecting (attempt {attempt})"),
                    );
                    if self.wait_reconnect_interval().await {
                        self.machine.on_closed(true);
                        self.publish(SessionState::Closed);
                        if !self.wait_for_connect().await {
                            break;
                        }
                    }
                }
                ReconnectDecision::GiveUp => {
                    self.publish(SessionState::Disconnected);
                    self.notifier.notify(
                        Severity::Error,
                        "sync connection lost and retry budget exhausted",
                    );
                    if !self.wait_for_connect().await {
                        break;
                    }
                }
                ReconnectDecision::Absorbed => {
                    self.publish(SessionState::Closed);
                    if !self.wait_for_connect().await {
                        break;
                    }
                }
            }
        }
    }

    async fn attempt(&mut self, config: &SessionConfig, url: &str) -> ReconnectDecision {
        match self.transport.connect(url).await {
            Ok(conn) => {
                self.machine.on_open();
                self.publish(SessionState::Connected);
                tracing::info!(device_id = %config.device_id, "sync session established");
                let manual = self.drive(conn).await;
                self.machine.on_closed(manual)
            }
            Err(e) => {
                tracing::warn!(error = %e, "connect failed");
                self.machine.on_closed(false)
            }
        }
    }

    /// Pump one open connection until it ends. Returns whether the end was a
    /// manual disconnect.
    async fn drive(&mut self, mut conn: Box<dyn Connection>) -> bool {
        enum Step {
            Inbound(Option<anyhow::Result<String>>),
            Command(Option<SessionCommand>),
            Heartbeat,
        }

        let period = Duration::from_millis(self.settings.heartbeat_interval_ms);
        let mut heartbeat = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            // resolve the step first so the connection borrow is released
            // before any handler needs it mutably
            let step = tokio::select! {
                frame = conn.recv_text() => Step::Inbound(frame),
                command = self.commands.recv() => Step::Command(command),
                _ = heartbeat.tick() => Step::Heartbeat,
            };

            match step {
                Step::Inbound(Some(Ok(raw))) => self.handle_frame(&raw).await,
                Step::Inbound(Some(Err(e))) => {
                    tracing::warn!(error = %e, "transport receive failed");
                    return false;
                }
                Step::Inbound(None) => {
                    tracing::info!("server closed the connection");
                    return false;
                }
                Step::Command(Some(SessionCommand::Send(message))) => {
                    if let Err(e) = conn.send_text(&message.encode()).await {
                        tracing::warn!(error = %e, "transport send failed");
                        return false;
                    }
                }
                Step::Command(Some(SessionCommand::Connect)) => {
                    tracing::debug!("connect requested while already connected");
                }
                Step::Command(Some(SessionCommand::Disconnect)) | Step::Command(None) => {
                    conn.close().await;
                    return true;
                }
                Step::Heartbeat => {
                    let ping = ClientMessage::Ping { timestamp: self.clock.now_ms() };
                    if let Err(e) = conn.send_text(&ping.encode()).await {
                        tracing::warn!(error = %e, "heartbeat send failed");
                        return false;
                    }
                }
            }
        }
    }

    async fn handle_frame(&self, raw: &str) {
        self.handler.on_frame(raw);
        match ServerMessage::decode(raw) {
            Ok(ServerMessage::Unknown(kind)) => {
                tracing::debug!(kind, "ignoring unrecognized message type");
            }
            Ok(message) => self.handler.on_message(message).await,
            Err(e) => tracing::warn!(error = %e, "dropping malformed frame"),
        }
    }

    /// Sleep out the reconnect interval, still honoring a manual disconnect.
    /// Returns true when the wait was cut short by a disconnect.
    async fn wait_reconnect_interval(&mut self) -> bool {
        let deadline = tokio::time::Instant::now()
            + Duration::from_millis(self.settings.reconnect_interval_ms);
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => return false,
                command = self.commands.recv() => match command {
                    Some(SessionCommand::Disconnect) | None => return true,
                    // skip the rest of the wait and retry with a fresh budget
                    Some(SessionCommand::Connect) => {
                        self.machine.reset();
                        return false;
                    }
                    // raced past the fail-fast check; dropped, there is no queue
                    Some(SessionCommand::Send(_)) => {}
                }
            }
        }
    }

    /// Idle until an explicit connect re-opens the session. Returns false
    /// when every handle is gone and the loop should end.
    async fn wait_for_connect(&mut self) -> bool {
        loop {
            match self.commands.recv().await {
                Some(SessionCommand::Connect) => {
                    self.machine.reset();
                    return true;
                }
                // already down; nothing to tear down
                Some(SessionCommand::Disconnect) => {}
                // raced past the fail-fast check; dropped, there is no queue
                Some(SessionCommand::Send(_)) => {}
                None => return false,
            }
        }
    }

    fn publish(&self, state: SessionState) {
        tracing::debug!(?state, "session state");
        let _ = self.state_tx.send(state);
    }
}

/// WebSocket endpoint with the device identity and token as query
/// parameters, the shape the backend authenticates.
fn connect_url(config: &SessionConfig) -> anyhow::Result<String> {
    if !config.is_configured {
        anyhow::bail!("session not configured");
    }
    let mut url = url::Url::parse(&format!("{}/ws", config.ws_base()))?;
    url.query_pairs_mut()
        .append_pair("device_id", &config.device_id)
        .append_pair("device_name", &config.device_name)
        .append_pair("token", &config.token);
    Ok(url.into())
}
