//! # cp-app
//!
//! Application layer of the CloudPaste sync engine: use cases wired from the
//! domain types and ports in `cp-core`.
//!
//! The split of responsibilities:
//! - [`session`] runs the WebSocket session lifecycle (connect, heartbeat,
//!   reconnect, fail-fast sends) around the pure `SessionMachine`.
//! - [`outbound`] drives local clipboard events through the dispatch gates
//!   (`SyncPipelineState`) and hands accepted candidates to the uploader.
//! - [`uploader`] turns accepted content into wire payloads, uploading blobs
//!   for images and files.
//! - [`applier`] consumes inbound server messages: history materialization,
//!   clipboard write-back, device roster updates.
//! - [`engine`] assembles all of the above into one running unit.

pub mod applier;
pub mod engine;
pub mod outbound;
pub mod session;
pub mod uploader;

pub use applier::RemoteChangeApplier;
pub use engine::{SyncEngine, SyncEngineDeps};
pub use outbound::{run_outbound_pipeline, SyncSender};
pub use session::{InboundHandler, SessionHandle, SyncSession};
pub use uploader::Uploader;
