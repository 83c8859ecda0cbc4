//! # cp-core
//!
//! Core domain models and business logic for the CloudPaste sync engine.
//!
//! This crate contains pure sync logic without any infrastructure
//! dependencies: the clipboard content model, the wire protocol spoken with
//! the backend, the connection state machine, the pipeline flag state that
//! coordinates debounce / suppression / single-flight dispatch, and the
//! ports the outer layers implement.

pub mod clipboard;
pub mod config;
pub mod device;
pub mod error;
pub mod history;
pub mod pipeline;
pub mod ports;
pub mod protocol;
pub mod session;

// Re-export commonly used types at the crate root
pub use clipboard::{
    ClipboardContent, ClipboardEntry, ContentKind, EntryContentType, Fingerprint, ImageContent,
    SystemClipboardSnapshot,
};
pub use config::{SessionConfig, SharedConfig, SyncSettings, UploadPolicy};
pub use device::{DeviceInfo, DeviceRoster};
pub use error::SyncError;
pub use history::{EntryPatch, HistoryStore};
pub use pipeline::{SyncPipelineState, Timer};
pub use protocol::{ClientMessage, ClipboardSyncData, ServerMessage};
pub use session::{ReconnectDecision, SessionMachine, SessionState};
