//! # cp-platform
//!
//! Adapters implementing the `cp-core` ports against the real world: the OS
//! clipboard via clipboard-rs, the sync backend's WebSocket endpoint via
//! tokio-tungstenite, its REST blob endpoints via reqwest, and a URL-keyed
//! on-disk cache for downloaded blobs.

pub mod cache;
pub mod clipboard;
pub mod notify;
pub mod rest;
pub mod transport;

pub use cache::DownloadCache;
pub use clipboard::DesktopClipboard;
pub use notify::TracingNotifier;
pub use rest::RestBlobClient;
pub use transport::WsTransport;
