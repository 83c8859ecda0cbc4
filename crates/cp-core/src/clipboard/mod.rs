//! Clipboard content model.
//!
//! A [`SystemClipboardSnapshot`] is what the platform layer reads from the OS
//! in response to one change notification; [`ClipboardContent`] is the single
//! classified representation the sync pipeline works with afterwards. The
//! classification happens exactly once, at capture time, so downstream
//! components never re-branch on content shape.

mod content;
mod entry;
mod fingerprint;
mod image;
mod snapshot;

pub use content::{ClipboardContent, ContentKind, ImageContent};
pub use entry::{ClipboardEntry, EntryContentType};
pub use fingerprint::Fingerprint;
pub use image::ImageKind;
pub use snapshot::SystemClipboardSnapshot;
