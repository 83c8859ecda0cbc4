//! Ports: the interfaces the sync core expects its host to supply.
//!
//! The platform layer (low-level) implements these abstractions; the
//! application layer (high-level) consumes them, never the concrete types.

mod blob;
mod clipboard;
mod clock;
mod notifier;
mod transport;

pub use blob::{BlobCache, BlobTransfer, StoredBlob};
pub use clipboard::SystemClipboard;
pub use clock::{Clock, SystemClock};
pub use notifier::{Notifier, Severity};
pub use transport::{Connection, Transport};
