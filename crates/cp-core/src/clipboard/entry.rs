use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-side content type of a persisted clipboard entry.
///
/// Html and Rtf collapse into `Text` at the sync layer; only the marked-up
/// string survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryContentType {
    Text,
    Image,
    File,
}

impl EntryContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryContentType::Text => "text",
            EntryContentType::Image => "image",
            EntryContentType::File => "file",
        }
    }
}

/// A persisted clipboard record as materialized into the history store.
///
/// `id` is server-assigned and unique; ordering in the store is by recency,
/// not by id, because re-syncing duplicate content moves an existing entry to
/// the top without changing its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipboardEntry {
    pub id: i64,

    /// Inline text, or the URL/id of a stored blob for image/file entries.
    pub content: String,

    pub content_type: EntryContentType,

    pub device_id: Option<String>,
    pub device_name: Option<String>,

    #[serde(default)]
    pub favorite: bool,

    pub updated_at: DateTime<Utc>,

    pub file_name: Option<String>,
    pub file_size: Option<u64>,
    pub mime_type: Option<String>,
    pub file_url: Option<String>,
}
