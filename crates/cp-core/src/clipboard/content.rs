use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A single classified clipboard representation.
///
/// Exactly one variant is produced per OS change notification, decided by the
/// priority order in [`SystemClipboardSnapshot::classify`]: richer formats win
/// over the plain-text shadow copies most OS clipboards populate alongside
/// them.
///
/// [`SystemClipboardSnapshot::classify`]: super::SystemClipboardSnapshot::classify
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardContent {
    Text(String),
    Image(ImageContent),
    Html(String),
    Rtf(String),
    Files(Vec<PathBuf>),
}

/// Raw image payload plus the resolved source path when the OS exposed one.
///
/// The source path, when present, gives the fingerprinter a stable identity
/// that survives re-reads of the same image.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageContent {
    pub bytes: Vec<u8>,
    pub source_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Text,
    Image,
    Html,
    Rtf,
    Files,
}

impl ClipboardContent {
    pub fn kind(&self) -> ContentKind {
        match self {
            ClipboardContent::Text(_) => ContentKind::Text,
            ClipboardContent::Image(_) => ContentKind::Image,
            ClipboardContent::Html(_) => ContentKind::Html,
            ClipboardContent::Rtf(_) => ContentKind::Rtf,
            ClipboardContent::Files(_) => ContentKind::Files,
        }
    }

    /// The string form sent inline over the wire, if this content has one.
    ///
    /// Html and Rtf survive only as their marked-up string at the sync layer;
    /// images and files are uploaded as blobs instead.
    pub fn inline_text(&self) -> Option<&str> {
        match self {
            ClipboardContent::Text(s)
            | ClipboardContent::Html(s)
            | ClipboardContent::Rtf(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ContentKind::Text => "text",
            ContentKind::Image => "image",
            ContentKind::Html => "html",
            ContentKind::Rtf => "rtf",
            ContentKind::Files => "files",
        };
        write!(f, "{s}")
    }
}
