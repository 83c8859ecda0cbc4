use std::path::PathBuf;

use super::{ClipboardContent, ImageContent};

/// Everything the platform layer managed to read from the OS clipboard in
/// response to a single change notification.
///
/// Empty strings and empty lists are treated as absent representations; an OS
/// event that yields nothing classifies to `None` and is dropped as a
/// transient, not reported as an error.
#[derive(Debug, Clone, Default)]
pub struct SystemClipboardSnapshot {
    /// Unix epoch millis at read time.
    pub ts_ms: i64,
    pub text: Option<String>,
    pub html: Option<String>,
    pub rtf: Option<String>,
    pub image: Option<ImageContent>,
    pub files: Vec<PathBuf>,
}

impl SystemClipboardSnapshot {
    /// Select exactly one representation by the total priority order
    /// `Files > Image > Html (when no Rtf present) > Rtf > Text`.
    ///
    /// Html only wins when Rtf is absent: when both exist the Html copy is
    /// usually a lossy export of the Rtf original.
    pub fn classify(self) -> Option<ClipboardContent> {
        let html = self.html.filter(|s| !s.is_empty());
        let rtf = self.rtf.filter(|s| !s.is_empty());
        let text = self.text.filter(|s| !s.is_empty());
        let image = self.image.filter(|i| !i.bytes.is_empty());

        if !self.files.is_empty() {
            return Some(ClipboardContent::Files(self.files));
        }
        if let Some(image) = image {
            return Some(ClipboardContent::Image(image));
        }
        match (html, rtf) {
            (Some(html), None) => return Some(ClipboardContent::Html(html)),
            (_, Some(rtf)) => return Some(ClipboardContent::Rtf(rtf)),
            (None, None) => {}
        }
        text.map(ClipboardContent::Text)
    }
}
