/// Image container kinds the sync layer recognizes by file signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
}

impl ImageKind {
    /// Sniff the container from leading signature bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            Some(ImageKind::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageKind::Jpeg)
        } else if bytes.starts_with(&[0x47, 0x49, 0x46, 0x38]) {
            Some(ImageKind::Gif)
        } else {
            None
        }
    }

    /// Resolve the kind for downloaded bytes: signature first, then the
    /// declared MIME type, finally defaulting to PNG.
    pub fn infer(bytes: &[u8], declared_mime: Option<&str>) -> Self {
        if let Some(kind) = Self::sniff(bytes) {
            return kind;
        }
        match declared_mime {
            Some("image/jpeg") | Some("image/jpg") => ImageKind::Jpeg,
            Some("image/gif") => ImageKind::Gif,
            _ => ImageKind::Png,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpg",
            ImageKind::Gif => "gif",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Gif => "image/gif",
        }
    }
}
