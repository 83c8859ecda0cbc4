//! URL-keyed on-disk cache for downloaded blobs.
//!
//! The remote-apply path needs a stable local file to hand to the OS
//! clipboard write primitives, and repeated syncs of the same item must not
//! hit the network again. Files are named by the sha256 of their source URL,
//! keeping the extension from the URL path so the OS recognizes image files.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cp_core::ports::BlobCache;
use sha2::{Digest, Sha256};

pub struct DownloadCache {
    dir: PathBuf,
}

impl DownloadCache {
    pub fn new(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating download cache dir {}", dir.display()))?;
        Ok(Self { dir })
    }

    /// Cache under the platform user cache directory.
    pub fn in_user_cache(app: &str) -> Result<Self> {
        let base = dirs::cache_dir().context("no user cache directory")?;
        Self::new(base.join(app).join("downloads"))
    }

    fn path_for(&self, url: &str) -> PathBuf {
        let digest = hex::encode(Sha256::digest(url.as_bytes()));
        let path_part = url.split(['?', '#']).next().unwrap_or(url);
        let ext = Path::new(path_part)
            .extension()
            .map(|e| e.to_string_lossy().into_owned());
        let name = match ext {
            Some(ext) if !ext.is_empty() => format!("{digest}.{ext}"),
            _ => digest,
        };
        self.dir.join(name)
    }

    /// Total bytes currently cached.
    pub fn size_bytes(&self) -> u64 {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return 0;
        };
        entries
            .flatten()
            .filter_map(|e| e.metadata().ok())
            .filter(|m| m.is_file())
            .map(|m| m.len())
            .sum()
    }

    /// Delete every cached download.
    pub fn clear(&self) -> Result<()> {
        for entry in std::fs::read_dir(&self.dir)
            .with_context(|| format!("reading cache dir {}", self.dir.display()))?
        {
            let entry = entry?;
            if entry.metadata()?.is_file() {
                std::fs::remove_file(entry.path())
                    .with_context(|| format!("removing {}", entry.path().display()))?;
            }
        }
        Ok(())
    }
}

impl BlobCache for DownloadCache {
    fn lookup(&self, url: &str) -> Option<PathBuf> {
        let path = self.path_for(url);
        path.is_file().then_some(path)
    }

    fn store(&self, url: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.path_for(url);
        std::fs::write(&path, bytes)
            .with_context(|| format!("writing cache file {}", path.display()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> (DownloadCache, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let cache = DownloadCache::new(dir.path().join("downloads")).unwrap();
        (cache, dir)
    }

    #[test]
    fn store_then_lookup_round_trips() {
        let (cache, _dir) = cache();
        let url = "https://paste.test/api/v1/files/download/abc.png";

        assert!(cache.lookup(url).is_none());
        let path = cache.store(url, b"pngbytes").unwrap();
        assert_eq!(cache.lookup(url), Some(path.clone()));
        assert_eq!(std::fs::read(path).unwrap(), b"pngbytes");
    }

    #[test]
    fn file_name_keeps_url_extension() {
        let (cache, _dir) = cache();
        let path = cache
            .store("https://x.test/files/download/photo.jpg?token=1", b"x")
            .unwrap();
        assert_eq!(path.extension().unwrap(), "jpg");
    }

    #[test]
    fn urls_without_extension_still_cache() {
        let (cache, _dir) = cache();
        let url = "https://x.test/files/download/abc123";
        let path = cache.store(url, b"data").unwrap();
        assert!(path.extension().is_none());
        assert!(cache.lookup(url).is_some());
    }

    #[test]
    fn distinct_urls_get_distinct_files() {
        let (cache, _dir) = cache();
        let a = cache.store("https://x.test/a.png", b"a").unwrap();
        let b = cache.store("https://x.test/b.png", b"b").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn clear_empties_the_cache() {
        let (cache, _dir) = cache();
        cache.store("https://x.test/a.png", b"aaaa").unwrap();
        cache.store("https://x.test/b.png", b"bb").unwrap();
        assert_eq!(cache.size_bytes(), 6);

        cache.clear().unwrap();
        assert_eq!(cache.size_bytes(), 0);
        assert!(cache.lookup("https://x.test/a.png").is_none());
    }
}
