//! Filesystem render cache.
//!
//! Directory layout:
//!
//! ```text
//! {source_dir}/
//! +-- flow.dot        # diagram source
//! +-- flow.sha256     # content hash of the committed render
//! {image_dir}/
//! +-- flow.svg        # one file per output format
//! +-- flow.png
//! ```
//!
//! The hash file is written last, so an interrupted or failed render never
//! looks fresh.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::{CacheEntry, RenderCache};

const HASH_EXT: &str = "sha256";
const DEFAULT_SOURCE_EXT: &str = "dot";

/// [`RenderCache`] backed by a source directory and an image directory.
#[derive(Debug, Clone)]
pub struct FileRenderCache {
    source_dir: PathBuf,
    image_dir: PathBuf,
    source_ext: String,
}

impl FileRenderCache {
    /// Create a cache storing sources in `source_dir` and outputs in `image_dir`.
    #[must_use]
    pub fn new(source_dir: impl Into<PathBuf>, image_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            image_dir: image_dir.into(),
            source_ext: DEFAULT_SOURCE_EXT.to_owned(),
        }
    }

    /// Set the extension of persisted source files (default `dot`).
    #[must_use]
    pub fn with_source_ext(mut self, ext: impl Into<String>) -> Self {
        self.source_ext = ext.into();
        self
    }

    /// Directory holding diagram sources and hash files.
    #[must_use]
    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Directory holding rendered images.
    #[must_use]
    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    fn hash_path(&self, cache_key: &str) -> PathBuf {
        self.source_dir.join(format!("{cache_key}.{HASH_EXT}"))
    }
}

impl RenderCache for FileRenderCache {
    fn ensure_dirs(&self) -> io::Result<()> {
        for dir in [&self.source_dir, &self.image_dir] {
            if !dir.is_dir() {
                fs::create_dir_all(dir)?;
                tracing::info!(path = %dir.display(), "Created diagram directory");
            }
        }
        Ok(())
    }

    fn entry(&self, cache_key: &str, content_hash: &str, extensions: &[&str]) -> CacheEntry {
        CacheEntry {
            cache_key: cache_key.to_owned(),
            content_hash: content_hash.to_owned(),
            source_path: self
                .source_dir
                .join(format!("{cache_key}.{}", self.source_ext)),
            output_paths: extensions
                .iter()
                .map(|ext| self.image_dir.join(format!("{cache_key}.{ext}")))
                .collect(),
        }
    }

    fn stored_hash(&self, cache_key: &str) -> Option<String> {
        let stored = fs::read_to_string(self.hash_path(cache_key)).ok()?;
        let stored = stored.trim();
        (!stored.is_empty()).then(|| stored.to_owned())
    }

    fn write_source(&self, entry: &CacheEntry, body: &str) -> io::Result<()> {
        fs::write(&entry.source_path, body)
    }

    fn commit(&self, entry: &CacheEntry) -> io::Result<()> {
        fs::write(self.hash_path(&entry.cache_key), &entry.content_hash)
    }

    fn invalidate(&self, cache_key: &str) {
        match fs::remove_file(self.hash_path(cache_key)) {
            Ok(()) => tracing::debug!(cache_key, "Invalidated cache entry"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(cache_key, error = %e, "Failed to invalidate cache entry"),
        }
    }
}
