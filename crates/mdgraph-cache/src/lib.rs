//! Render cache for externally rendered diagrams.
//!
//! A rendered diagram is persisted as one source file plus one output file per
//! image format, all named by a cache key. Next to the source sits the content
//! hash of the body that produced the outputs; a later conversion compares it
//! with the current hash to decide whether to render again.
//!
//! The [`RenderCache`] trait decouples the diagram handler from the storage
//! mechanism; [`FileRenderCache`] is the filesystem implementation.
//!
//! # Example
//!
//! ```
//! use mdgraph_cache::{FileRenderCache, RenderCache};
//!
//! let tmp = tempfile::tempdir().unwrap();
//! let cache = FileRenderCache::new(tmp.path().join("src"), tmp.path().join("img"));
//! cache.ensure_dirs().unwrap();
//!
//! let entry = cache.entry("flow", "abc123", &["svg"]);
//! assert!(!cache.is_fresh(&entry));
//!
//! cache.write_source(&entry, "digraph { a -> b }").unwrap();
//! std::fs::write(&entry.output_paths[0], "<svg/>").unwrap();
//! cache.commit(&entry).unwrap();
//! assert!(cache.is_fresh(&entry));
//! ```

use std::io;
use std::path::PathBuf;

mod file;
pub use file::FileRenderCache;

/// Files belonging to one cached diagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Filesystem-safe name shared by all files of the entry.
    pub cache_key: String,
    /// Hash of the diagram body these files were (or will be) rendered from.
    pub content_hash: String,
    /// Persisted diagram source.
    pub source_path: PathBuf,
    /// One output file per requested format, in request order.
    pub output_paths: Vec<PathBuf>,
}

/// Persistent store for rendered diagrams.
///
/// Entries survive across conversions and are never cleared by the pipeline.
pub trait RenderCache {
    /// Create the source and image directories if absent.
    ///
    /// Called once per conversion, before any entry is touched.
    fn ensure_dirs(&self) -> io::Result<()>;

    /// Describe the entry for `cache_key` rendered to the given extensions.
    fn entry(&self, cache_key: &str, content_hash: &str, extensions: &[&str]) -> CacheEntry;

    /// Hash recorded by the last successful [`commit`](Self::commit) for `cache_key`.
    fn stored_hash(&self, cache_key: &str) -> Option<String>;

    /// Persist the diagram source for rendering.
    fn write_source(&self, entry: &CacheEntry, body: &str) -> io::Result<()>;

    /// Record the entry's content hash after every output was rendered.
    fn commit(&self, entry: &CacheEntry) -> io::Result<()>;

    /// Forget the recorded hash so the next lookup misses.
    fn invalidate(&self, cache_key: &str);

    /// Whether the recorded hash matches and every output file exists.
    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        self.stored_hash(&entry.cache_key)
            .is_some_and(|hash| hash == entry.content_hash)
            && entry.output_paths.iter().all(|path| path.exists())
    }
}
