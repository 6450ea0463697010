//! Memoizing facade over an [`FsProvider`].
//!
//! Three independent tables share one capacity/TTL policy: directory entry
//! lists, single-entry lookups, and recursive file-path enumerations.
//! Repeated library-scan passes over the same tree hit the tables instead of
//! the filesystem; misses are merged so the provider runs once per key no
//! matter how many workers ask.
//!
//! Consumers receive one constructed instance (typically behind an [`Arc`])
//! from startup wiring. There is no process-wide state: owning a `MetaCache`
//! is the readiness contract.

use std::io;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bitflags::bitflags;
use tracing::trace;

use crate::cache::lru::LruTtlCache;
use crate::fs::{FsMetadata, FsProvider};

/// Idle window after which a cached entry is dropped regardless of capacity
/// pressure. Bounds staleness against out-of-band filesystem changes, which
/// this layer does not watch for.
const IDLE_EXPIRY: Duration = Duration::from_secs(10 * 60);

const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(4096) {
    Some(capacity) => capacity,
    None => panic!("default capacity is non-zero"),
};

/// Construction-time tuning for [`MetaCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    /// Maximum live entries per table; the three tables share the value.
    pub capacity: NonZeroUsize,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

bitflags! {
    /// Options for [`MetaCache::file_paths_with`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FilePathsRequest: u8 {
        /// Drop the cached list before lookup, forcing a fresh provider
        /// call. The only explicit invalidation path in the cache.
        const INVALIDATE = 1 << 0;
        /// Sort the cached list in place (byte-wise path order). Later
        /// callers that omit this flag observe the sorted order; callers
        /// that need deterministic order must pass it on every call.
        const SORT = 1 << 1;
    }
}

/// Process-lifetime filesystem metadata cache.
///
/// Paths are compared byte-for-byte ([`PathBuf`] equality) with no
/// normalization, so `/a` and `/a/` are distinct keys.
pub struct MetaCache<P> {
    provider: Arc<P>,
    entry_lists: LruTtlCache<PathBuf, Arc<[FsMetadata]>>,
    single_entries: LruTtlCache<PathBuf, FsMetadata>,
    file_paths: LruTtlCache<PathBuf, Vec<PathBuf>>,
}

impl<P: FsProvider> MetaCache<P> {
    /// Creates the three tables with a shared capacity and the fixed
    /// ten-minute idle expiry.
    #[must_use]
    pub fn new(provider: Arc<P>, options: CacheOptions) -> Self {
        Self {
            provider,
            entry_lists: LruTtlCache::new(options.capacity, IDLE_EXPIRY),
            single_entries: LruTtlCache::new(options.capacity, IDLE_EXPIRY),
            file_paths: LruTtlCache::new(options.capacity, IDLE_EXPIRY),
        }
    }

    /// Returns the immediate children of `path` as a shared snapshot.
    ///
    /// The exact memoized array is returned to every caller; concurrent
    /// misses on one key trigger a single provider listing.
    pub fn entries(&self, path: &Path) -> io::Result<Arc<[FsMetadata]>> {
        self.entry_lists.get_or_try_init(path, || {
            trace!(path = %path.display(), "listing directory");
            self.provider.list_entries(path).map(Arc::from)
        })
    }

    /// The children of `path` that are directories.
    ///
    /// Re-filters the cached listing on every call; no separate storage.
    pub fn directories(&self, path: &Path) -> io::Result<Vec<FsMetadata>> {
        Ok(self
            .entries(path)?
            .iter()
            .filter(|entry| entry.is_dir)
            .cloned()
            .collect())
    }

    /// The children of `path` that are not directories.
    pub fn files(&self, path: &Path) -> io::Result<Vec<FsMetadata>> {
        Ok(self
            .entries(path)?
            .iter()
            .filter(|entry| !entry.is_dir)
            .cloned()
            .collect())
    }

    /// Metadata for exactly `path`, or `None` if it does not exist.
    ///
    /// Only confirmed existence is cached: a missing path is re-probed on
    /// every call rather than memoized as absent.
    pub fn entry(&self, path: &Path) -> io::Result<Option<FsMetadata>> {
        self.single_entries.get_or_try_probe(path, || {
            trace!(path = %path.display(), "probing entry");
            self.provider.stat(path)
        })
    }

    /// Like [`entry`](Self::entry), but `None` for directories. The probed
    /// metadata is still cached in the shared single-entry table.
    pub fn file(&self, path: &Path) -> io::Result<Option<FsMetadata>> {
        Ok(self.entry(path)?.filter(|entry| !entry.is_dir))
    }

    /// Like [`entry`](Self::entry), but `None` for non-directories.
    pub fn directory(&self, path: &Path) -> io::Result<Option<FsMetadata>> {
        Ok(self.entry(path)?.filter(|entry| entry.is_dir))
    }

    /// Every file path reachable beneath `path`, in cached order.
    pub fn file_paths(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        self.file_paths_with(path, FilePathsRequest::empty())
    }

    /// Every file path reachable beneath `path`, honoring `request`.
    ///
    /// Returns an owned snapshot. A `SORT` request sorts the cached list
    /// itself, so the new order is what later callers observe.
    pub fn file_paths_with(
        &self,
        path: &Path,
        request: FilePathsRequest,
    ) -> io::Result<Vec<PathBuf>> {
        if request.contains(FilePathsRequest::INVALIDATE) {
            self.file_paths.remove(path);
        }

        let mut paths = self.file_paths.get_or_try_init(path, || {
            trace!(path = %path.display(), "enumerating file paths");
            self.provider.list_file_paths(path)
        })?;

        if request.contains(FilePathsRequest::SORT) {
            match self.file_paths.update(path, |cached| {
                cached.sort_unstable();
                cached.clone()
            }) {
                Some(sorted) => paths = sorted,
                // Evicted or repopulating since the fetch; sort the snapshot.
                None => paths.sort_unstable(),
            }
        }
        Ok(paths)
    }

    /// Whether at least one entry exists directly under `path`.
    ///
    /// Always a live provider call, bypassing every table: this is a
    /// permission probe, and a stale cached "yes" could mask a revoked
    /// mount or permission.
    pub fn is_accessible(&self, path: &Path) -> io::Result<bool> {
        Ok(!self.provider.list_entry_paths(path)?.is_empty())
    }
}
