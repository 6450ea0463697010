//! Filesystem abstractions for the media-library scanner.
/// Provider backed by the host filesystem.
pub mod local;
/// Memoizing metadata cache facade.
pub mod meta_cache;

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Immutable snapshot of one filesystem node.
///
/// Owned by the provider that produced it; the cache layer shares and clones
/// these read-only and never mutates them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsMetadata {
    /// Absolute path of the node.
    pub path: PathBuf,
    /// Final path component.
    pub name: OsString,
    /// Whether the node is a directory.
    pub is_dir: bool,
    /// Size in bytes; zero for directories.
    pub len: u64,
    /// Last modification time, when the platform reports one.
    pub modified: Option<SystemTime>,
    /// Creation time, when the platform reports one.
    pub created: Option<SystemTime>,
}

/// The filesystem capability consumed by the cache layer.
///
/// Implementations must be stateless and reentrant: the cache calls them
/// from multiple threads without synchronization and owns all merging of
/// concurrent lookups. Faults (`io::Error`) pass through the cache layer
/// untranslated and never populate it.
pub trait FsProvider: Send + Sync {
    /// Lists the immediate children of `path` in byte-wise path order.
    ///
    /// An inaccessible or missing directory yields an empty list; only
    /// genuine I/O faults are errors.
    fn list_entries(&self, path: &Path) -> io::Result<Vec<FsMetadata>>;

    /// Resolves `path` to its metadata, or `None` if it does not exist.
    fn stat(&self, path: &Path) -> io::Result<Option<FsMetadata>>;

    /// Lists every file path reachable beneath `path`, recursively, in no
    /// particular order.
    fn list_file_paths(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Lists the paths of the immediate children of `path`. Used to test
    /// non-emptiness, so implementations may stop after the first entry.
    fn list_entry_paths(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
}
