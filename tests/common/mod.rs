#![allow(dead_code, missing_docs, clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use media_scan::fs::{FsMetadata, FsProvider};

/// A programmable in-memory provider that counts every call.
#[derive(Default)]
pub struct MockFs {
    dirs: Mutex<HashMap<PathBuf, Vec<FsMetadata>>>,
    stats: Mutex<HashMap<PathBuf, FsMetadata>>,
    file_lists: Mutex<HashMap<PathBuf, Vec<PathBuf>>>,
    failing: Mutex<HashSet<PathBuf>>,
    latency: Mutex<Duration>,
    pub list_entries_calls: AtomicUsize,
    pub stat_calls: AtomicUsize,
    pub list_file_paths_calls: AtomicUsize,
    pub list_entry_paths_calls: AtomicUsize,
}

impl MockFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a directory with its immediate children. The children are
    /// also what the accessibility probe sees.
    pub fn add_dir(&self, path: &str, children: Vec<FsMetadata>) {
        self.dirs
            .lock()
            .unwrap()
            .insert(PathBuf::from(path), children);
    }

    /// Registers a stat result for exactly `meta.path`.
    pub fn add_entry(&self, meta: FsMetadata) {
        self.stats.lock().unwrap().insert(meta.path.clone(), meta);
    }

    /// Registers the recursive file-path listing for a root.
    pub fn set_file_paths(&self, path: &str, paths: &[&str]) {
        self.file_lists
            .lock()
            .unwrap()
            .insert(PathBuf::from(path), paths.iter().map(PathBuf::from).collect());
    }

    /// Makes every provider call for `path` fail with `PermissionDenied`.
    pub fn fail_path(&self, path: &str) {
        self.failing.lock().unwrap().insert(PathBuf::from(path));
    }

    pub fn clear_failure(&self, path: &str) {
        self.failing.lock().unwrap().remove(Path::new(path));
    }

    /// Adds artificial latency to every provider call so concurrent misses
    /// genuinely overlap.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    fn observe(&self, counter: &AtomicUsize, path: &Path) -> io::Result<()> {
        counter.fetch_add(1, Ordering::SeqCst);
        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            std::thread::sleep(latency);
        }
        if self.failing.lock().unwrap().contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "mock provider failure",
            ));
        }
        Ok(())
    }
}

impl FsProvider for MockFs {
    fn list_entries(&self, path: &Path) -> io::Result<Vec<FsMetadata>> {
        self.observe(&self.list_entries_calls, path)?;
        Ok(self
            .dirs
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .unwrap_or_default())
    }

    fn stat(&self, path: &Path) -> io::Result<Option<FsMetadata>> {
        self.observe(&self.stat_calls, path)?;
        Ok(self.stats.lock().unwrap().get(path).cloned())
    }

    fn list_file_paths(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        self.observe(&self.list_file_paths_calls, path)?;
        Ok(self
            .file_lists
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .unwrap_or_default())
    }

    fn list_entry_paths(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        self.observe(&self.list_entry_paths_calls, path)?;
        Ok(self
            .dirs
            .lock()
            .unwrap()
            .get(path)
            .map(|children| children.iter().map(|child| child.path.clone()).collect())
            .unwrap_or_default())
    }
}

/// Directory metadata with fixed attributes.
pub fn dir_meta(path: &str) -> FsMetadata {
    build_meta(path, true, 0)
}

/// File metadata with a small fixed length.
pub fn file_meta(path: &str) -> FsMetadata {
    build_meta(path, false, 1024)
}

fn build_meta(path: &str, is_dir: bool, len: u64) -> FsMetadata {
    let path = PathBuf::from(path);
    FsMetadata {
        name: path.file_name().map(ToOwned::to_owned).unwrap_or_default(),
        is_dir,
        len,
        modified: None,
        created: None,
        path,
    }
}
