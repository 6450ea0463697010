//! Multi-threaded library-scan driver.
//!
//! Walks library roots through the [`MetaCache`] with a fixed pool of worker
//! threads draining one shared directory queue. The cache merges concurrent
//! lookups, so a repeat pass over an unchanged tree is mostly memory reads.

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;

use tracing::{debug, warn};

use crate::fs::FsProvider;
use crate::fs::meta_cache::MetaCache;

/// Tuning for one scan pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Worker threads draining the directory queue.
    pub workers: NonZeroUsize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            workers: thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
        }
    }
}

/// Counters reported by one scan pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    /// Directories visited.
    pub directories: u64,
    /// Files seen.
    pub files: u64,
    /// Roots skipped by the accessibility gate.
    pub skipped_roots: u64,
}

/// Shared directory queue with idle-termination.
///
/// `in_flight` counts directories handed to a worker whose children may not
/// be queued yet; workers only exit once the queue is empty *and* nothing is
/// in flight, so a late burst of children cannot be dropped.
struct WorkQueue {
    state: Mutex<QueueState>,
    wake: Condvar,
}

struct QueueState {
    pending: VecDeque<PathBuf>,
    in_flight: usize,
}

impl WorkQueue {
    fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                in_flight: 0,
            }),
            wake: Condvar::new(),
        }
    }

    fn push(&self, dir: PathBuf) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.pending.push_back(dir);
        drop(state);
        self.wake.notify_one();
    }

    /// Takes the next directory, or `None` once the scan is drained.
    fn next(&self) -> Option<PathBuf> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(dir) = state.pending.pop_front() {
                state.in_flight += 1;
                return Some(dir);
            }
            if state.in_flight == 0 {
                // Chain the shutdown to any other sleeping worker.
                self.wake.notify_all();
                return None;
            }
            state = self
                .wake
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Marks one taken directory as fully processed (children queued).
    fn done(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.in_flight -= 1;
        if state.in_flight == 0 && state.pending.is_empty() {
            drop(state);
            self.wake.notify_all();
        }
    }
}

/// Breadth-first traversal of library roots through the metadata cache.
pub struct Scanner<P> {
    cache: Arc<MetaCache<P>>,
}

impl<P: FsProvider> Scanner<P> {
    /// Creates a scanner over a shared cache instance.
    #[must_use]
    pub fn new(cache: Arc<MetaCache<P>>) -> Self {
        Self { cache }
    }

    /// Runs one scan pass over `roots`.
    ///
    /// Each root is gated on a live accessibility probe before any traversal,
    /// so a revoked mount or permission is skipped instead of served from
    /// stale cache state. Per-directory failures are logged and skipped;
    /// one failing path never aborts the pass or poisons other entries.
    pub fn scan(&self, roots: &[PathBuf], options: ScanOptions) -> ScanSummary {
        let queue = WorkQueue::new();
        let directories = AtomicU64::new(0);
        let files = AtomicU64::new(0);
        let mut skipped_roots = 0u64;

        for root in roots {
            match self.cache.is_accessible(root) {
                Ok(true) => queue.push(root.clone()),
                Ok(false) => {
                    warn!(root = %root.display(), "library root is empty or inaccessible, skipping");
                    skipped_roots += 1;
                }
                Err(error) => {
                    warn!(root = %root.display(), %error, "accessibility probe failed, skipping root");
                    skipped_roots += 1;
                }
            }
        }

        thread::scope(|scope| {
            for _ in 0..options.workers.get() {
                scope.spawn(|| self.work(&queue, &directories, &files));
            }
        });

        let summary = ScanSummary {
            directories: directories.load(Ordering::Relaxed),
            files: files.load(Ordering::Relaxed),
            skipped_roots,
        };
        debug!(
            directories = summary.directories,
            files = summary.files,
            skipped_roots = summary.skipped_roots,
            "scan pass finished"
        );
        summary
    }

    fn work(&self, queue: &WorkQueue, directories: &AtomicU64, files: &AtomicU64) {
        while let Some(dir) = queue.next() {
            directories.fetch_add(1, Ordering::Relaxed);
            match self.cache.entries(&dir) {
                Ok(entries) => {
                    for entry in entries.iter() {
                        if entry.is_dir {
                            queue.push(entry.path.clone());
                        } else {
                            files.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
                Err(error) => {
                    warn!(path = %dir.display(), %error, "failed to list directory");
                }
            }
            queue.done();
        }
    }
}
