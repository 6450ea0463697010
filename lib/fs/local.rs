//! An implementation of the provider that directly overlays the host
//! filesystem.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::fs::{FsMetadata, FsProvider};

/// [`FsProvider`] over the local filesystem via `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

/// Directory-open failures that mean "nothing to list here" rather than a
/// fault: the provider contract reports these as empty listings.
fn is_unlistable(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied | io::ErrorKind::NotADirectory
    )
}

fn snapshot(path: PathBuf, meta: &fs::Metadata) -> FsMetadata {
    FsMetadata {
        name: path
            .file_name()
            .map_or_else(|| path.as_os_str().to_owned(), ToOwned::to_owned),
        is_dir: meta.is_dir(),
        len: if meta.is_dir() { 0 } else { meta.len() },
        modified: meta.modified().ok(),
        created: meta.created().ok(),
        path,
    }
}

impl FsProvider for LocalFs {
    fn list_entries(&self, path: &Path) -> io::Result<Vec<FsMetadata>> {
        let read = match fs::read_dir(path) {
            Ok(read) => read,
            Err(error) if is_unlistable(&error) => {
                warn!(path = %path.display(), %error, "directory is not listable");
                return Ok(Vec::new());
            }
            Err(error) => return Err(error),
        };

        let mut entries = Vec::new();
        for dirent in read {
            let child = dirent?.path();
            // Follows symlinks so a linked directory carries the directory
            // flag. A broken link is skipped, not a listing failure.
            match fs::metadata(&child) {
                Ok(meta) => entries.push(snapshot(child, &meta)),
                Err(error) => {
                    warn!(path = %child.display(), %error, "skipping unreadable entry");
                }
            }
        }
        entries.sort_unstable_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    fn stat(&self, path: &Path) -> io::Result<Option<FsMetadata>> {
        match fs::metadata(path) {
            Ok(meta) => Ok(Some(snapshot(path.to_path_buf(), &meta))),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error),
        }
    }

    fn list_file_paths(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut pending = vec![path.to_path_buf()];
        while let Some(dir) = pending.pop() {
            let read = match fs::read_dir(&dir) {
                Ok(read) => read,
                Err(error) if is_unlistable(&error) => {
                    warn!(path = %dir.display(), %error, "skipping unlistable directory");
                    continue;
                }
                Err(error) => return Err(error),
            };
            for dirent in read {
                let dirent = dirent?;
                let file_type = dirent.file_type()?;
                let child = dirent.path();
                if file_type.is_dir() {
                    pending.push(child);
                } else if file_type.is_symlink() {
                    // Linked files count; linked directories are not
                    // descended into (cycle hazard) and are expected to be
                    // listed as roots of their own.
                    match fs::metadata(&child) {
                        Ok(meta) if !meta.is_dir() => files.push(child),
                        Ok(_) => {}
                        Err(error) => {
                            warn!(path = %child.display(), %error, "skipping broken link");
                        }
                    }
                } else {
                    files.push(child);
                }
            }
        }
        Ok(files)
    }

    fn list_entry_paths(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let read = match fs::read_dir(path) {
            Ok(read) => read,
            Err(error) if is_unlistable(&error) => return Ok(Vec::new()),
            Err(error) => return Err(error),
        };
        let mut paths = Vec::new();
        for dirent in read {
            paths.push(dirent?.path());
        }
        Ok(paths)
    }
}
