//! Recursive folder scanner producing the input file list for a job.
//!
//! The scan is lazy (an iterator, not a collected list), restartable (no
//! cursor state survives between calls), and safe against symlink loops:
//! every directory is canonicalized before descent and visited real
//! paths are never entered twice. Root inaccessibility fails the scan
//! up front, before anything is yielded. Errors on
//! individual entries are logged and skipped; they never abort the scan.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use folio_core::scanning::is_supported_file;

/// A file discovered by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Why a scan could not start.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Input root not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Permission denied reading input root: {0}")]
    PermissionDenied(PathBuf),

    #[error("Input root is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Failed to open input root {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn root_error(path: &Path, source: io::Error) -> ScanError {
    match source.kind() {
        io::ErrorKind::NotFound => ScanError::PathNotFound(path.to_path_buf()),
        io::ErrorKind::PermissionDenied => ScanError::PermissionDenied(path.to_path_buf()),
        _ => ScanError::Io {
            path: path.to_path_buf(),
            source,
        },
    }
}

/// Entry point for folder scans.
pub struct Scanner;

impl Scanner {
    /// Start a scan of `root`, yielding supported files lazily.
    ///
    /// Fails fast with [`ScanError::PathNotFound`] /
    /// [`ScanError::PermissionDenied`] if the root is inaccessible. When
    /// `recursive` is false only the root directory itself is read.
    pub fn scan(root: &Path, recursive: bool) -> Result<FolderScan, ScanError> {
        let metadata = fs::metadata(root).map_err(|e| root_error(root, e))?;
        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }

        let canonical = fs::canonicalize(root).map_err(|e| root_error(root, e))?;
        let read_dir = fs::read_dir(root).map_err(|e| root_error(root, e))?;

        let mut visited = HashSet::new();
        visited.insert(canonical);

        Ok(FolderScan {
            stack: vec![read_dir],
            visited,
            recursive,
        })
    }
}

/// Lazy depth-first traversal over one input root.
pub struct FolderScan {
    stack: Vec<fs::ReadDir>,
    visited: HashSet<PathBuf>,
    recursive: bool,
}

impl FolderScan {
    /// Descend into a directory unless its real path was already visited
    /// (symlink loop or duplicate link).
    fn enter_directory(&mut self, path: &Path) {
        let real = match fs::canonicalize(path) {
            Ok(real) => real,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unresolvable directory");
                return;
            }
        };
        if !self.visited.insert(real) {
            tracing::debug!(path = %path.display(), "Skipping already-visited directory");
            return;
        }
        match fs::read_dir(path) {
            Ok(read_dir) => self.stack.push(read_dir),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable directory");
            }
        }
    }
}

impl Iterator for FolderScan {
    type Item = FileEntry;

    fn next(&mut self) -> Option<FileEntry> {
        loop {
            let dir = self.stack.last_mut()?;
            let entry = match dir.next() {
                None => {
                    self.stack.pop();
                    continue;
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Skipping unreadable directory entry");
                    continue;
                }
                Some(Ok(entry)) => entry,
            };

            let path = entry.path();
            // Follow symlinks here so linked files and folders are
            // included; loop protection happens in enter_directory.
            let metadata = match fs::metadata(&path) {
                Ok(metadata) => metadata,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable entry");
                    continue;
                }
            };

            if metadata.is_dir() {
                if self.recursive {
                    self.enter_directory(&path);
                }
                continue;
            }

            if is_supported_file(&path) {
                return Some(FileEntry {
                    path,
                    size_bytes: metadata.len(),
                });
            }
        }
    }
}
