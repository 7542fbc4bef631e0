//! Per-directory scanner feeding the bucket table.
//!
//! # Overview
//!
//! [`Walker::scan_dir`] processes exactly one directory: regular files are
//! stat'ed and inserted into the [`BucketTable`] right away, while every
//! subdirectory is handed to the caller's `spawn` callback. The finder turns
//! each spawned directory into a new queued work item, so a deep tree becomes
//! many independent items spread across the pool.
//!
//! Entry types are read without following links: symbolic links, sockets,
//! devices and other non-regular entries are skipped. Any error while
//! listing the directory or reading an entry's metadata is fatal.
//!
//! The stop check is polled once per directory entry.
//!
//! # Example
//!
//! ```no_run
//! use find_dupes::duplicates::BucketTable;
//! use find_dupes::scanner::{DirOutcome, Walker};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let table = Arc::new(BucketTable::new(1024).unwrap());
//! let walker = Walker::new(Arc::clone(&table), Arc::new(|| false));
//!
//! let mut subdirs = Vec::new();
//! match walker.scan_dir(Path::new("."), |dir| subdirs.push(dir)).unwrap() {
//!     DirOutcome::Completed { files, .. } => println!("{} files here", files),
//!     DirOutcome::Cancelled => println!("cancelled"),
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::{FileEntry, ScanError};
use crate::duplicates::BucketTable;
use crate::signal::StopCheck;

/// Result of scanning one directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirOutcome {
    /// Every entry was visited.
    Completed {
        /// Regular files inserted into the table
        files: usize,
        /// Subdirectories handed to `spawn`
        subdirs: usize,
    },
    /// The stop check fired before the listing was exhausted.
    Cancelled,
}

/// Scans directories into a shared [`BucketTable`].
pub struct Walker {
    table: Arc<BucketTable>,
    stop: StopCheck,
    files_found: AtomicU64,
    dirs_scanned: AtomicU64,
}

impl Walker {
    /// Create a walker inserting into `table` and polling `stop`.
    #[must_use]
    pub fn new(table: Arc<BucketTable>, stop: StopCheck) -> Self {
        Self {
            table,
            stop,
            files_found: AtomicU64::new(0),
            dirs_scanned: AtomicU64::new(0),
        }
    }

    /// Files inserted so far, across all threads.
    #[must_use]
    pub fn files_found(&self) -> u64 {
        self.files_found.load(Ordering::Relaxed)
    }

    /// Directories fully scanned so far.
    #[must_use]
    pub fn dirs_scanned(&self) -> u64 {
        self.dirs_scanned.load(Ordering::Relaxed)
    }

    /// Scan a single directory.
    ///
    /// # Errors
    ///
    /// [`ScanError`] if the directory cannot be listed or an entry's type or
    /// metadata cannot be read.
    pub fn scan_dir(
        &self,
        dir: &Path,
        mut spawn: impl FnMut(PathBuf),
    ) -> Result<DirOutcome, ScanError> {
        let mut entries = fs::read_dir(dir).map_err(|e| ScanError::from_io(dir, e))?;
        let mut files = 0;
        let mut subdirs = 0;

        loop {
            if (self.stop)() {
                log::debug!("Scan of {} stopped early", dir.display());
                return Ok(DirOutcome::Cancelled);
            }

            // read_dir never yields "." or "..".
            let Some(entry) = entries.next() else {
                break;
            };
            let entry = entry.map_err(|e| ScanError::from_io(dir, e))?;
            let path = entry.path();
            let file_type = entry
                .file_type()
                .map_err(|e| ScanError::from_io(&path, e))?;

            if file_type.is_dir() {
                log::trace!("Queueing directory: {}", path.display());
                spawn(path);
                subdirs += 1;
            } else if file_type.is_file() {
                let size = entry
                    .metadata()
                    .map_err(|e| ScanError::from_io(&path, e))?
                    .len();
                self.table.insert(FileEntry::new(path, size));
                files += 1;
            } else {
                log::trace!("Skipping non-regular entry: {}", path.display());
            }
        }

        self.files_found.fetch_add(files as u64, Ordering::Relaxed);
        self.dirs_scanned.fetch_add(1, Ordering::Relaxed);
        log::trace!(
            "Scanned {}: {} files, {} subdirectories",
            dir.display(),
            files,
            subdirs
        );

        Ok(DirOutcome::Completed { files, subdirs })
    }
}

impl std::fmt::Debug for Walker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Walker")
            .field("files_found", &self.files_found())
            .field("dirs_scanned", &self.dirs_scanned())
            .finish()
    }
}
