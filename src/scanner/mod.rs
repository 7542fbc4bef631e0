//! Scanner module for directory traversal and file hashing.
//!
//! This module provides functionality for:
//! - Directory walking as queued per-directory work
//! - Content hashing with BLAKE3
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: scans one directory, inserting files into the bucket table
//!   and handing subdirectories back as new work
//! - [`hasher`]: BLAKE3 file hashing (streaming or memory-mapped)
//!
//! # Example
//!
//! ```no_run
//! use find_dupes::duplicates::BucketTable;
//! use find_dupes::scanner::Walker;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let table = Arc::new(BucketTable::new(1024).unwrap());
//! let walker = Walker::new(Arc::clone(&table), Arc::new(|| false));
//!
//! let mut pending = vec![Path::new(".").to_path_buf()];
//! while let Some(dir) = pending.pop() {
//!     walker.scan_dir(&dir, |sub| pending.push(sub)).unwrap();
//! }
//! println!("Found {} files", table.total_count());
//! ```

pub mod hasher;
pub mod walker;

use std::path::{Path, PathBuf};

// Re-export main types
pub use hasher::{hash_to_hex, ContentDigest, Hash, Hasher};
pub use walker::{DirOutcome, Walker};

/// A discovered regular file.
///
/// The size is the bucket key. The digest stays `None` until a comparison
/// needs it and is computed at most once; `matched` flips to `true` when the
/// file joins a duplicate group and never flips back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Cached content digest
    pub digest: Option<Hash>,
    /// Whether the file was absorbed into an earlier duplicate group
    pub matched: bool,
}

impl FileEntry {
    /// Create a new FileEntry with no digest.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the file
    /// * `size` - File size in bytes
    #[must_use]
    pub fn new(path: PathBuf, size: u64) -> Self {
        Self {
            path,
            size,
            digest: None,
            matched: false,
        }
    }
}

/// Errors that can occur during directory scanning.
///
/// Every variant is fatal: a scan that skips an unreadable directory would
/// report files as unique that may have duplicates in it.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    /// Classify an I/O error raised for `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match error.kind() {
            ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}

/// Errors that can occur during file hashing.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// Classify an I/O error raised while hashing `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match error.kind() {
            ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}

/// Check that a source path exists and is a directory.
///
/// # Errors
///
/// [`ScanError::NotFound`] or [`ScanError::NotADirectory`].
pub fn validate_root(path: &Path) -> Result<(), ScanError> {
    let metadata = std::fs::metadata(path).map_err(|e| ScanError::from_io(path, e))?;
    if !metadata.is_dir() {
        return Err(ScanError::NotADirectory(path.to_path_buf()));
    }
    Ok(())
}
