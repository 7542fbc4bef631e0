//! BLAKE3 file hasher with streaming and memory-mapped modes.
//!
//! # Overview
//! This module provides the [`Hasher`] struct for computing BLAKE3 digests
//! over a file's entire content. Small files are read in fixed-size chunks;
//! with memory mapping enabled, files at or above the threshold are mapped
//! and hashed in one pass. Both modes read every byte and produce the same
//! digest.
//!
//! Digesting sits behind the [`ContentDigest`] trait so the comparator can be
//! driven by an instrumented implementation in tests.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use memmap2::Mmap;

use super::HashError;

/// A 32-byte BLAKE3 digest.
pub type Hash = [u8; 32];

/// Read buffer for streaming hashing (64 KiB).
pub const BUFFER_SIZE: usize = 64 * 1024;

/// Default size at which memory mapping kicks in when enabled (16 MiB).
pub const DEFAULT_MMAP_THRESHOLD: u64 = 16 * 1024 * 1024;

/// Computes a full-content fingerprint for a file.
pub trait ContentDigest: Send + Sync {
    /// Digest every byte of the file at `path`.
    ///
    /// # Errors
    ///
    /// [`HashError`] if the file cannot be opened or read.
    fn full_hash(&self, path: &Path) -> Result<Hash, HashError>;
}

/// BLAKE3 content hasher.
#[derive(Debug, Clone)]
pub struct Hasher {
    mmap: bool,
    mmap_threshold: u64,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a streaming hasher with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            mmap: false,
            mmap_threshold: DEFAULT_MMAP_THRESHOLD,
        }
    }

    /// Enable or disable memory-mapped hashing.
    #[must_use]
    pub fn with_mmap(mut self, enabled: bool) -> Self {
        self.mmap = enabled;
        self
    }

    /// Minimum file size for memory mapping.
    #[must_use]
    pub fn with_mmap_threshold(mut self, threshold: u64) -> Self {
        self.mmap_threshold = threshold;
        self
    }

    /// Hash the full content of a file.
    ///
    /// # Errors
    ///
    /// [`HashError`] if the file cannot be opened, mapped or read.
    pub fn full_hash(&self, path: &Path) -> Result<Hash, HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let len = file
            .metadata()
            .map_err(|e| HashError::from_io(path, e))?
            .len();

        // Zero-length files cannot be mapped.
        if self.mmap && len > 0 && len >= self.mmap_threshold {
            log::trace!("Hashing {} via mmap ({} bytes)", path.display(), len);
            self.hash_mapped(path, &file)
        } else {
            log::trace!("Hashing {} via streaming ({} bytes)", path.display(), len);
            self.hash_streaming(path, file)
        }
    }

    fn hash_streaming(&self, path: &Path, mut file: File) -> Result<Hash, HashError> {
        let mut hasher = blake3::Hasher::new();
        let mut buffer = vec![0u8; BUFFER_SIZE];

        loop {
            let read = match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(HashError::from_io(path, e)),
            };
            hasher.update(&buffer[..read]);
        }

        Ok(*hasher.finalize().as_bytes())
    }

    fn hash_mapped(&self, path: &Path, file: &File) -> Result<Hash, HashError> {
        // SAFETY: the map is read-only and dropped before returning. A file
        // truncated underneath us can fault; runs assume a quiescent tree.
        let map = unsafe { Mmap::map(file) }.map_err(|e| HashError::from_io(path, e))?;
        let mut hasher = blake3::Hasher::new();
        hasher.update(&map);
        Ok(*hasher.finalize().as_bytes())
    }
}

impl ContentDigest for Hasher {
    fn full_hash(&self, path: &Path) -> Result<Hash, HashError> {
        Hasher::full_hash(self, path)
    }
}

/// Render a digest as lowercase hex.
#[must_use]
pub fn hash_to_hex(hash: &Hash) -> String {
    hash.iter().map(|b| format!("{:02x}", b)).collect()
}
