//! Size-sharded bucket table.
//!
//! Files are spread over `table_size` buckets by `size & (table_size - 1)`,
//! so every file of a given size lands in the same bucket (a bucket may still
//! hold several sizes). Zero-length files go to a separate extras list and are
//! never compared.
//!
//! Each bucket carries a one-shot claim marker. The compare phase claims a
//! bucket before touching it, which turns "one comparator per bucket" into a
//! checked invariant rather than an assumption.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::engine::ConcurrentList;
use crate::scanner::FileEntry;

/// Base number of buckets; the CLI scale factor multiplies this.
pub const BASE_TABLE_SIZE: usize = 1024;

/// Table size for a scale factor: `BASE_TABLE_SIZE * scale`.
///
/// # Errors
///
/// [`TableError::InvalidSize`] carrying `scale` if it is zero, not a power of
/// two, or overflows.
pub fn scaled_table_size(scale: usize) -> Result<usize, TableError> {
    if !scale.is_power_of_two() {
        return Err(TableError::InvalidSize(scale));
    }
    BASE_TABLE_SIZE
        .checked_mul(scale)
        .ok_or(TableError::InvalidSize(scale))
}

/// Errors raised by [`BucketTable`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    /// The requested table size is zero or not a power of two.
    #[error("Invalid bucket table size {0}: must be a non-zero power of two")]
    InvalidSize(usize),

    /// A bucket was claimed twice in one run.
    #[error("Bucket {0} already claimed")]
    AlreadyClaimed(usize),

    /// A bucket index past the end of the table.
    #[error("Bucket index {index} out of range (table size {size})")]
    OutOfRange {
        /// Requested index
        index: usize,
        /// Number of buckets
        size: usize,
    },
}

struct Bucket {
    entries: ConcurrentList<FileEntry>,
    claimed: AtomicBool,
}

/// Exclusive right to compare one bucket, obtained from [`BucketTable::claim`].
#[derive(Debug)]
pub struct BucketClaim<'a> {
    index: usize,
    entries: &'a ConcurrentList<FileEntry>,
}

impl<'a> BucketClaim<'a> {
    /// Index of the claimed bucket.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The claimed bucket's entries.
    #[must_use]
    pub fn entries(&self) -> &'a ConcurrentList<FileEntry> {
        self.entries
    }
}

/// Fixed array of file buckets plus the extras list.
pub struct BucketTable {
    buckets: Box<[Bucket]>,
    extras: ConcurrentList<FileEntry>,
    mask: u64,
}

impl BucketTable {
    /// Create a table with `table_size` buckets.
    ///
    /// # Errors
    ///
    /// [`TableError::InvalidSize`] unless `table_size` is a non-zero power of
    /// two.
    pub fn new(table_size: usize) -> Result<Self, TableError> {
        if !table_size.is_power_of_two() {
            return Err(TableError::InvalidSize(table_size));
        }

        let buckets = (0..table_size)
            .map(|_| Bucket {
                entries: ConcurrentList::new("bucket"),
                claimed: AtomicBool::new(false),
            })
            .collect();

        log::debug!("Allocated bucket table with {} buckets", table_size);
        Ok(Self {
            buckets,
            extras: ConcurrentList::new("extras"),
            mask: (table_size - 1) as u64,
        })
    }

    /// Bucket index for a file size.
    #[must_use]
    pub fn index(&self, size: u64) -> usize {
        (size & self.mask) as usize
    }

    /// Number of buckets (excluding extras).
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Always false; a table has at least one bucket.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Insert a file into its bucket, or into extras if it is empty.
    pub fn insert(&self, entry: FileEntry) {
        if entry.size == 0 {
            self.extras.push_back(entry);
        } else {
            let index = self.index(entry.size);
            self.buckets[index].entries.push_back(entry);
        }
    }

    /// Entries of bucket `index`.
    ///
    /// # Errors
    ///
    /// [`TableError::OutOfRange`] for an index past the end.
    pub fn bucket(&self, index: usize) -> Result<&ConcurrentList<FileEntry>, TableError> {
        self.buckets
            .get(index)
            .map(|b| &b.entries)
            .ok_or(TableError::OutOfRange {
                index,
                size: self.buckets.len(),
            })
    }

    /// Zero-length files.
    #[must_use]
    pub fn extras(&self) -> &ConcurrentList<FileEntry> {
        &self.extras
    }

    /// Claim bucket `index` for comparison.
    ///
    /// # Errors
    ///
    /// [`TableError::AlreadyClaimed`] on a second claim, or
    /// [`TableError::OutOfRange`].
    pub fn claim(&self, index: usize) -> Result<BucketClaim<'_>, TableError> {
        let bucket = self.buckets.get(index).ok_or(TableError::OutOfRange {
            index,
            size: self.buckets.len(),
        })?;

        if bucket.claimed.swap(true, Ordering::AcqRel) {
            return Err(TableError::AlreadyClaimed(index));
        }
        Ok(BucketClaim {
            index,
            entries: &bucket.entries,
        })
    }

    /// Whether bucket `index` has been claimed.
    #[must_use]
    pub fn is_claimed(&self, index: usize) -> bool {
        self.buckets
            .get(index)
            .is_some_and(|b| b.claimed.load(Ordering::Acquire))
    }

    /// Entries across all buckets and extras.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.buckets.iter().map(|b| b.entries.len()).sum::<usize>() + self.extras.len()
    }

    /// Entries in the extras list.
    #[must_use]
    pub fn empty_count(&self) -> usize {
        self.extras.len()
    }

    /// Length of the fullest bucket.
    #[must_use]
    pub fn max_bucket_len(&self) -> usize {
        self.buckets
            .iter()
            .map(|b| b.entries.len())
            .max()
            .unwrap_or(0)
    }

    /// Buckets holding at least one entry.
    #[must_use]
    pub fn occupied_buckets(&self) -> usize {
        self.buckets
            .iter()
            .filter(|b| !b.entries.is_empty())
            .count()
    }

    /// Visit every entry, extras first, then buckets in index order.
    pub fn for_each_entry(&self, mut f: impl FnMut(&FileEntry)) {
        self.extras.for_each(&mut f);
        for bucket in self.buckets.iter() {
            bucket.entries.for_each(&mut f);
        }
    }
}

impl std::fmt::Debug for BucketTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketTable")
            .field("buckets", &self.buckets.len())
            .field("entries", &self.total_count())
            .field("extras", &self.extras.len())
            .finish()
    }
}
