//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Size-sharded file buckets ([`table`])
//! - Per-bucket content comparison ([`compare`])
//! - The two-phase scan/compare driver ([`finder`])

pub mod compare;
pub mod finder;
pub mod table;

pub use compare::{BucketOutcome, CompareCounts, CompareError, Comparator, DuplicateGroup};
pub use finder::{
    BucketStats, DuplicateFinder, FindReport, FinderConfig, FinderError, Job, RunTotals,
};
pub use table::{scaled_table_size, BucketClaim, BucketTable, TableError, BASE_TABLE_SIZE};
