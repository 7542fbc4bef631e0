//! Per-bucket duplicate classification.
//!
//! # Overview
//!
//! A [`Comparator`] consumes one claimed bucket at a time. Entries are walked
//! in list order; the first unmatched entry becomes the anchor and every later
//! unmatched entry with the same size is a candidate. Digests are computed
//! only when a size collision forces a comparison and are cached on the entry,
//! so each file is read at most once per run. A candidate whose digest equals
//! the anchor's is removed from the bucket on the spot and joins the anchor's
//! group.
//!
//! Every classified entry is removed from the bucket, so the bucket only ever
//! holds entries nobody has classified yet. If the stop check fires
//! the comparator returns what it has so far with `completed == false`, and
//! the entries not yet classified stay in the bucket.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use super::table::{BucketClaim, TableError};
use crate::engine::{ConcurrentList, ListError, NodeHandle};
use crate::scanner::{ContentDigest, FileEntry, Hash, HashError};
use crate::signal::StopCheck;

/// Errors raised while comparing a bucket.
#[derive(thiserror::Error, Debug)]
pub enum CompareError {
    /// A file could not be digested.
    #[error(transparent)]
    Hash(#[from] HashError),

    /// A bucket entry vanished underneath the comparator.
    #[error(transparent)]
    List(#[from] ListError),

    /// The bucket could not be claimed.
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Counters for one bucket (or, summed, for a whole run).
///
/// `examined == unique + duplicate + groups` holds even for a stopped bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompareCounts {
    /// Non-empty files classified, matched ones included
    pub examined: usize,
    /// Anchors with no duplicate
    pub unique: usize,
    /// Files matched to an earlier anchor
    pub duplicate: usize,
    /// Bytes held by matched files
    pub duplicate_bytes: u64,
    /// Digests computed
    pub digests: usize,
}

impl CompareCounts {
    /// Add another bucket's counters.
    pub fn merge(&mut self, other: &CompareCounts) {
        self.examined += other.examined;
        self.unique += other.unique;
        self.duplicate += other.duplicate;
        self.duplicate_bytes += other.duplicate_bytes;
        self.digests += other.digests;
    }
}

/// An anchor file and every later file with identical content.
///
/// The anchor is position 0; matches are numbered from 1 in the order they
/// were found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    /// Shared file size
    pub size: u64,
    /// Shared content digest
    #[serde(serialize_with = "serialize_hash")]
    pub digest: Hash,
    /// First file seen with this content
    pub anchor: PathBuf,
    /// Later files with the same content
    pub matches: Vec<PathBuf>,
}

impl DuplicateGroup {
    /// Anchor plus matches.
    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.matches.len()
    }

    /// Always false; a group holds at least its anchor.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Bytes that would be freed by keeping only the anchor.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.size * self.matches.len() as u64
    }

    /// Anchor then matches.
    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        std::iter::once(&self.anchor).chain(self.matches.iter())
    }
}

fn serialize_hash<S: serde::Serializer>(hash: &Hash, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&crate::scanner::hash_to_hex(hash))
}

/// Classification of one bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketOutcome {
    /// Bucket index
    pub index: usize,
    /// Counters for this bucket
    pub counts: CompareCounts,
    /// Files with no duplicate
    pub unique: Vec<PathBuf>,
    /// Duplicate groups
    pub groups: Vec<DuplicateGroup>,
    /// False if the stop check cut the bucket short
    pub completed: bool,
}

impl BucketOutcome {
    fn new(index: usize) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }
}

/// Groups the entries of a claimed bucket by content.
pub struct Comparator {
    digest: Arc<dyn ContentDigest>,
    stop: StopCheck,
}

impl Comparator {
    /// Create a comparator digesting with `digest` and polling `stop`.
    #[must_use]
    pub fn new(digest: Arc<dyn ContentDigest>, stop: StopCheck) -> Self {
        Self { digest, stop }
    }

    /// Classify every entry of the claimed bucket.
    ///
    /// # Errors
    ///
    /// [`CompareError::Hash`] if a file cannot be read, or
    /// [`CompareError::List`] if an entry disappears mid-comparison.
    pub fn compare(&self, claim: BucketClaim<'_>) -> Result<BucketOutcome, CompareError> {
        let bucket = claim.entries();
        let mut outcome = BucketOutcome::new(claim.index());

        if (self.stop)() {
            return Ok(outcome);
        }

        let handles = bucket.handles();
        // Positions already removed as matches of an earlier anchor.
        let mut classified = vec![false; handles.len()];
        for (position, &anchor) in handles.iter().enumerate() {
            if classified[position] {
                continue;
            }

            if (self.stop)() {
                log::debug!(
                    "Bucket {} stopped with {} entries left",
                    outcome.index,
                    bucket.len()
                );
                return Ok(outcome);
            }

            let size = bucket.with(anchor, |e| e.size)?;
            let mut anchor_digest = None;
            let mut matches = Vec::new();
            for (offset, &candidate) in handles[position + 1..].iter().enumerate() {
                let slot = position + 1 + offset;
                if classified[slot] || bucket.with(candidate, |e| e.size)? != size {
                    continue;
                }

                let expected = match anchor_digest {
                    Some(digest) => digest,
                    None => {
                        let digest = self.digest_of(bucket, anchor, &mut outcome.counts)?;
                        anchor_digest = Some(digest);
                        digest
                    }
                };
                if self.digest_of(bucket, candidate, &mut outcome.counts)? == expected {
                    // Matches leave the bucket immediately.
                    bucket.with_mut(candidate, |e| e.matched = true)?;
                    let entry = bucket.remove(candidate)?;
                    classified[slot] = true;
                    outcome.counts.examined += 1;
                    matches.push(entry.path);
                }
            }

            let entry = bucket.remove(anchor)?;
            outcome.counts.examined += 1;
            match anchor_digest {
                Some(digest) if !matches.is_empty() => {
                    log::trace!(
                        "Duplicate group of {} for {}",
                        matches.len() + 1,
                        entry.path.display()
                    );
                    outcome.counts.duplicate += matches.len();
                    outcome.counts.duplicate_bytes += size * matches.len() as u64;
                    outcome.groups.push(DuplicateGroup {
                        size,
                        digest,
                        anchor: entry.path,
                        matches,
                    });
                }
                _ => {
                    outcome.counts.unique += 1;
                    outcome.unique.push(entry.path);
                }
            }
        }

        outcome.completed = true;
        Ok(outcome)
    }

    /// Digest of the entry behind `handle`, computed on first use.
    fn digest_of(
        &self,
        bucket: &ConcurrentList<FileEntry>,
        handle: NodeHandle,
        counts: &mut CompareCounts,
    ) -> Result<Hash, CompareError> {
        let path = match bucket.with(handle, |e| e.digest.ok_or_else(|| e.path.clone()))? {
            Ok(digest) => return Ok(digest),
            Err(path) => path,
        };

        // Hash outside the list lock.
        let digest = self.digest.full_hash(&path)?;
        bucket.with_mut(handle, |e| e.digest = Some(digest))?;
        counts.digests += 1;
        Ok(digest)
    }
}

impl std::fmt::Debug for Comparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Comparator").finish_non_exhaustive()
    }
}
