//! Digest memoization seen from outside the comparator.

use find_dupes::duplicates::{DuplicateFinder, FinderConfig};
use find_dupes::scanner::{ContentDigest, Hash, HashError, Hasher};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

/// Real BLAKE3 digests, counted per path.
#[derive(Default)]
struct CountingDigest {
    inner: Hasher,
    calls: Mutex<HashMap<PathBuf, usize>>,
}

impl CountingDigest {
    fn calls_for(&self, path: &Path) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(path)
            .copied()
            .unwrap_or_default()
    }

    fn total(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

impl ContentDigest for CountingDigest {
    fn full_hash(&self, path: &Path) -> Result<Hash, HashError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(path.to_path_buf())
            .or_default() += 1;
        self.inner.full_hash(path)
    }
}

fn run(dir: &Path, digest: Arc<CountingDigest>) -> find_dupes::duplicates::FindReport {
    let config = FinderConfig::default()
        .with_jobs(4)
        .with_table_size(16)
        .with_digest(digest);
    DuplicateFinder::new(config).find_duplicates(dir).unwrap()
}

#[test]
fn test_each_file_hashed_at_most_once() {
    let dir = tempdir().unwrap();
    let mut paths = Vec::new();
    for i in 0..6 {
        let path = dir.path().join(format!("f{}", i));
        // Two content classes of the same size.
        fs::write(&path, if i % 2 == 0 { b"evenxx" } else { b"oddxxx" }).unwrap();
        paths.push(path);
    }

    let digest = Arc::new(CountingDigest::default());
    let report = run(dir.path(), Arc::clone(&digest));

    assert_eq!(report.groups.len(), 2);
    for path in &paths {
        assert!(digest.calls_for(path) <= 1, "{} hashed twice", path.display());
    }
    assert_eq!(digest.total(), report.totals.digests);
}

#[test]
fn test_lone_file_in_bucket_is_never_hashed() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("alone"), b"nobody shares my size").unwrap();
    fs::write(dir.path().join("short"), b"tiny").unwrap();

    let digest = Arc::new(CountingDigest::default());
    let report = run(dir.path(), Arc::clone(&digest));

    assert_eq!(report.unique.len(), 2);
    assert_eq!(digest.total(), 0);
}

#[test]
fn test_shared_bucket_different_sizes_not_hashed() {
    let dir = tempdir().unwrap();
    // 3 and 19 share bucket 3 of a 16-bucket table.
    fs::write(dir.path().join("three"), b"abc").unwrap();
    fs::write(dir.path().join("nineteen"), b"abcdefghijklmnopqrs").unwrap();

    let digest = Arc::new(CountingDigest::default());
    let report = run(dir.path(), Arc::clone(&digest));

    assert_eq!(report.buckets.max_len, 2);
    assert_eq!(report.unique.len(), 2);
    assert_eq!(digest.total(), 0);
}

#[test]
fn test_empty_files_never_hashed() {
    let dir = tempdir().unwrap();
    for i in 0..4 {
        fs::write(dir.path().join(format!("e{}", i)), b"").unwrap();
    }

    let digest = Arc::new(CountingDigest::default());
    let report = run(dir.path(), Arc::clone(&digest));

    assert_eq!(report.empty.len(), 4);
    assert_eq!(digest.total(), 0);
}

#[test]
fn test_distinct_sizes_need_no_digests() {
    let dir = tempdir().unwrap();
    for size in 1..=1000usize {
        fs::write(dir.path().join(format!("f{}", size)), vec![b'z'; size]).unwrap();
    }

    let digest = Arc::new(CountingDigest::default());
    let config = FinderConfig::default()
        .with_jobs(4)
        .with_table_size(1024)
        .with_digest(digest.clone());
    let report = DuplicateFinder::new(config)
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(report.unique.len(), 1000);
    assert!(report.groups.is_empty());
    assert_eq!(report.buckets.occupied, 1000);
    assert_eq!(report.buckets.max_len, 1);
    assert_eq!(digest.total(), 0);
}
