//! A single unreadable file or directory stops the whole run.

use find_dupes::duplicates::{CompareError, DuplicateFinder, FinderConfig, FinderError};
use find_dupes::engine::EngineError;
use find_dupes::scanner::{ContentDigest, Hash, HashError, Hasher};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::tempdir;

/// Fails for one chosen path.
struct FailingDigest {
    poisoned: PathBuf,
    inner: Hasher,
}

impl ContentDigest for FailingDigest {
    fn full_hash(&self, path: &Path) -> Result<Hash, HashError> {
        if path == self.poisoned {
            return Err(HashError::PermissionDenied(path.to_path_buf()));
        }
        self.inner.full_hash(path)
    }
}

#[test]
fn test_digest_failure_is_fatal() {
    let dir = tempdir().unwrap();
    let bad = dir.path().join("bad");
    fs::write(&bad, b"same").unwrap();
    fs::write(dir.path().join("good"), b"same").unwrap();

    let config = FinderConfig::default()
        .with_jobs(2)
        .with_table_size(16)
        .with_digest(Arc::new(FailingDigest {
            poisoned: bad.clone(),
            inner: Hasher::new(),
        }));

    let result = DuplicateFinder::new(config).find_duplicates(dir.path());

    match result {
        Err(FinderError::Compare(CompareError::Hash(HashError::PermissionDenied(path)))) => {
            assert_eq!(path, bad);
        }
        other => panic!("Expected a hash failure, got {:?}", other),
    }
}

#[test]
fn test_failure_in_one_bucket_fails_the_run() {
    let dir = tempdir().unwrap();
    // Plenty of healthy buckets next to the broken one.
    for i in 1..40u8 {
        let content = vec![i; usize::from(i)];
        fs::write(dir.path().join(format!("a{}", i)), &content).unwrap();
        fs::write(dir.path().join(format!("b{}", i)), &content).unwrap();
    }
    let bad = dir.path().join("a7");

    let config = FinderConfig::default()
        .with_jobs(4)
        .with_table_size(64)
        .with_digest(Arc::new(FailingDigest {
            poisoned: bad,
            inner: Hasher::new(),
        }));

    let result = DuplicateFinder::new(config).find_duplicates(dir.path());
    assert!(matches!(result, Err(FinderError::Compare(_))));
}

#[test]
fn test_file_removed_after_scan_is_fatal() {
    struct RemovingDigest {
        victim: PathBuf,
        inner: Hasher,
    }

    impl ContentDigest for RemovingDigest {
        fn full_hash(&self, path: &Path) -> Result<Hash, HashError> {
            let _ = fs::remove_file(&self.victim);
            self.inner.full_hash(path)
        }
    }

    let dir = tempdir().unwrap();
    let second = dir.path().join("second");
    fs::write(dir.path().join("first"), b"vanish").unwrap();
    fs::write(&second, b"vanish").unwrap();

    // Whichever file anchors the pair, `second` is gone by the time it is
    // digested.
    let config = FinderConfig::default()
        .with_jobs(1)
        .with_table_size(16)
        .with_digest(Arc::new(RemovingDigest {
            victim: second,
            inner: Hasher::new(),
        }));

    let result = DuplicateFinder::new(config).find_duplicates(dir.path());
    assert!(matches!(
        result,
        Err(FinderError::Compare(CompareError::Hash(HashError::NotFound(_))))
    ));
}

#[cfg(unix)]
#[test]
fn test_unreadable_directory_is_fatal() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let locked = dir.path().join("locked");
    fs::create_dir(&locked).unwrap();
    fs::write(locked.join("hidden"), b"x").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users can still list the directory.
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let finder = DuplicateFinder::new(FinderConfig::default().with_jobs(2).with_table_size(16));
    let result = finder.find_duplicates(dir.path());

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
    assert!(matches!(result, Err(FinderError::Scan(_))));
}

/// Panics instead of returning an error.
struct PanickingDigest;

impl ContentDigest for PanickingDigest {
    fn full_hash(&self, path: &Path) -> Result<Hash, HashError> {
        panic!("digest blew up on {}", path.display());
    }
}

#[test]
fn test_digest_panic_fails_the_run_instead_of_hanging() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("one"), b"twin").unwrap();
    fs::write(dir.path().join("two"), b"twin").unwrap();

    let config = FinderConfig::default()
        .with_jobs(2)
        .with_table_size(16)
        .with_digest(Arc::new(PanickingDigest));

    let result = DuplicateFinder::new(config).find_duplicates(dir.path());

    match result {
        Err(FinderError::Engine(EngineError::WorkerPanicked { message, .. })) => {
            assert!(message.starts_with("digest blew up on"), "{}", message);
        }
        other => panic!("Expected a worker panic, got {:?}", other),
    }
}
