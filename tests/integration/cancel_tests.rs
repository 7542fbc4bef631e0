use find_dupes::duplicates::{DuplicateFinder, FinderConfig};
use find_dupes::progress::{ProgressCallback, PHASE_COMPARING, PHASE_SCANNING};
use find_dupes::scanner::{ContentDigest, Hash, HashError, Hasher};
use find_dupes::signal::CancelToken;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::tempdir;

/// Cancels the run after a fixed number of digests.
struct CancellingDigest {
    token: CancelToken,
    after: usize,
    calls: AtomicUsize,
    inner: Hasher,
}

impl ContentDigest for CancellingDigest {
    fn full_hash(&self, path: &Path) -> Result<Hash, HashError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) + 1 >= self.after {
            self.token.cancel();
        }
        self.inner.full_hash(path)
    }
}

/// Records phase boundaries and status messages.
#[derive(Default)]
struct PhaseRecorder {
    events: Mutex<Vec<String>>,
}

impl ProgressCallback for PhaseRecorder {
    fn on_phase_start(&self, phase: &str, _total: usize) {
        self.events.lock().unwrap().push(format!("start:{}", phase));
    }

    fn on_progress(&self, _current: usize, _message: &str) {}

    fn on_phase_end(&self, phase: &str) {
        self.events.lock().unwrap().push(format!("end:{}", phase));
    }

    fn on_message(&self, message: &str) {
        self.events.lock().unwrap().push(format!("message:{}", message));
    }
}

fn populate(dir: &Path, subdirs: usize, files: usize) {
    for d in 0..subdirs {
        let sub = dir.join(format!("sub{}", d));
        fs::create_dir(&sub).unwrap();
        for f in 0..files {
            fs::write(sub.join(format!("f{}", f)), format!("{:08}", f % 3)).unwrap();
        }
    }
}

#[test]
fn test_cancel_during_compare_returns_partial_report() {
    let dir = tempdir().unwrap();
    populate(dir.path(), 4, 25);

    let token = CancelToken::new();
    let digest = Arc::new(CancellingDigest {
        token: token.clone(),
        after: 2,
        calls: AtomicUsize::new(0),
        inner: Hasher::new(),
    });
    let config = FinderConfig::default()
        .with_jobs(4)
        .with_table_size(16)
        .with_cancel_token(token.clone())
        .with_digest(digest);

    let report = DuplicateFinder::new(config)
        .find_duplicates(dir.path())
        .unwrap();

    assert!(token.is_cancelled());
    assert!(report.interrupted);
    assert_eq!(report.totals.files_found, 100);
    // Everything is the same size, so one bucket holds all entries and the
    // cut leaves some of them unclassified.
    assert!(report.totals.unclassified > 0);
    assert!(report.totals.examined < 100);
}

#[test]
fn test_cancel_before_start_skips_compare() {
    let dir = tempdir().unwrap();
    populate(dir.path(), 2, 5);

    let token = CancelToken::new();
    token.cancel();
    let recorder = Arc::new(PhaseRecorder::default());
    let config = FinderConfig::default()
        .with_jobs(2)
        .with_table_size(16)
        .with_cancel_token(token)
        .with_progress_callback(recorder.clone());

    let report = DuplicateFinder::new(config)
        .find_duplicates(dir.path())
        .unwrap();

    assert!(report.interrupted);
    assert!(report.groups.is_empty());
    assert!(report.unique.is_empty());
    let events = recorder.events.lock().unwrap().clone();
    assert!(!events.iter().any(|e| e.contains(PHASE_COMPARING)));
}

#[test]
fn test_cancel_from_another_thread_winds_down() {
    let dir = tempdir().unwrap();
    populate(dir.path(), 20, 20);

    let token = CancelToken::new();
    let canceller = {
        let token = token.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(5));
            token.cancel();
        })
    };

    let config = FinderConfig::default()
        .with_jobs(4)
        .with_table_size(16)
        .with_cancel_token(token);
    let start = Instant::now();
    let result = DuplicateFinder::new(config).find_duplicates(dir.path());
    canceller.join().unwrap();

    // Either the run beat the canceller or it stopped cleanly.
    let report = result.unwrap();
    assert!(start.elapsed() < Duration::from_secs(30));
    let t = report.totals;
    assert_eq!(t.examined, t.unique + t.duplicate + report.groups.len());
}

#[test]
fn test_phases_reported_in_order() {
    let dir = tempdir().unwrap();
    populate(dir.path(), 2, 3);

    let recorder = Arc::new(PhaseRecorder::default());
    let config = FinderConfig::default()
        .with_jobs(2)
        .with_table_size(16)
        .with_progress_callback(recorder.clone());

    let report = DuplicateFinder::new(config)
        .find_duplicates(dir.path())
        .unwrap();

    assert!(!report.interrupted);
    let events = recorder.events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            format!("start:{}", PHASE_SCANNING),
            format!("end:{}", PHASE_SCANNING),
            "message:Comparing 6 files...".to_string(),
            format!("start:{}", PHASE_COMPARING),
            format!("end:{}", PHASE_COMPARING),
        ]
    );
}
