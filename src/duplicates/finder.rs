//! Duplicate finder driving the scan and compare phases.
//!
//! # Overview
//!
//! The finder owns one [`WorkQueue`] for the whole run. Both phases share its
//! thread pool:
//! 1. **Scan** - each source root is scanned on the calling thread; every
//!    subdirectory becomes a queued [`Job::ScanDirectory`] item, so the walk
//!    fans out across the workers. Files land in a [`BucketTable`].
//! 2. **Compare** - once the scan drains, one [`Job::CompareBucket`] item is
//!    queued per bucket. Each item claims its bucket and classifies it.
//!
//! A worker that hits a fatal error records it in the run's failure slot and
//! trips the stop check, so the rest of the pool winds down at its next
//! checkpoint. Cancellation through the [`CancelToken`] takes the same exit
//! but yields a partial report instead of an error.
//!
//! # Example
//!
//! ```no_run
//! use find_dupes::duplicates::{DuplicateFinder, FinderConfig};
//! use std::path::Path;
//!
//! let config = FinderConfig::default().with_jobs(4);
//! let finder = DuplicateFinder::new(config);
//!
//! let report = finder.find_duplicates(Path::new(".")).unwrap();
//! println!("Found {} duplicate groups", report.groups.len());
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;

use super::compare::{BucketOutcome, CompareCounts, CompareError, Comparator, DuplicateGroup};
use super::table::{BucketTable, TableError, BASE_TABLE_SIZE};
use crate::engine::{EngineError, QueueHandle, WorkHandler, WorkQueue, WorkTicket};
use crate::progress::{ProgressCallback, PHASE_COMPARING, PHASE_SCANNING};
use crate::scanner::{validate_root, ContentDigest, Hasher, ScanError, Walker};
use crate::signal::{CancelToken, StopCheck};

/// How often the driver wakes to report progress while waiting.
const PROGRESS_TICK: Duration = Duration::from_millis(100);

/// A schedulable unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    /// List one directory.
    ScanDirectory(PathBuf),
    /// Classify one bucket.
    CompareBucket(usize),
}

/// Configuration for the duplicate finder.
#[derive(Clone)]
pub struct FinderConfig {
    /// Worker threads.
    pub jobs: usize,
    /// Number of buckets; a non-zero power of two.
    pub table_size: usize,
    /// Cancellation token polled at every checkpoint.
    pub cancel: CancelToken,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
    /// Record every discovered file for `files.lst`.
    pub collect_files: bool,
    /// Content digest used by the compare phase.
    pub digest: Arc<dyn ContentDigest>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("jobs", &self.jobs)
            .field("table_size", &self.table_size)
            .field("cancel", &self.cancel)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .field("collect_files", &self.collect_files)
            .finish_non_exhaustive()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            jobs: std::thread::available_parallelism().map_or(4, |n| n.get()),
            table_size: BASE_TABLE_SIZE,
            cancel: CancelToken::new(),
            progress_callback: None,
            collect_files: false,
            digest: Arc::new(Hasher::new()),
        }
    }
}

impl FinderConfig {
    /// Set the number of worker threads (at least one).
    #[must_use]
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Set the bucket count. Validated when the run starts.
    #[must_use]
    pub fn with_table_size(mut self, size: usize) -> Self {
        self.table_size = size;
        self
    }

    /// Set the cancellation token.
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Collect the full file list.
    #[must_use]
    pub fn with_file_list(mut self, enabled: bool) -> Self {
        self.collect_files = enabled;
        self
    }

    /// Replace the content digest.
    #[must_use]
    pub fn with_digest(mut self, digest: Arc<dyn ContentDigest>) -> Self {
        self.digest = digest;
        self
    }
}

/// Run-wide counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunTotals {
    /// Regular files discovered, empty ones included
    pub files_found: usize,
    /// Non-empty files classified
    pub examined: usize,
    /// Files with no duplicate
    pub unique: usize,
    /// Files matched to an earlier anchor
    pub duplicate: usize,
    /// Zero-length files
    pub empty: usize,
    /// Bytes held by duplicates
    pub duplicate_bytes: u64,
    /// Digests computed
    pub digests: usize,
    /// Non-empty files left unclassified by an interrupted run
    pub unclassified: usize,
}

/// Bucket table occupancy after the scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BucketStats {
    /// Number of buckets
    pub table_size: usize,
    /// Buckets holding at least one file
    pub occupied: usize,
    /// Files in the fullest bucket
    pub max_len: usize,
}

/// Everything a run produced.
#[derive(Debug, Clone, Default)]
pub struct FindReport {
    /// Files with no duplicate
    pub unique: Vec<PathBuf>,
    /// Duplicate groups
    pub groups: Vec<DuplicateGroup>,
    /// Zero-length files
    pub empty: Vec<PathBuf>,
    /// `(size, path)` of every discovered file, if requested
    pub files: Vec<(u64, PathBuf)>,
    /// Counters
    pub totals: RunTotals,
    /// Bucket occupancy
    pub buckets: BucketStats,
    /// Wall-clock duration
    pub elapsed: Duration,
    /// Whether the run was cancelled before finishing
    pub interrupted: bool,
}

impl FindReport {
    /// Bytes held by duplicates, human-readable.
    #[must_use]
    pub fn duplicate_bytes_display(&self) -> String {
        bytesize::ByteSize::b(self.totals.duplicate_bytes).to_string()
    }
}

/// Errors that can occur during duplicate finding.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The provided path does not exist.
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// The provided path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// A directory could not be scanned.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// A bucket could not be compared.
    #[error(transparent)]
    Compare(#[from] CompareError),

    /// The work queue failed.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The bucket table was misconfigured or misused.
    #[error(transparent)]
    Table(#[from] TableError),

    /// An internal consistency check failed.
    #[error("Invariant violated: {0}")]
    Invariant(String),
}

/// Shared run state: the cancel token plus the first fatal error.
struct RunState {
    cancel: CancelToken,
    failed: AtomicBool,
    failure: Mutex<Option<FinderError>>,
}

impl RunState {
    fn new(cancel: CancelToken) -> Self {
        Self {
            cancel,
            failed: AtomicBool::new(false),
            failure: Mutex::new(None),
        }
    }

    fn fail(&self, err: FinderError) {
        log::error!("{}", err);
        let mut failure = self.failure.lock();
        if failure.is_none() {
            *failure = Some(err);
        }
        self.failed.store(true, Ordering::Release);
    }

    fn should_stop(&self) -> bool {
        self.failed.load(Ordering::Acquire) || self.cancel.is_cancelled()
    }

    fn take_failure(&self) -> Option<FinderError> {
        self.failure.lock().take()
    }
}

/// Worker-side handler dispatching on [`Job`].
struct Dispatcher {
    table: Arc<BucketTable>,
    walker: Walker,
    comparator: Comparator,
    state: Arc<RunState>,
    buckets_done: AtomicUsize,
}

impl Dispatcher {
    fn scan(&self, queue: &QueueHandle<Job, BucketOutcome>, dir: &Path) {
        let result = self.walker.scan_dir(dir, |sub| {
            queue.enqueue(Job::ScanDirectory(sub));
        });
        if let Err(e) = result {
            self.state.fail(e.into());
        }
    }

    fn compare(&self, index: usize) -> Result<BucketOutcome, FinderError> {
        let claim = self.table.claim(index)?;
        let outcome = self.comparator.compare(claim)?;
        self.buckets_done.fetch_add(1, Ordering::Relaxed);
        Ok(outcome)
    }
}

impl WorkHandler<Job, BucketOutcome> for Dispatcher {
    fn handle(&self, queue: &QueueHandle<Job, BucketOutcome>, ticket: WorkTicket, job: Job) {
        let settled = match job {
            Job::ScanDirectory(dir) => {
                self.scan(queue, &dir);
                queue.release(ticket)
            }
            Job::CompareBucket(index) => match self.compare(index) {
                Ok(outcome) => queue.finish(ticket, outcome),
                Err(e) => {
                    self.state.fail(e);
                    queue.release(ticket)
                }
            },
        };
        if let Err(e) = settled {
            self.state.fail(e.into());
        }
    }
}

/// Duplicate finder running the scan and compare phases on a shared pool.
pub struct DuplicateFinder {
    config: FinderConfig,
}

impl DuplicateFinder {
    /// Create a new duplicate finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        Self { config }
    }

    /// Create a new duplicate finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    /// Find all duplicate files under one directory.
    ///
    /// # Errors
    ///
    /// See [`find_duplicates_in_paths`](Self::find_duplicates_in_paths).
    pub fn find_duplicates(&self, path: &Path) -> Result<FindReport, FinderError> {
        self.find_duplicates_in_paths(&[path.to_path_buf()])
    }

    /// Find all duplicate files across several directories.
    ///
    /// Cancellation is not an error: the report comes back with
    /// `interrupted == true` and whatever was classified so far.
    ///
    /// # Errors
    ///
    /// Returns `FinderError` if a root is missing or not a directory, if any
    /// directory or file cannot be read, if worker threads cannot be spawned,
    /// or if an internal invariant is violated.
    pub fn find_duplicates_in_paths(&self, paths: &[PathBuf]) -> Result<FindReport, FinderError> {
        let start = Instant::now();

        for path in paths {
            validate_root(path).map_err(|e| match e {
                ScanError::NotFound(p) => FinderError::PathNotFound(p),
                ScanError::NotADirectory(p) => FinderError::NotADirectory(p),
                other => FinderError::Scan(other),
            })?;
        }

        let table = Arc::new(BucketTable::new(self.config.table_size)?);
        let state = Arc::new(RunState::new(self.config.cancel.clone()));
        let stop: StopCheck = {
            let state = Arc::clone(&state);
            Arc::new(move || state.should_stop())
        };

        let dispatcher = Arc::new(Dispatcher {
            table: Arc::clone(&table),
            walker: Walker::new(Arc::clone(&table), Arc::clone(&stop)),
            comparator: Comparator::new(Arc::clone(&self.config.digest), Arc::clone(&stop)),
            state: Arc::clone(&state),
            buckets_done: AtomicUsize::new(0),
        });
        let mut queue = WorkQueue::new(self.config.jobs, "find-dupes", Arc::clone(&dispatcher))?;
        let handle = queue.handle();

        log::info!(
            "Scanning {} path(s) with {} workers and {} buckets",
            paths.len(),
            queue.threads(),
            table.len()
        );

        // Scan phase
        self.phase_start(PHASE_SCANNING, 0);
        for root in paths {
            if stop() {
                break;
            }
            log::debug!("Scanning root {}", root.display());
            dispatcher.scan(&handle, root);
        }
        let scanned = queue.wait_idle(
            || stop(),
            PROGRESS_TICK,
            || self.progress(dispatcher.walker.files_found() as usize),
        );
        self.phase_end(PHASE_SCANNING);

        let files_found = table.total_count();
        let buckets = BucketStats {
            table_size: table.len(),
            occupied: table.occupied_buckets(),
            max_len: table.max_bucket_len(),
        };
        let files = if self.config.collect_files {
            let mut files = Vec::with_capacity(files_found);
            table.for_each_entry(|e| files.push((e.size, e.path.clone())));
            files
        } else {
            Vec::new()
        };
        log::info!(
            "Scan finished: {} files ({} empty), fullest bucket holds {}",
            files_found,
            table.empty_count(),
            buckets.max_len
        );

        // Compare phase
        let compared = if scanned && !stop() {
            self.message(&format!(
                "Comparing {} files...",
                files_found - table.empty_count()
            ));
            self.phase_start(PHASE_COMPARING, table.len());
            for index in 0..table.len() {
                handle.enqueue(Job::CompareBucket(index));
            }
            let compared = queue.wait_idle(
                || stop(),
                PROGRESS_TICK,
                || self.progress(dispatcher.buckets_done.load(Ordering::Relaxed)),
            );
            self.phase_end(PHASE_COMPARING);
            compared
        } else {
            false
        };

        let panicked = queue.shutdown();
        let leftover = queue.drain_ready();

        if let Some(err) = state.take_failure() {
            return Err(err);
        }
        if let Some(fault) = queue.take_fault() {
            return Err(fault.into());
        }
        if panicked > 0 {
            return Err(FinderError::Invariant(format!(
                "{} worker thread(s) panicked",
                panicked
            )));
        }
        if compared && leftover > 0 {
            return Err(FinderError::Invariant(format!(
                "{} work item(s) left after the queue went idle",
                leftover
            )));
        }
        if leftover > 0 {
            log::debug!("Drained {} unclaimed work item(s)", leftover);
        }

        let mut outcomes: Vec<BucketOutcome> = queue
            .take_done()
            .into_iter()
            .filter_map(|(_, outcome)| outcome)
            .collect();
        outcomes.sort_by_key(|o| o.index);

        let mut report = FindReport {
            files,
            buckets,
            interrupted: !compared,
            ..FindReport::default()
        };
        let mut counts = CompareCounts::default();
        for outcome in outcomes {
            report.interrupted |= !outcome.completed;
            counts.merge(&outcome.counts);
            report.unique.extend(outcome.unique);
            report.groups.extend(outcome.groups);
        }
        table.extras().for_each(|e| report.empty.push(e.path.clone()));

        report.totals = RunTotals {
            files_found,
            examined: counts.examined,
            unique: counts.unique,
            duplicate: counts.duplicate,
            empty: report.empty.len(),
            duplicate_bytes: counts.duplicate_bytes,
            digests: counts.digests,
            unclassified: table.total_count() - table.empty_count(),
        };
        report.elapsed = start.elapsed();

        if report.interrupted {
            log::warn!(
                "Run interrupted: {} file(s) left unclassified",
                report.totals.unclassified
            );
        } else {
            log::info!(
                "Found {} duplicate group(s), {} reclaimable",
                report.groups.len(),
                report.duplicate_bytes_display()
            );
        }

        Ok(report)
    }

    fn phase_start(&self, phase: &str, total: usize) {
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start(phase, total);
        }
    }

    fn progress(&self, current: usize) {
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_progress(current, "");
        }
    }

    fn phase_end(&self, phase: &str) {
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end(phase);
        }
    }

    fn message(&self, message: &str) {
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_message(message);
        }
    }
}
