//! Progress reporting utilities using indicatif.
//!
//! This module provides the [`Progress`] struct which implements
//! [`ProgressCallback`] to draw a spinner while scanning and a bar while
//! comparing buckets. Output goes to stderr and is hidden when stderr is not
//! a terminal. Status messages sent between phases are printed as plain
//! `find-dupes: ...` lines, with or without bars.

use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use parking_lot::Mutex;

/// Phase name reported while directories are scanned.
pub const PHASE_SCANNING: &str = "scanning";
/// Phase name reported while buckets are compared.
pub const PHASE_COMPARING: &str = "comparing";

/// Progress callback for the finder's phases.
///
/// Implement this trait to receive progress updates during a run. Calls
/// arrive from the driver thread only.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts.
    ///
    /// # Arguments
    ///
    /// * `phase` - Name of the phase ("scanning" or "comparing")
    /// * `total` - Total number of items, or 0 if unknown
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called periodically with the running count.
    ///
    /// # Arguments
    ///
    /// * `current` - Files found (scanning) or buckets done (comparing)
    /// * `path` - Item being processed, if known
    fn on_progress(&self, current: usize, path: &str);

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);

    /// Called with a status message, e.g. `Comparing 12 files...` between
    /// the scanning and comparing phases.
    fn on_message(&self, _message: &str) {}
}

/// Progress reporter using indicatif.
pub struct Progress {
    multi: MultiProgress,
    scanning: Mutex<Option<ProgressBar>>,
    comparing: Mutex<Option<ProgressBar>>,
    quiet: bool,
    bars: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bars will be displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use find_dupes::progress::Progress;
    ///
    /// let progress = Progress::new(false);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            scanning: Mutex::new(None),
            comparing: Mutex::new(None),
            quiet,
            bars: true,
        }
    }

    /// Show or hide the bars. Status lines are still printed without them.
    #[must_use]
    pub fn with_bars(mut self, bars: bool) -> Self {
        self.bars = bars;
        self
    }

    fn hidden(&self) -> bool {
        self.quiet || !self.bars
    }

    fn scanning_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn comparing_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} buckets ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn active(&self) -> Option<ProgressBar> {
        self.comparing
            .lock()
            .clone()
            .or_else(|| self.scanning.lock().clone())
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.hidden() {
            return;
        }

        match phase {
            PHASE_SCANNING => {
                let pb = self.multi.add(ProgressBar::new_spinner());
                pb.set_style(Self::scanning_style());
                pb.set_message("Scanning");
                pb.enable_steady_tick(Duration::from_millis(100));
                *self.scanning.lock() = Some(pb);
            }
            PHASE_COMPARING => {
                let pb = self.multi.add(ProgressBar::new(total as u64));
                pb.set_style(Self::comparing_style());
                pb.set_message("Comparing");
                *self.comparing.lock() = Some(pb);
            }
            other => log::debug!("No progress display for phase '{}'", other),
        }
    }

    fn on_progress(&self, current: usize, path: &str) {
        if self.hidden() {
            return;
        }

        if let Some(pb) = self.active() {
            pb.set_position(current as u64);
            if !path.is_empty() {
                pb.set_message(truncate_path(path, 30));
            }
        }
    }

    fn on_phase_end(&self, phase: &str) {
        if self.hidden() {
            return;
        }

        match phase {
            PHASE_SCANNING => {
                if let Some(pb) = self.scanning.lock().take() {
                    pb.finish_with_message("Scan complete");
                }
            }
            PHASE_COMPARING => {
                if let Some(pb) = self.comparing.lock().take() {
                    pb.finish_with_message("Compare complete");
                }
            }
            _ => {}
        }
    }

    fn on_message(&self, message: &str) {
        if self.quiet {
            return;
        }
        match self.active() {
            Some(pb) if self.bars => pb.set_message(message.to_string()),
            _ => eprintln!("{}", status_line(message)),
        }
    }
}

/// A status message as printed on stderr.
#[must_use]
pub fn status_line(message: &str) -> String {
    format!("find-dupes: {}", message)
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let count = file_name.chars().count();
    if count >= max_len {
        let tail: String = file_name.chars().skip(count + 3 - max_len).collect();
        return format!("...{}", tail);
    }

    format!(".../{}", file_name)
}
