//! End-of-run summary for stderr or JSON.

use std::path::PathBuf;
use std::time::Duration;

use bytesize::ByteSize;
use serde::Serialize;

use crate::duplicates::{BucketStats, FindReport, RunTotals};
use crate::error::ExitCode;

/// Serializable run summary.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// "Success", "Interrupted" or "Failed"
    pub status: &'static str,
    /// Where the lists were written
    pub list_dir: PathBuf,
    /// Counters
    pub totals: RunTotals,
    /// Number of duplicate groups
    pub duplicate_groups: usize,
    /// Duplicate bytes, human-readable
    pub duplicate_size: String,
    /// Bucket occupancy
    pub buckets: BucketStats,
    /// Wall-clock duration in milliseconds
    pub elapsed_ms: u64,
    /// Whether the run was cancelled
    pub interrupted: bool,
    /// Process exit code
    pub exit_code: i32,
}

impl RunSummary {
    /// Summarize a finished (or interrupted) run.
    #[must_use]
    pub fn new(report: &FindReport, list_dir: PathBuf) -> Self {
        let exit = if report.interrupted {
            ExitCode::Interrupted
        } else {
            ExitCode::Success
        };
        Self {
            status: if report.interrupted {
                "Interrupted"
            } else {
                "Success"
            },
            list_dir,
            totals: report.totals,
            duplicate_groups: report.groups.len(),
            duplicate_size: ByteSize::b(report.totals.duplicate_bytes).to_string(),
            buckets: report.buckets,
            elapsed_ms: u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
            interrupted: report.interrupted,
            exit_code: exit.as_i32(),
        }
    }

    /// The `Found ...` line.
    #[must_use]
    pub fn found_line(&self) -> String {
        format!(
            "find-dupes: Found {} unique files, {} duplicate files, {} empty files.",
            self.totals.unique, self.totals.duplicate, self.totals.empty
        )
    }

    /// Serialize as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns a serde_json error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// The `Done: <result>, <elapsed>.` line.
#[must_use]
pub fn done_line(success: bool, elapsed: Duration) -> String {
    format!(
        "find-dupes: Done: {}, {}.",
        if success { "Success" } else { "Failed" },
        format_duration(elapsed)
    )
}

/// Format whole seconds as `S sec (M.FF min)`.
#[must_use]
pub fn format_duration(elapsed: Duration) -> String {
    let sec = elapsed.as_secs();
    let min = sec / 60;
    let hundredths = (sec % 60) * 100 / 60;
    format!("{} sec ({}.{:02} min)", sec, min, hundredths)
}
