//! find-dupes - Concurrent Duplicate File Finder
//!
//! Finds duplicate files across one or more directory trees. Files are
//! partitioned by size into a bucket table while a thread pool walks the
//! trees, then each bucket is compared by BLAKE3 digest on the same pool.
//! Results are written as plain-text list files.

pub mod cli;
pub mod config;
pub mod duplicates;
pub mod engine;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;

use crate::cli::Cli;
use crate::config::Config;
use crate::duplicates::{DuplicateFinder, FinderConfig};
use crate::error::ExitCode;
use crate::output::{default_list_dir, done_line, ListWriter, RunSummary};
use crate::progress::{status_line, Progress};
use crate::scanner::Hasher;

/// Run the application for parsed CLI arguments.
///
/// Returns the exit code to use on success or interruption; fatal errors are
/// returned for `main` to report.
///
/// # Errors
///
/// Any configuration, scan, compare, thread or output failure.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let config = Config::load(&cli).context("Failed to load configuration")?;
    let cancel = signal::install_handler().context("Failed to install signal handler")?;
    let start = Instant::now();
    let now = chrono::Local::now();

    let list_dir = config
        .list_dir
        .clone()
        .unwrap_or_else(|| default_list_dir(&now));
    let writer = ListWriter::new(list_dir, &now);
    writer.create_dir()?;

    let hasher = Hasher::new()
        .with_mmap(config.mmap)
        .with_mmap_threshold(config.mmap_threshold);
    let mut finder_config = FinderConfig::default()
        .with_jobs(config.worker_count())
        .with_table_size(config.table_size()?)
        .with_cancel_token(cancel)
        .with_file_list(config.file_list)
        .with_digest(Arc::new(hasher));
    if !cli.quiet {
        let progress = Progress::new(false).with_bars(!cli.no_progress);
        finder_config = finder_config.with_progress_callback(Arc::new(progress));
        eprintln!("{}", status_line("Finding files..."));
    }
    let report = match DuplicateFinder::new(finder_config).find_duplicates_in_paths(&cli.paths) {
        Ok(report) => report,
        Err(err) => {
            if !cli.quiet {
                eprintln!("{}", done_line(false, start.elapsed()));
            }
            return Err(err).context("Duplicate search failed");
        }
    };

    writer.write_all(&report, config.file_list)?;

    let summary = RunSummary::new(&report, writer.dir().to_path_buf());
    if cli.json {
        println!(
            "{}",
            summary
                .to_json_pretty()
                .context("Failed to serialize summary")?
        );
    }
    if !cli.quiet {
        eprintln!("{}", summary.found_line());
        eprintln!("find-dupes: Lists in '{}'.", writer.dir().display());
        eprintln!("{}", done_line(!report.interrupted, start.elapsed()));
    }

    Ok(if report.interrupted {
        ExitCode::Interrupted
    } else {
        ExitCode::Success
    })
}
