//! Command-line interface definitions for find-dupes.
//!
//! This module defines all CLI arguments using the clap derive API. Options
//! that also exist as configuration keys are `Option`s so that only flags the
//! user actually passed override the config file and environment.
//!
//! # Example
//!
//! ```bash
//! # Scan two trees, writing the lists to a chosen directory
//! find-dupes -l /tmp/dupes ~/Pictures /mnt/backup/Pictures
//!
//! # Eight workers, 4096 buckets, also write files.lst
//! find-dupes -j 8 -b 4 -f ~/Downloads
//!
//! # Verbose mode for debugging
//! find-dupes -v ~/Downloads
//! ```

use clap::Parser;
use std::path::PathBuf;

/// Concurrent duplicate file finder.
///
/// Partitions files by size and compares BLAKE3 digests within each size
/// class. Writes unique, duplicate and empty file lists to a list directory.
#[derive(Debug, Parser)]
#[command(name = "find-dupes")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directories to scan
    #[arg(value_name = "SRC_DIR", required = true)]
    pub paths: Vec<PathBuf>,

    /// Directory the list files are written to
    ///
    /// Defaults to find-dupes-<timestamp> in the system temp directory.
    #[arg(short, long, value_name = "DIR")]
    pub list_dir: Option<PathBuf>,

    /// Also write files.lst with every file found
    #[arg(short, long)]
    pub file_list: bool,

    /// Number of worker threads (default: available parallelism)
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Bucket scale factor; the table has 1024 * N buckets (power of two)
    #[arg(short, long, value_name = "N")]
    pub buckets: Option<usize>,

    /// Memory-map large files when hashing
    #[arg(long)]
    pub mmap: bool,

    /// Minimum size for memory-mapped hashing (e.g., 16MiB)
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub mmap_threshold: Option<u64>,

    /// Path to a TOML configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Report fatal errors as JSON on stderr
    #[arg(long)]
    pub json_errors: bool,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable progress bars (status lines are still printed)
    #[arg(long)]
    pub no_progress: bool,
}

/// Parse a human-readable size string into bytes.
///
/// Supports plain numbers and SI (KB, MB, ...) or IEC (KiB, MiB, ...)
/// suffixes, case-insensitive.
///
/// # Examples
///
/// ```
/// use find_dupes::cli::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("1KiB").unwrap(), 1024);
/// assert_eq!(parse_size("16MiB").unwrap(), 16 * 1_048_576);
/// ```
/// # Errors
///
/// Returns an error if the string is empty, contains an invalid number,
/// a negative number, or an unknown size suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }
    if s.starts_with('-') {
        return Err("Size cannot be negative".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1_099_511_627_776,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}
