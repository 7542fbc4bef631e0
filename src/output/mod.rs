//! Reporting layer for finished runs.
//!
//! - [`lists`]: `unique.lst`, `dupes.lst`, `empty.lst` and `files.lst`
//! - [`summary`]: stderr summary lines and the `--json` summary
//!
//! # Example
//!
//! ```no_run
//! use find_dupes::duplicates::DuplicateFinder;
//! use find_dupes::output::{ListWriter, RunSummary};
//! use std::path::Path;
//!
//! let report = DuplicateFinder::with_defaults()
//!     .find_duplicates(Path::new("."))
//!     .unwrap();
//!
//! let now = chrono::Local::now();
//! let writer = ListWriter::new("/tmp/dupes", &now);
//! writer.write_all(&report, false).unwrap();
//!
//! let summary = RunSummary::new(&report, writer.dir().to_path_buf());
//! eprintln!("{}", summary.found_line());
//! ```

pub mod lists;
pub mod summary;

pub use lists::{default_list_dir, ListWriter, OutputError};
pub use summary::{done_line, format_duration, RunSummary};
