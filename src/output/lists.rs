//! List files written into the list directory.
//!
//! Each run writes `unique.lst`, `dupes.lst` and `empty.lst`, plus
//! `files.lst` when requested. Every file starts with the same header:
//!
//! ```text
//! # find-dupes (find-dupes) 0.1.0
//! # Sat 17 Oct 2026 02:15:09 PM +02:00
//! # Dupes List
//!
//! ```
//!
//! Duplicate groups are numbered per group, anchor first, and separated by
//! a blank line:
//!
//! ```text
//! [1] /photos/a.jpg
//! [2] /backup/a.jpg
//!
//! ```

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::duplicates::{DuplicateGroup, FindReport};

/// `# find-dupes (<name>) <version>`
pub const VERSION_LINE: &str = concat!(
    "find-dupes (",
    env!("CARGO_PKG_NAME"),
    ") ",
    env!("CARGO_PKG_VERSION")
);

/// Errors raised while writing list files.
#[derive(thiserror::Error, Debug)]
pub enum OutputError {
    /// The list directory could not be created.
    #[error("Failed to create list directory {path}: {source}")]
    CreateDir {
        /// Directory that could not be created
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A list file could not be written.
    #[error("Failed to write {path}: {source}")]
    Write {
        /// File that could not be written
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Default list directory: `find-dupes-<YYYY.MM.DD.HH.MM.SS>` under the
/// system temp directory.
#[must_use]
pub fn default_list_dir(now: &DateTime<Local>) -> PathBuf {
    std::env::temp_dir().join(format!("find-dupes-{}", now.format("%Y.%m.%d.%H.%M.%S")))
}

/// Writes the list files of one run.
#[derive(Debug, Clone)]
pub struct ListWriter {
    dir: PathBuf,
    stamp: String,
}

impl ListWriter {
    /// Prepare to write into `dir`, stamping headers with `now`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, now: &DateTime<Local>) -> Self {
        Self {
            dir: dir.into(),
            stamp: now.format("%a %d %b %Y %r %:z").to_string(),
        }
    }

    /// The list directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the list directory if needed.
    ///
    /// # Errors
    ///
    /// [`OutputError::CreateDir`].
    pub fn create_dir(&self) -> Result<(), OutputError> {
        fs::create_dir_all(&self.dir).map_err(|source| OutputError::CreateDir {
            path: self.dir.clone(),
            source,
        })
    }

    /// Write every list for `report`. `files.lst` is written only when
    /// `file_list` is set.
    ///
    /// # Errors
    ///
    /// [`OutputError`] on the first directory or file failure.
    pub fn write_all(&self, report: &FindReport, file_list: bool) -> Result<(), OutputError> {
        self.create_dir()?;

        self.write_list("empty.lst", |w| {
            self.header_with_count(w, "Empty List", report.empty.len())?;
            write_paths(w, &report.empty)
        })?;

        if file_list {
            self.write_list("files.lst", |w| {
                self.header(w, "Files List")?;
                for (size, path) in &report.files {
                    writeln!(w, "{} {}", size, path.display())?;
                }
                Ok(())
            })?;
        }

        self.write_list("dupes.lst", |w| {
            self.header(w, "Dupes List")?;
            for group in &report.groups {
                write_group(w, group)?;
            }
            Ok(())
        })?;

        self.write_list("unique.lst", |w| {
            self.header(w, "Unique List")?;
            write_paths(w, &report.unique)
        })?;

        log::debug!("Lists written to {}", self.dir.display());
        Ok(())
    }

    fn write_list(
        &self,
        name: &str,
        body: impl FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
    ) -> Result<(), OutputError> {
        let path = self.dir.join(name);
        let result = File::create(&path).and_then(|file| {
            let mut writer = BufWriter::new(file);
            body(&mut writer)?;
            writer.flush()
        });
        result.map_err(|source| OutputError::Write { path, source })
    }

    fn header(&self, w: &mut impl Write, title: &str) -> std::io::Result<()> {
        writeln!(w, "# {}\n# {}\n# {}\n", VERSION_LINE, self.stamp, title)
    }

    fn header_with_count(
        &self,
        w: &mut impl Write,
        title: &str,
        count: usize,
    ) -> std::io::Result<()> {
        writeln!(
            w,
            "# {}\n# {}\n# {} - {} files.\n",
            VERSION_LINE, self.stamp, title, count
        )
    }
}

fn write_paths(w: &mut impl Write, paths: &[PathBuf]) -> std::io::Result<()> {
    for path in paths {
        writeln!(w, "{}", path.display())?;
    }
    Ok(())
}

fn write_group(w: &mut impl Write, group: &DuplicateGroup) -> std::io::Result<()> {
    for (number, path) in group.paths().enumerate() {
        writeln!(w, "[{}] {}", number + 1, path.display())?;
    }
    writeln!(w)
}
