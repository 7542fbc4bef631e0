//! Layered application configuration.
//!
//! Settings are merged with figment, later layers winning:
//!
//! 1. Built-in defaults
//! 2. A TOML file: `--config <FILE>` if given, else `config.toml` in the
//!    platform config directory (skipped when absent)
//! 3. Environment variables prefixed `FIND_DUPES_` (e.g. `FIND_DUPES_JOBS=8`)
//! 4. Flags given on the command line
//!
//! # Example file
//!
//! ```toml
//! jobs = 8
//! buckets = 4
//! list_dir = "/var/tmp/dupes"
//! file_list = true
//! mmap = true
//! mmap_threshold = 33554432
//! ```

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::duplicates::scaled_table_size;
use crate::scanner::hasher::DEFAULT_MMAP_THRESHOLD;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "FIND_DUPES_";

/// Errors raised while loading or validating configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A layer could not be read or did not match the schema.
    #[error("Invalid configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// An explicit `--config` file does not exist.
    #[error("Config file not found: {0}")]
    MissingFile(PathBuf),

    /// Zero worker threads.
    #[error("jobs must be at least 1")]
    InvalidJobs,

    /// Bucket scale is zero or not a power of two.
    #[error("buckets must be a power of two, got {0}")]
    InvalidBuckets(usize),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Load(Box::new(err))
    }
}

/// Resolved run settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Worker threads; `None` uses the available parallelism.
    pub jobs: Option<usize>,
    /// Bucket scale factor (table size is `1024 * buckets`).
    pub buckets: usize,
    /// Output directory for the list files.
    pub list_dir: Option<PathBuf>,
    /// Write `files.lst`.
    pub file_list: bool,
    /// Memory-map large files when hashing.
    pub mmap: bool,
    /// Minimum size for memory mapping.
    pub mmap_threshold: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            jobs: None,
            buckets: 1,
            list_dir: None,
            file_list: false,
            mmap: false,
            mmap_threshold: DEFAULT_MMAP_THRESHOLD,
        }
    }
}

/// The subset of CLI flags that override configuration. Absent flags are
/// skipped so they do not mask lower layers.
#[derive(Debug, Default, Serialize)]
struct CliOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    jobs: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    buckets: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    list_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_list: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mmap: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mmap_threshold: Option<u64>,
}

impl From<&Cli> for CliOverrides {
    fn from(cli: &Cli) -> Self {
        Self {
            jobs: cli.jobs,
            buckets: cli.buckets,
            list_dir: cli.list_dir.clone(),
            file_list: cli.file_list.then_some(true),
            mmap: cli.mmap.then_some(true),
            mmap_threshold: cli.mmap_threshold,
        }
    }
}

impl Config {
    /// Load the fully layered configuration for a CLI invocation.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] if a layer fails to parse or the result is invalid.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let figment = Self::figment(cli.config.as_deref())?
            .merge(Serialized::defaults(CliOverrides::from(cli)));
        let config: Self = figment.extract()?;
        config.validate()?;
        log::debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    /// Defaults, config file and environment, without CLI flags.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingFile`] if `explicit` names a missing file.
    pub fn figment(explicit: Option<&Path>) -> Result<Figment, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(ConfigError::MissingFile(path.to_path_buf()));
                }
                figment = figment.merge(Toml::file(path));
            }
            None => {
                if let Some(path) = Self::default_path() {
                    log::trace!("Looking for config at {}", path.display());
                    figment = figment.merge(Toml::file(path));
                }
            }
        }

        Ok(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    /// Reject settings the finder cannot run with.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidJobs`] or [`ConfigError::InvalidBuckets`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jobs == Some(0) {
            return Err(ConfigError::InvalidJobs);
        }
        self.table_size().map(|_| ())
    }

    /// Number of buckets in the table.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidBuckets`] if the scale is not a power of two.
    pub fn table_size(&self) -> Result<usize, ConfigError> {
        scaled_table_size(self.buckets).map_err(|_| ConfigError::InvalidBuckets(self.buckets))
    }

    /// Worker threads to start.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.jobs
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(4, |n| n.get()))
    }

    /// Platform config file location (`config.toml`).
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "find-dupes").map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
