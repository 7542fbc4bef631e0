//! Signal handling for graceful shutdown.
//!
//! Ctrl+C (and SIGTERM) only ever set a [`CancelToken`]. The token is passed
//! explicitly into the finder, which polls it at its checkpoints and winds the
//! work queue down cleanly.
//!
//! # Usage
//!
//! ```rust,no_run
//! use find_dupes::signal::install_handler;
//!
//! let token = install_handler().expect("Failed to install signal handler");
//!
//! if token.is_cancelled() {
//!     println!("Cancelled, cleaning up...");
//!     return;
//! }
//!
//! // Pass token.clone() to FinderConfig::with_cancel_token
//! ```
//!
//! # Exit Codes
//!
//! When a signal is received:
//! - The token is set
//! - "Interrupted. Cleaning up..." is printed to stderr
//! - The application exits with code 130 (128 + SIGINT) once the lists
//!   gathered so far are written

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Exit code for SIGINT (Ctrl+C) interruption.
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

/// Predicate polled at cancellation checkpoints.
pub type StopCheck = Arc<dyn Fn() -> bool + Send + Sync>;

/// Shared one-way cancellation flag.
///
/// Cloning shares the underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clear the flag. Used when a process-wide token is handed out again.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static GLOBAL_TOKEN: OnceLock<CancelToken> = OnceLock::new();

/// Install a Ctrl+C handler that cancels the returned token.
///
/// Only one handler can exist per process. Later calls (as happens when
/// `run_app` is driven repeatedly from tests) get the same token back, reset.
///
/// # Errors
///
/// [`SignalError::InstallFailed`] if the handler cannot be registered and no
/// earlier call registered one.
pub fn install_handler() -> Result<CancelToken, SignalError> {
    if let Some(token) = GLOBAL_TOKEN.get() {
        token.reset();
        return Ok(token.clone());
    }

    let token = CancelToken::new();
    let flag = token.clone();

    match ctrlc::set_handler(move || {
        flag.cancel();
        let _ = writeln!(std::io::stderr(), "\nInterrupted. Cleaning up...");
        let _ = std::io::stderr().flush();
        log::info!("Shutdown signal received");
    }) {
        Ok(()) => {
            let _ = GLOBAL_TOKEN.set(token.clone());
            Ok(token)
        }
        Err(ctrlc::Error::MultipleHandlers) => {
            // Lost a race with a concurrent caller; fall back to an unhooked
            // token if that caller has not published its own yet.
            log::debug!("Ctrl+C handler already registered, using unhooked token");
            let fallback = GLOBAL_TOKEN.get_or_init(CancelToken::new);
            fallback.reset();
            Ok(fallback.clone())
        }
        Err(e) => Err(SignalError::InstallFailed(e)),
    }
}
