//! Concurrent execution engine.
//!
//! This module provides the building blocks both scan and compare phases run
//! on:
//! - [`ConcurrentList`]: lock-guarded list with exactly-once claiming
//! - [`Semaphore`]: counting semaphore idle workers park on
//! - [`ThreadPool`]: fixed set of worker threads
//! - [`WorkQueue`]: ready/done lists feeding a thread pool
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use find_dupes::engine::{QueueHandle, WorkHandler, WorkQueue, WorkTicket};
//!
//! struct Doubler;
//!
//! impl WorkHandler<u32, u32> for Doubler {
//!     fn handle(&self, queue: &QueueHandle<u32, u32>, ticket: WorkTicket, job: u32) {
//!         queue.finish(ticket, job * 2).unwrap();
//!     }
//! }
//!
//! let mut queue = WorkQueue::new(2, "doubler", Arc::new(Doubler)).unwrap();
//! queue.enqueue(21);
//! queue.wait_idle(|| false, Duration::from_millis(10), || {});
//! queue.shutdown();
//!
//! assert_eq!(queue.take_done(), vec![(0, Some(42))]);
//! ```

pub mod list;
pub mod pool;
pub mod queue;
pub mod semaphore;

pub use list::{ConcurrentList, ListError, NodeHandle};
pub use pool::ThreadPool;
pub use queue::{QueueHandle, WorkHandler, WorkQueue, WorkTicket};
pub use semaphore::Semaphore;

/// Errors raised by the execution engine itself.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// A worker thread could not be created.
    #[error("Failed to spawn worker thread '{name}': {source}")]
    Spawn {
        /// Name of the thread that failed to start
        name: String,
        /// The underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// A list operation hit a removed or unclaimed node.
    #[error(transparent)]
    List(#[from] ListError),

    /// A worker was woken for an item but found nothing to claim.
    #[error("Ready list empty after a work permit was taken")]
    ReadyListEmpty,

    /// A claimed item no longer carried its job.
    #[error("Work item {0} has no job")]
    MissingJob(u32),

    /// A handler panicked while running an item.
    #[error("Worker panicked on work item {item}: {message}")]
    WorkerPanicked {
        /// Id of the item being handled
        item: u32,
        /// Panic payload, if it was a string
        message: String,
    },
}
