//! Fixed-size pool of worker threads.
//!
//! Each worker runs the supplied function over and over until the pool's
//! exit flag is set. The pool does not know what the function blocks on:
//! whoever parks workers (the [`WorkQueue`](super::WorkQueue) semaphore) has
//! to wake them after [`ThreadPool::request_exit`] and before
//! [`ThreadPool::join`], otherwise `join` never returns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::EngineError;

/// Fixed set of worker threads sharing one run function.
pub struct ThreadPool {
    name: String,
    workers: Vec<JoinHandle<()>>,
    exit: Arc<AtomicBool>,
}

impl ThreadPool {
    /// Spawn `count` workers named `{name}-{id}`.
    ///
    /// Returns once every thread exists. `run` receives the worker id.
    ///
    /// # Errors
    ///
    /// [`EngineError::Spawn`] if a thread cannot be created. The exit flag is
    /// set before returning, and threads that did start are detached; the
    /// caller must wake them if they are parked.
    pub fn new<F>(count: usize, name: &str, run: F) -> Result<Self, EngineError>
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        let count = count.max(1);
        let exit = Arc::new(AtomicBool::new(false));
        let run = Arc::new(run);
        let mut workers = Vec::with_capacity(count);

        log::debug!("Thread pool '{}': creating {} workers", name, count);

        for id in 0..count {
            let exit_flag = Arc::clone(&exit);
            let run = Arc::clone(&run);
            let thread_name = format!("{}-{}", name, id);

            let spawned = thread::Builder::new()
                .name(thread_name.clone())
                .spawn(move || {
                    while !exit_flag.load(Ordering::Acquire) {
                        run(id);
                    }
                    log::trace!("Worker {} exiting", id);
                });

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(source) => {
                    exit.store(true, Ordering::Release);
                    return Err(EngineError::Spawn {
                        name: thread_name,
                        source,
                    });
                }
            }
        }

        Ok(Self {
            name: name.to_string(),
            workers,
            exit,
        })
    }

    /// Number of workers.
    #[must_use]
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Ask workers to stop after their current run.
    pub fn request_exit(&self) {
        self.exit.store(true, Ordering::Release);
    }

    /// Whether exit was requested.
    #[must_use]
    pub fn is_exiting(&self) -> bool {
        self.exit.load(Ordering::Acquire)
    }

    /// Request exit and join every worker.
    ///
    /// Returns the number of workers that panicked.
    pub fn join(self) -> usize {
        self.request_exit();
        let mut panicked = 0;
        for (id, handle) in self.workers.into_iter().enumerate() {
            if handle.join().is_err() {
                log::error!("Thread pool '{}': worker {} panicked", self.name, id);
                panicked += 1;
            }
        }
        log::debug!("Thread pool '{}': all workers joined", self.name);
        panicked
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("name", &self.name)
            .field("size", &self.workers.len())
            .field("exit", &self.is_exiting())
            .finish()
    }
}
