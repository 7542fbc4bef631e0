//! Counting semaphore built on a mutex and condition variable.

use parking_lot::{Condvar, Mutex};

/// Counting semaphore.
///
/// `post` adds a permit and wakes one waiter; `wait` blocks until a permit is
/// available and consumes it.
#[derive(Debug, Default)]
pub struct Semaphore {
    permits: Mutex<usize>,
    available: Condvar,
}

impl Semaphore {
    /// Create a semaphore holding `permits` permits.
    #[must_use]
    pub fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits),
            available: Condvar::new(),
        }
    }

    /// Add one permit.
    pub fn post(&self) {
        let mut permits = self.permits.lock();
        *permits += 1;
        self.available.notify_one();
    }

    /// Add `n` permits at once.
    pub fn post_n(&self, n: usize) {
        if n == 0 {
            return;
        }
        let mut permits = self.permits.lock();
        *permits += n;
        self.available.notify_all();
    }

    /// Block until a permit is available, then take it.
    pub fn wait(&self) {
        let mut permits = self.permits.lock();
        while *permits == 0 {
            self.available.wait(&mut permits);
        }
        *permits -= 1;
    }

    /// Permits currently available.
    #[must_use]
    pub fn available(&self) -> usize {
        *self.permits.lock()
    }
}
