//! Producer/consumer work queue driving a [`ThreadPool`].
//!
//! # Overview
//!
//! Items wait in a ready list until a worker claims them. A counting
//! semaphore holds one permit per enqueued item; idle workers park on it and
//! nowhere else. A woken worker checks the exit flag, claims the first
//! unclaimed ready item and hands it to the [`WorkHandler`].
//!
//! The claimed item stays on the ready list (marked in-use) while it runs.
//! The handler settles it exactly once through the [`WorkTicket`]: either
//! [`QueueHandle::finish`] moves it to the done list together with its
//! result, or [`QueueHandle::release`] drops it. The ready list therefore
//! becomes empty only when every enqueued item has been settled, which is
//! what [`WorkQueue::wait_idle`] waits for.
//!
//! Completion order is unconstrained.
//!
//! A handler that panics leaves its item claimed and records
//! [`EngineError::WorkerPanicked`] as the queue fault, which ends
//! [`WorkQueue::wait_idle`]. The worker thread keeps serving the queue.
//!
//! # Shutdown
//!
//! [`WorkQueue::shutdown`] sets the exit flags, posts one permit per worker
//! so every parked wait returns and observes exit, then joins. Items that
//! were never claimed stay on the ready list for [`WorkQueue::drain_ready`].

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use super::list::{ConcurrentList, NodeHandle};
use super::pool::ThreadPool;
use super::semaphore::Semaphore;
use super::EngineError;

/// Proof of a claimed ready item. Consumed by `finish` or `release`.
#[derive(Debug)]
#[must_use = "a claimed item must be finished or released"]
pub struct WorkTicket {
    id: u32,
    handle: NodeHandle,
}

impl WorkTicket {
    /// Id assigned at enqueue time.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }
}

/// Callback invoked by workers for each claimed item.
pub trait WorkHandler<J, R>: Send + Sync + 'static {
    /// Process `job`. The handler owns `ticket` and must settle it.
    fn handle(&self, queue: &QueueHandle<J, R>, ticket: WorkTicket, job: J);
}

struct WorkItem<J, R> {
    id: u32,
    job: Option<J>,
    result: Option<R>,
}

struct Shared<J, R> {
    ready: ConcurrentList<WorkItem<J, R>>,
    done: ConcurrentList<WorkItem<J, R>>,
    work_ready: Semaphore,
    exit: AtomicBool,
    next_id: AtomicU32,
    idle_lock: Mutex<()>,
    idle: Condvar,
    fault: Mutex<Option<EngineError>>,
}

impl<J, R> Shared<J, R> {
    fn record_fault(&self, err: EngineError) {
        log::error!("Work queue fault: {}", err);
        let mut fault = self.fault.lock();
        if fault.is_none() {
            *fault = Some(err);
        }
        drop(fault);
        self.notify_idle();
    }

    fn notify_idle(&self) {
        let _guard = self.idle_lock.lock();
        self.idle.notify_all();
    }

    fn settled(&self) {
        if self.ready.is_empty() {
            self.notify_idle();
        }
    }
}

/// Cloneable access to a queue for producers and handlers.
pub struct QueueHandle<J, R> {
    shared: Arc<Shared<J, R>>,
}

impl<J, R> Clone for QueueHandle<J, R> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<J, R> QueueHandle<J, R> {
    /// Append a job to the ready list and wake one worker. Returns its id.
    pub fn enqueue(&self, job: J) -> u32 {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        self.shared.ready.push_back(WorkItem {
            id,
            job: Some(job),
            result: None,
        });
        self.shared.work_ready.post();
        log::trace!("Work item {} queued", id);
        id
    }

    /// Move a claimed item to the done list with its result.
    ///
    /// # Errors
    ///
    /// [`EngineError::List`] if the ticket's item is not a claimed ready item.
    pub fn finish(&self, ticket: WorkTicket, result: R) -> Result<(), EngineError> {
        let mut item = self.shared.ready.remove_claimed(ticket.handle)?;
        item.result = Some(result);
        self.shared.done.push_back(item);
        log::trace!("Work item {} finished", ticket.id);
        self.shared.settled();
        Ok(())
    }

    /// Drop a claimed item without recording a result.
    ///
    /// # Errors
    ///
    /// [`EngineError::List`] if the ticket's item is not a claimed ready item.
    pub fn release(&self, ticket: WorkTicket) -> Result<(), EngineError> {
        self.shared.ready.remove_claimed(ticket.handle)?;
        log::trace!("Work item {} released", ticket.id);
        self.shared.settled();
        Ok(())
    }

    /// Whether shutdown has begun.
    #[must_use]
    pub fn is_exiting(&self) -> bool {
        self.shared.exit.load(Ordering::Acquire)
    }
}

/// Semaphore-gated work queue with ready and done lists.
pub struct WorkQueue<J, R> {
    handle: QueueHandle<J, R>,
    pool: Option<ThreadPool>,
    threads: usize,
}

impl<J, R> WorkQueue<J, R>
where
    J: Send + 'static,
    R: Send + 'static,
{
    /// Start `threads` workers dispatching to `handler`.
    ///
    /// # Errors
    ///
    /// [`EngineError::Spawn`] if the pool cannot be created. Workers that did
    /// start are woken and told to exit before returning.
    pub fn new<H>(threads: usize, name: &str, handler: Arc<H>) -> Result<Self, EngineError>
    where
        H: WorkHandler<J, R>,
    {
        let threads = threads.max(1);
        let shared = Arc::new(Shared {
            ready: ConcurrentList::new("ready"),
            done: ConcurrentList::new("done"),
            work_ready: Semaphore::new(0),
            exit: AtomicBool::new(false),
            next_id: AtomicU32::new(0),
            idle_lock: Mutex::new(()),
            idle: Condvar::new(),
            fault: Mutex::new(None),
        });

        let worker_shared = Arc::clone(&shared);
        let pool = ThreadPool::new(threads, name, move |id| {
            run_worker(id, &worker_shared, handler.as_ref());
        });

        let pool = match pool {
            Ok(pool) => pool,
            Err(err) => {
                shared.exit.store(true, Ordering::Release);
                shared.work_ready.post_n(threads);
                return Err(err);
            }
        };

        Ok(Self {
            handle: QueueHandle { shared },
            pool: Some(pool),
            threads,
        })
    }
}

impl<J, R> WorkQueue<J, R> {
    /// A cloneable handle for producers.
    #[must_use]
    pub fn handle(&self) -> QueueHandle<J, R> {
        self.handle.clone()
    }

    /// Convenience for [`QueueHandle::enqueue`].
    pub fn enqueue(&self, job: J) -> u32 {
        self.handle.enqueue(job)
    }

    /// Number of worker threads.
    #[must_use]
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Items on the ready list, claimed or not.
    #[must_use]
    pub fn ready_len(&self) -> usize {
        self.handle.shared.ready.len()
    }

    /// Items on the done list.
    #[must_use]
    pub fn done_len(&self) -> usize {
        self.handle.shared.done.len()
    }

    /// Whether a worker recorded an engine fault.
    #[must_use]
    pub fn has_fault(&self) -> bool {
        self.handle.shared.fault.lock().is_some()
    }

    /// Take the first recorded engine fault.
    pub fn take_fault(&self) -> Option<EngineError> {
        self.handle.shared.fault.lock().take()
    }

    /// Block until the ready list is empty or `stop` returns true.
    ///
    /// `on_tick` runs every `tick` while waiting. Returns `true` when the
    /// queue went idle, `false` when `stop` (or an engine fault) ended the
    /// wait first.
    pub fn wait_idle(
        &self,
        stop: impl Fn() -> bool,
        tick: Duration,
        mut on_tick: impl FnMut(),
    ) -> bool {
        let shared = &self.handle.shared;
        loop {
            if shared.ready.is_empty() {
                return true;
            }
            if stop() || self.has_fault() {
                return false;
            }
            {
                let mut guard = shared.idle_lock.lock();
                if !shared.ready.is_empty() {
                    let _ = shared.idle.wait_for(&mut guard, tick);
                }
            }
            on_tick();
        }
    }

    /// Stop the workers and join them. Idempotent.
    ///
    /// Workers finish the item in hand first. Returns the number of workers
    /// that panicked.
    pub fn shutdown(&mut self) -> usize {
        let Some(pool) = self.pool.take() else {
            return 0;
        };

        pool.request_exit();
        self.handle.shared.exit.store(true, Ordering::Release);
        self.handle.shared.work_ready.post_n(pool.size());

        let panicked = pool.join();
        let shared = &self.handle.shared;
        log::debug!(
            "Work queue shut down: {} ready ({} claimed), {} done, {} permits unused",
            self.ready_len(),
            shared.ready.claimed_count(),
            self.done_len(),
            shared.work_ready.available()
        );
        panicked
    }

    /// Remove every item left on the ready list and return how many there
    /// were. Call after [`shutdown`](Self::shutdown).
    pub fn drain_ready(&self) -> usize {
        let drained = self.handle.shared.ready.drain();
        for item in &drained {
            log::trace!("Drained unclaimed work item {}", item.id);
        }
        drained.len()
    }

    /// Take every finished item as `(id, result)`.
    pub fn take_done(&self) -> Vec<(u32, Option<R>)> {
        self.handle
            .shared
            .done
            .drain()
            .into_iter()
            .map(|item| (item.id, item.result))
            .collect()
    }
}

impl<J, R> Drop for WorkQueue<J, R> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker<J, R, H>(id: usize, shared: &Arc<Shared<J, R>>, handler: &H)
where
    H: WorkHandler<J, R>,
{
    shared.work_ready.wait();

    if shared.exit.load(Ordering::Acquire) {
        log::trace!("Worker {}: exit observed", id);
        return;
    }

    let claimed = shared
        .ready
        .claim_first_unclaimed_with(|item| (item.id, item.job.take()));

    match claimed {
        Some((handle, (item_id, Some(job)))) => {
            log::trace!("Worker {}: claimed work item {}", id, item_id);
            let queue = QueueHandle {
                shared: Arc::clone(shared),
            };
            let ran = panic::catch_unwind(AssertUnwindSafe(|| {
                handler.handle(&queue, WorkTicket { id: item_id, handle }, job);
            }));
            if let Err(payload) = ran {
                shared.record_fault(EngineError::WorkerPanicked {
                    item: item_id,
                    message: panic_message(payload.as_ref()),
                });
            }
        }
        Some((_, (item_id, None))) => {
            shared.record_fault(EngineError::MissingJob(item_id));
        }
        None => {
            shared.record_fault(EngineError::ReadyListEmpty);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
