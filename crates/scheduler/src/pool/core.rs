use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::config::PoolConfig;
use crate::error::SchedulerError;
use crate::queue::TaskSource;

use super::worker::WorkerLoop;

/// Scaling surface consumed by the supervisor.
pub trait PoolControl: Send + Sync {
    /// Grow (`delta > 0`) or shrink (`delta < 0`) the pool. The result is
    /// never below zero.
    fn scale(&self, delta: isize);

    /// Live worker count.
    fn current(&self) -> usize;
}

/// A set of worker loops draining one shared [`TaskSource`].
///
/// Worker identifiers always form the contiguous range `0..current()`:
/// growth appends at the end and shrinking removes from the end. Each slot
/// holds the worker's own stop token, a child of the pool token.
pub struct WorkerPool {
    source: Arc<dyn TaskSource>,
    idle_backoff: Duration,
    runtime: Handle,
    /// Pool-wide cancellation, tripped once by shutdown.
    cancel: CancellationToken,
    /// Slot `i` is the stop token of worker `i`.
    workers: Mutex<Vec<CancellationToken>>,
    /// Join mechanism for every loop ever launched.
    tracker: TaskTracker,
}

impl WorkerPool {
    /// Create a pool and launch `initial_workers` loops.
    ///
    /// Must be called from within a Tokio runtime; the pool keeps a handle to
    /// it so [`WorkerPool::scale`] works from any thread afterwards.
    pub fn new(source: Arc<dyn TaskSource>, initial_workers: usize, config: &PoolConfig) -> Self {
        let pool = Self {
            source,
            idle_backoff: config.idle_backoff(),
            runtime: Handle::current(),
            cancel: CancellationToken::new(),
            workers: Mutex::new(Vec::new()),
            tracker: TaskTracker::new(),
        };
        pool.scale(initial_workers as isize);
        info!(workers = initial_workers, "worker pool started");
        pool
    }

    /// Adjust the worker count by `delta`, clamped at zero.
    ///
    /// Shrinking signals the highest-numbered workers and deregisters them
    /// right away; their loops exit at their next poll point.
    pub fn scale(&self, delta: isize) {
        if self.cancel.is_cancelled() {
            warn!(delta, "ignoring scale request, pool is shut down");
            return;
        }

        let mut workers = self.lock_workers();
        let current = workers.len();
        let target = current.saturating_add_signed(delta);

        if target > current {
            for id in current..target {
                let stop = self.cancel.child_token();
                workers.push(stop.clone());
                let worker = WorkerLoop {
                    id,
                    source: Arc::clone(&self.source),
                    stop,
                    idle_backoff: self.idle_backoff,
                };
                self.tracker.spawn_on(worker.run(), &self.runtime);
            }
            debug!(from = current, to = target, "workers added");
        } else if target < current {
            for stop in workers.drain(target..).rev() {
                stop.cancel();
            }
            debug!(from = current, to = target, "workers signalled to stop");
        }
    }

    /// Live worker count.
    pub fn current(&self) -> usize {
        self.lock_workers().len()
    }

    /// Worker loops that have not returned yet, including deregistered ones
    /// still finishing a task.
    pub fn running_loops(&self) -> usize {
        self.tracker.len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel every worker and wait for all loops to return.
    ///
    /// Workers stop at their next poll point, so this waits for in-flight
    /// tasks to finish. It never times out on its own; see
    /// [`WorkerPool::shutdown_with_timeout`].
    pub async fn shutdown(&self) {
        info!("worker pool shutting down");
        self.cancel.cancel();
        self.lock_workers().clear();
        self.tracker.close();
        self.tracker.wait().await;
        info!("worker pool shutdown complete");
    }

    /// [`WorkerPool::shutdown`] bounded by `timeout`. On expiry, loops still
    /// running are abandoned, not killed.
    pub async fn shutdown_with_timeout(&self, timeout: Duration) -> Result<(), SchedulerError> {
        match tokio::time::timeout(timeout, self.shutdown()).await {
            Ok(()) => Ok(()),
            Err(_) => {
                warn!(
                    ?timeout,
                    still_running = self.running_loops(),
                    "worker pool shutdown timed out"
                );
                Err(SchedulerError::ShutdownTimeout(timeout))
            }
        }
    }

    fn lock_workers(&self) -> MutexGuard<'_, Vec<CancellationToken>> {
        // Membership stays consistent even if a holder panicked.
        self.workers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PoolControl for WorkerPool {
    fn scale(&self, delta: isize) {
        WorkerPool::scale(self, delta)
    }

    fn current(&self) -> usize {
        WorkerPool::current(self)
    }
}
