use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::queue::TaskSource;

/// Why a worker loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkerExit {
    /// The pool-wide or the worker's own stop signal fired.
    Cancelled,
    /// The queue is stopped and had nothing left to hand out.
    Drained,
}

/// One worker: polls the queue, runs tasks inline, stops cooperatively.
pub(super) struct WorkerLoop {
    pub(super) id: usize,
    pub(super) source: Arc<dyn TaskSource>,
    /// Child of the pool token, so pool shutdown reaches every worker.
    pub(super) stop: CancellationToken,
    pub(super) idle_backoff: Duration,
}

impl WorkerLoop {
    pub(super) async fn run(self) -> WorkerExit {
        debug!(worker = self.id, "worker started");
        let exit = self.poll_loop().await;
        debug!(worker = self.id, reason = ?exit, "worker stopped");
        exit
    }

    async fn poll_loop(&self) -> WorkerExit {
        loop {
            // Cancellation is only observed between tasks.
            if self.stop.is_cancelled() {
                return WorkerExit::Cancelled;
            }

            match self.source.dequeue() {
                Some(task) => {
                    let task_id = task.id();
                    let priority = task.priority();
                    debug!(worker = self.id, %task_id, %priority, "executing task");

                    if let Err(panic) = AssertUnwindSafe(task.run()).catch_unwind().await {
                        error!(
                            worker = self.id,
                            %task_id,
                            %priority,
                            panic = panic_message(&*panic),
                            "task panicked"
                        );
                    }

                    // Synchronous actions never yield; let the runtime breathe.
                    tokio::task::yield_now().await;
                }
                None => {
                    if self.source.is_stopped() {
                        return WorkerExit::Drained;
                    }
                    tokio::select! {
                        _ = self.stop.cancelled() => return WorkerExit::Cancelled,
                        _ = tokio::time::sleep(self.idle_backoff) => {}
                    }
                }
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
