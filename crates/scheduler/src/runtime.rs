//! Wires queue, pool and supervisor into one running scheduler and owns the
//! ordered shutdown sequence.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::pool::WorkerPool;
use crate::queue::PriorityQueue;
use crate::status::StatusSnapshot;
use crate::supervisor::Supervisor;
use crate::task::Task;

/// A started scheduler: queue, worker pool and running supervisor.
pub struct SchedulerRuntime {
    queue: Arc<PriorityQueue>,
    pool: Arc<WorkerPool>,
    supervisor: Arc<Supervisor>,
}

impl SchedulerRuntime {
    /// Build all three components from `config` and start the supervisor.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(config: &SchedulerConfig) -> Result<Self, SchedulerError> {
        config.validate()?;

        let queue = Arc::new(PriorityQueue::new(config.queue.capacity));
        let pool = Arc::new(WorkerPool::new(
            queue.clone(),
            config.pool.initial_workers,
            &config.pool,
        ));
        let supervisor = Supervisor::new(pool.clone(), queue.clone(), config.supervisor.clone());
        supervisor.start();

        info!(
            capacity = config.queue.capacity,
            workers = config.pool.initial_workers,
            "scheduler started"
        );
        Ok(Self {
            queue,
            pool,
            supervisor,
        })
    }

    /// Submit a task. See [`PriorityQueue::enqueue`].
    pub fn submit(&self, task: Task) -> Result<(), SchedulerError> {
        self.queue.enqueue(task)
    }

    pub fn queue(&self) -> &Arc<PriorityQueue> {
        &self.queue
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    pub fn supervisor(&self) -> &Arc<Supervisor> {
        &self.supervisor
    }

    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot::capture(&self.queue, &self.pool)
    }

    /// Stop intake, stop scaling, then join the workers within `timeout`.
    ///
    /// The queue is closed only when every worker joined in time; after a
    /// timeout it is left open so abandoned workers never race a close.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), SchedulerError> {
        info!(?timeout, "initiating graceful shutdown");

        self.queue.stop();
        self.supervisor.stop();

        match self.pool.shutdown_with_timeout(timeout).await {
            Ok(()) => {
                self.queue.close();
                info!("shutdown complete");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "shutdown finished with workers still running");
                Err(e)
            }
        }
    }
}
