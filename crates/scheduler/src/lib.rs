//! In-process priority task scheduler.
//!
//! A bounded multi-level [`PriorityQueue`] feeds a dynamically sized
//! [`WorkerPool`]; a [`Supervisor`] resizes the pool from queue utilization.
//! [`SchedulerRuntime`] wires the three together and owns ordered shutdown.

pub mod config;
pub mod error;
pub mod pool;
pub mod queue;
pub mod runtime;
pub mod status;
pub mod supervisor;
pub mod task;

pub use config::{PoolConfig, QueueConfig, SchedulerConfig, ShutdownConfig, SupervisorConfig};
pub use error::SchedulerError;
pub use pool::{PoolControl, WorkerPool};
pub use queue::{PriorityQueue, QueueMetrics, TaskSink, TaskSource};
pub use runtime::SchedulerRuntime;
pub use status::{LaneStatus, StatusSnapshot};
pub use supervisor::{ScaleDecision, Supervisor, SupervisorState};
pub use task::{Priority, Task, TaskAction, NUM_PRIORITIES};
