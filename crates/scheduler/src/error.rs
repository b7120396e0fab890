use std::time::Duration;

use thiserror::Error;

use crate::task::Priority;

/// Errors surfaced by the queue, the worker pool and configuration loading.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The queue was stopped and will never accept another task.
    #[error("queue is stopped")]
    Stopped,

    /// The lane for this priority has no free slot. Back off and retry.
    #[error("queue is full for priority {0}")]
    QueueFull(Priority),

    /// Workers did not join before the deadline; stragglers were abandoned.
    #[error("shutdown timed out after {0:?}")]
    ShutdownTimeout(Duration),

    #[error("invalid priority level: {0}")]
    InvalidPriority(u8),

    #[error("config error: {0}")]
    Config(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config I/O error: {0}")]
    ConfigIo(#[from] std::io::Error),
}

impl SchedulerError {
    /// Whether retrying the same call later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, SchedulerError::QueueFull(_))
    }
}
