use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SchedulerError;

/// Number of priority lanes.
pub const NUM_PRIORITIES: usize = 5;

/// Task priority. Lower numeric value = more urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub enum Priority {
    Critical = 0,
    High = 1,
    Medium = 2,
    Low = 3,
    Minimal = 4,
}

impl Priority {
    /// All levels in dequeue scan order.
    pub const ALL: [Priority; NUM_PRIORITIES] = [
        Priority::Critical,
        Priority::High,
        Priority::Medium,
        Priority::Low,
        Priority::Minimal,
    ];

    /// Lane index for this priority.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Short uppercase label used by the status table.
    pub fn label(self) -> &'static str {
        match self {
            Priority::Critical => "CRITICAL",
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
            Priority::Minimal => "MIN",
        }
    }
}

impl TryFrom<u8> for Priority {
    type Error = SchedulerError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Priority::ALL
            .get(level as usize)
            .copied()
            .ok_or(SchedulerError::InvalidPriority(level))
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// Deferred unit of work. Invoked once by the worker that dequeues the task.
pub type TaskAction = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// A prioritized unit of work.
///
/// Everything but the executed flag is fixed at construction. The task is
/// consumed by [`Task::run`]; a task that is never dequeued is simply dropped.
pub struct Task {
    id: Uuid,
    priority: Priority,
    payload: serde_json::Value,
    created_at: DateTime<Utc>,
    action: TaskAction,
    executed: Arc<AtomicBool>,
}

impl Task {
    /// Create a task from an async closure.
    pub fn new<F, Fut>(priority: Priority, action: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            id: Uuid::new_v4(),
            priority,
            payload: serde_json::Value::Null,
            created_at: Utc::now(),
            action: Box::new(move || action().boxed()),
            executed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a task from a synchronous closure. The closure runs inline on
    /// the worker, so it should be short.
    pub fn from_fn<F>(priority: Priority, action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::new(priority, move || async move { action() })
    }

    /// A task whose action does nothing.
    pub fn noop(priority: Priority) -> Self {
        Self::new(priority, || async {})
    }

    /// Attach an opaque payload.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Shared view of the executed flag, readable after the task has moved.
    pub fn executed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.executed)
    }

    pub fn is_executed(&self) -> bool {
        self.executed.load(Ordering::Acquire)
    }

    /// Run the action to completion and mark the task executed.
    pub async fn run(self) {
        let Task { action, executed, .. } = self;
        action().await;
        executed.store(true, Ordering::Release);
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("payload", &self.payload)
            .field("created_at", &self.created_at)
            .field("executed", &self.is_executed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn priority_ordering() {
        assert!(Priority::Critical < Priority::High);
        assert!(Priority::High < Priority::Medium);
        assert!(Priority::Medium < Priority::Low);
        assert!(Priority::Low < Priority::Minimal);
    }

    #[test]
    fn priority_from_level() {
        assert_eq!(Priority::try_from(0).unwrap(), Priority::Critical);
        assert_eq!(Priority::try_from(4).unwrap(), Priority::Minimal);
        assert!(matches!(
            Priority::try_from(5),
            Err(SchedulerError::InvalidPriority(5))
        ));
    }

    #[test]
    fn scan_order_matches_index() {
        for (i, p) in Priority::ALL.iter().enumerate() {
            assert_eq!(p.index(), i);
        }
        assert_eq!(Priority::Minimal.label(), "MIN");
    }

    #[tokio::test]
    async fn run_sets_executed_flag() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let task = Task::from_fn(Priority::Medium, move || {
            h.fetch_add(1, Ordering::SeqCst);
        });
        let flag = task.executed_flag();
        assert!(!task.is_executed());

        task.run().await;

        assert!(flag.load(Ordering::SeqCst));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn payload_is_carried() {
        let task = Task::noop(Priority::Low).with_payload(serde_json::json!({"job": 7}));
        assert_eq!(task.payload()["job"], 7);
        assert!(task.created_at() <= Utc::now());
    }
}
