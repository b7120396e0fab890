//! Bounded multi-level priority queue.
//!
//! One fixed-size FIFO lane per [`Priority`], each a lock-free MPMC ring
//! (`crossbeam::queue::ArrayQueue`). Enqueue never blocks: a full lane is
//! reported as [`SchedulerError::QueueFull`] and retry policy stays with the
//! caller. Dequeue scans lanes from `Critical` down and never blocks either.
//!
//! Lane and total counters are independent atomics. Under concurrent
//! mutation the total can briefly disagree with the sum of the lanes; it
//! converges as soon as mutation stops.
//!
//! Scheduling is strict priority: a sustained stream of urgent tasks starves
//! the lower lanes.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use crossbeam::queue::ArrayQueue;
use tracing::{debug, info};

use crate::error::SchedulerError;
use crate::task::{Priority, Task, NUM_PRIORITIES};

/// What workers need from a queue.
pub trait TaskSource: Send + Sync {
    /// Next task in priority order, or `None` if every lane is empty.
    fn dequeue(&self) -> Option<Task>;

    /// Whether the queue has stopped accepting tasks.
    fn is_stopped(&self) -> bool;
}

/// What producers need from a queue.
pub trait TaskSink: Send + Sync {
    fn enqueue(&self, task: Task) -> Result<(), SchedulerError>;
}

/// Occupancy readings consumed by the supervisor.
pub trait QueueMetrics: Send + Sync {
    /// Total slots across all lanes.
    fn capacity(&self) -> usize;

    /// Tasks accepted and not yet dequeued.
    fn total_tasks(&self) -> usize;
}

struct Lane {
    /// `None` when the lane has zero slots.
    slots: Option<ArrayQueue<Task>>,
    depth: AtomicI64,
}

impl Lane {
    fn new(slots: usize) -> Self {
        Self {
            slots: (slots > 0).then(|| ArrayQueue::new(slots)),
            depth: AtomicI64::new(0),
        }
    }

    fn push(&self, task: Task) -> Result<(), Task> {
        match &self.slots {
            Some(q) => q.push(task),
            None => Err(task),
        }
    }

    fn pop(&self) -> Option<Task> {
        self.slots.as_ref()?.pop()
    }
}

/// Bounded priority queue shared by producers and workers.
pub struct PriorityQueue {
    lanes: [Lane; NUM_PRIORITIES],
    total: AtomicI64,
    capacity: usize,
    stopped: AtomicBool,
    closed: AtomicBool,
}

impl PriorityQueue {
    /// Create a queue with `capacity` total slots split evenly across lanes.
    /// Any remainder of the division is left unused.
    pub fn new(capacity: usize) -> Self {
        let per_lane = capacity / NUM_PRIORITIES;
        Self {
            lanes: std::array::from_fn(|_| Lane::new(per_lane)),
            total: AtomicI64::new(0),
            capacity,
            stopped: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    /// Insert a task into its priority lane without blocking.
    pub fn enqueue(&self, task: Task) -> Result<(), SchedulerError> {
        if self.is_stopped() {
            debug!(task_id = %task.id(), "rejected task, queue is stopped");
            return Err(SchedulerError::Stopped);
        }

        let priority = task.priority();
        let lane = &self.lanes[priority.index()];
        match lane.push(task) {
            Ok(()) => {
                lane.depth.fetch_add(1, Ordering::AcqRel);
                self.total.fetch_add(1, Ordering::AcqRel);
                Ok(())
            }
            Err(rejected) => {
                // Give the CPU back before reporting so tight retry loops
                // do not hot-spin on a saturated lane.
                std::thread::yield_now();
                debug!(task_id = %rejected.id(), %priority, "lane full");
                Err(SchedulerError::QueueFull(priority))
            }
        }
    }

    /// Remove the oldest task from the most urgent non-empty lane.
    pub fn dequeue(&self) -> Option<Task> {
        if self.closed.load(Ordering::Acquire) {
            return None;
        }
        for lane in &self.lanes {
            if let Some(task) = lane.pop() {
                lane.depth.fetch_sub(1, Ordering::AcqRel);
                self.total.fetch_sub(1, Ordering::AcqRel);
                return Some(task);
            }
        }
        None
    }

    /// Stop accepting tasks. Already queued tasks stay drainable.
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::AcqRel) {
            info!("priority queue stopped accepting tasks");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Finalize the queue: stop it and drop every pending task.
    ///
    /// Call only once producers and workers are done. A worker that still
    /// polls afterwards just sees an empty queue.
    pub fn close(&self) {
        self.stop();
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut dropped = 0usize;
        for lane in &self.lanes {
            while lane.pop().is_some() {
                lane.depth.fetch_sub(1, Ordering::AcqRel);
                self.total.fetch_sub(1, Ordering::AcqRel);
                dropped += 1;
            }
        }
        info!(dropped, "priority queue closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.total_tasks() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots available to a single lane.
    pub fn lane_capacity(&self) -> usize {
        self.capacity / NUM_PRIORITIES
    }

    pub fn total_tasks(&self) -> usize {
        clamp_count(self.total.load(Ordering::Acquire))
    }

    /// Pending tasks in one lane.
    pub fn lane_depth(&self, priority: Priority) -> usize {
        clamp_count(self.lanes[priority.index()].depth.load(Ordering::Acquire))
    }

    /// Pending tasks per lane, most urgent first.
    pub fn lane_depths(&self) -> [usize; NUM_PRIORITIES] {
        Priority::ALL.map(|p| self.lane_depth(p))
    }
}

/// Counters can dip below zero for an instant when a pop lands before the
/// matching increment; readers never see that.
fn clamp_count(raw: i64) -> usize {
    raw.max(0) as usize
}

impl TaskSource for PriorityQueue {
    fn dequeue(&self) -> Option<Task> {
        PriorityQueue::dequeue(self)
    }

    fn is_stopped(&self) -> bool {
        PriorityQueue::is_stopped(self)
    }
}

impl TaskSink for PriorityQueue {
    fn enqueue(&self, task: Task) -> Result<(), SchedulerError> {
        PriorityQueue::enqueue(self, task)
    }
}

impl QueueMetrics for PriorityQueue {
    fn capacity(&self) -> usize {
        PriorityQueue::capacity(self)
    }

    fn total_tasks(&self) -> usize {
        PriorityQueue::total_tasks(self)
    }
}
