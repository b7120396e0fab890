use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::pool::WorkerPool;
use crate::queue::PriorityQueue;
use crate::task::Priority;

/// Pending count for one priority lane.
#[derive(Debug, Clone, Serialize)]
pub struct LaneStatus {
    pub priority: Priority,
    pub label: &'static str,
    pub pending: usize,
}

/// Point-in-time view of the scheduler for operators.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub taken_at: DateTime<Utc>,
    pub workers: usize,
    pub total_tasks: usize,
    pub capacity: usize,
    /// Fraction of capacity in use, 0.0 when capacity is zero.
    pub utilization: f64,
    pub lanes: Vec<LaneStatus>,
}

impl StatusSnapshot {
    /// Read the counters. Each reading is independent, so under load the
    /// lanes may not sum exactly to `total_tasks`.
    pub fn capture(queue: &PriorityQueue, pool: &WorkerPool) -> Self {
        let capacity = queue.capacity();
        let total_tasks = queue.total_tasks();
        let utilization = if capacity == 0 {
            0.0
        } else {
            total_tasks as f64 / capacity as f64
        };
        Self {
            taken_at: Utc::now(),
            workers: pool.current(),
            total_tasks,
            capacity,
            utilization,
            lanes: Priority::ALL
                .iter()
                .map(|&priority| LaneStatus {
                    priority,
                    label: priority.label(),
                    pending: queue.lane_depth(priority),
                })
                .collect(),
        }
    }

    /// Human-readable status table.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "SYSTEM STATUS");
        let _ = writeln!(out, "-------------");
        let _ = writeln!(out, "Active Workers: {}", self.workers);
        let _ = writeln!(
            out,
            "Queued: {}/{} ({:.1}%)",
            self.total_tasks,
            self.capacity,
            self.utilization * 100.0
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "PRIORITY   TASKS COUNT");
        let _ = writeln!(out, "---------------------");
        for lane in &self.lanes {
            let _ = writeln!(out, "{:<10} {}", lane.label, lane.pending);
        }
        out
    }
}
