//! Feedback controller that resizes the worker pool from queue pressure.
//!
//! Once per tick the supervisor reads queue utilization and the live worker
//! count, then grows the pool above `scale_up_threshold` or shrinks it below
//! `scale_down_threshold`. Between the two thresholds nothing changes. At most
//! one scale call happens per tick.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SupervisorConfig;
use crate::pool::PoolControl;
use crate::queue::QueueMetrics;

/// Lifecycle of a [`Supervisor`]. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SupervisorState {
    Created,
    Running,
    Stopped,
}

impl SupervisorState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => SupervisorState::Created,
            1 => SupervisorState::Running,
            _ => SupervisorState::Stopped,
        }
    }
}

/// Outcome of one adjustment pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScaleDecision {
    /// Queue capacity is zero: no signal to act on.
    Skipped,
    /// Utilization inside the hysteresis band, or the bound is already reached.
    Hold,
    Up { from: usize, to: usize },
    Down { from: usize, to: usize },
}

/// Periodic scaling loop over a pool and a queue.
///
/// Depends only on the [`PoolControl`] and [`QueueMetrics`] capabilities, so
/// either side can be replaced by a test double.
pub struct Supervisor {
    pool: Arc<dyn PoolControl>,
    queue: Arc<dyn QueueMetrics>,
    config: SupervisorConfig,
    state: AtomicU8,
    /// Serializes adjustment passes.
    adjust_lock: Mutex<()>,
    stop: CancellationToken,
}

impl Supervisor {
    pub fn new(
        pool: Arc<dyn PoolControl>,
        queue: Arc<dyn QueueMetrics>,
        config: SupervisorConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            pool,
            queue,
            config,
            state: AtomicU8::new(SupervisorState::Created as u8),
            adjust_lock: Mutex::new(()),
            stop: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    pub fn state(&self) -> SupervisorState {
        SupervisorState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Spawn the tick loop on the current Tokio runtime.
    ///
    /// Only a freshly created supervisor starts; later calls are ignored.
    pub fn start(self: &Arc<Self>) {
        if self
            .state
            .compare_exchange(
                SupervisorState::Created as u8,
                SupervisorState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            warn!(state = ?self.state(), "supervisor already started or stopped");
            return;
        }

        info!(
            min_workers = self.config.min_workers,
            max_workers = self.config.max_workers,
            interval = ?self.config.tick_interval(),
            "supervisor started"
        );

        let me = Arc::clone(self);
        tokio::spawn(async move {
            me.monitor().await;
        });
    }

    /// Stop the tick loop. Idempotent, and valid before `start`.
    pub fn stop(&self) {
        let prev = self.state.swap(SupervisorState::Stopped as u8, Ordering::AcqRel);
        self.stop.cancel();
        if SupervisorState::from_u8(prev) != SupervisorState::Stopped {
            info!("supervisor stopped");
        }
    }

    async fn monitor(&self) {
        let period = self.config.tick_interval();
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.stop.cancelled() => break,
                _ = ticker.tick() => {
                    self.adjust_workers();
                }
            }
        }
        debug!("supervisor tick loop exited");
    }

    /// Run one adjustment pass and report what it did.
    pub fn adjust_workers(&self) -> ScaleDecision {
        let _guard = self.adjust_lock.lock().unwrap_or_else(|e| e.into_inner());

        let total_tasks = self.queue.total_tasks();
        let capacity = self.queue.capacity();
        if capacity == 0 {
            debug!("queue capacity is zero, skipping scaling");
            return ScaleDecision::Skipped;
        }

        let utilization = total_tasks as f64 / capacity as f64;
        let current = self.pool.current();
        debug!(
            workers = current,
            utilization = %format!("{:.2}%", utilization * 100.0),
            "supervisor tick"
        );

        let decision = self.decide(utilization, current);
        match decision {
            ScaleDecision::Up { from, to } => {
                info!(from, to, "scaling up");
                self.pool.scale((to - from) as isize);
            }
            ScaleDecision::Down { from, to } => {
                info!(from, to, "scaling down");
                self.pool.scale(-((from - to) as isize));
            }
            ScaleDecision::Hold | ScaleDecision::Skipped => {}
        }
        decision
    }

    fn decide(&self, utilization: f64, current: usize) -> ScaleDecision {
        let c = &self.config;
        if utilization > c.scale_up_threshold && current < c.max_workers {
            let target = c.max_workers.min(scaled(current, c.scale_up_factor));
            if target > current {
                return ScaleDecision::Up { from: current, to: target };
            }
        } else if utilization < c.scale_down_threshold && current > c.min_workers {
            let target = c.min_workers.max(scaled(current, c.scale_down_factor));
            if target < current {
                return ScaleDecision::Down { from: current, to: target };
            }
        }
        ScaleDecision::Hold
    }
}

/// `floor(current * factor)`.
fn scaled(current: usize, factor: f64) -> usize {
    (current as f64 * factor).floor() as usize
}
