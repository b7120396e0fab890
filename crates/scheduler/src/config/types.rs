use std::time::Duration;

use serde::{Deserialize, Serialize};

// ── Top-level config ────────────────────────────────────────────────

/// Full configuration for one scheduler instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub pool: PoolConfig,

    #[serde(default)]
    pub supervisor: SupervisorConfig,

    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

// ── Section configs ─────────────────────────────────────────────────

/// Queue section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Total slots, split evenly across the priority lanes.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_capacity() -> usize {
    1000
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

/// Worker pool section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Workers launched at startup.
    #[serde(default = "default_initial_workers")]
    pub initial_workers: usize,

    /// Pause before re-polling an empty queue, in milliseconds.
    #[serde(default = "default_idle_backoff_ms")]
    pub idle_backoff_ms: u64,
}

fn default_initial_workers() -> usize {
    5
}

fn default_idle_backoff_ms() -> u64 {
    100
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            initial_workers: default_initial_workers(),
            idle_backoff_ms: default_idle_backoff_ms(),
        }
    }
}

impl PoolConfig {
    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }
}

/// Supervisor section: worker bounds and the scaling controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    #[serde(default = "default_min_workers")]
    pub min_workers: usize,

    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Utilization above which the pool grows.
    #[serde(default = "default_scale_up_threshold")]
    pub scale_up_threshold: f64,

    /// Utilization below which the pool shrinks.
    #[serde(default = "default_scale_down_threshold")]
    pub scale_down_threshold: f64,

    /// Multiplier applied to the worker count when growing.
    #[serde(default = "default_scale_up_factor")]
    pub scale_up_factor: f64,

    /// Multiplier applied to the worker count when shrinking.
    #[serde(default = "default_scale_down_factor")]
    pub scale_down_factor: f64,

    /// Time between adjustment passes, in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

fn default_min_workers() -> usize {
    1
}

fn default_max_workers() -> usize {
    100
}

fn default_scale_up_threshold() -> f64 {
    0.7
}

fn default_scale_down_threshold() -> f64 {
    0.3
}

fn default_scale_up_factor() -> f64 {
    1.2
}

fn default_scale_down_factor() -> f64 {
    0.8
}

fn default_tick_interval_ms() -> u64 {
    1000
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            min_workers: default_min_workers(),
            max_workers: default_max_workers(),
            scale_up_threshold: default_scale_up_threshold(),
            scale_down_threshold: default_scale_down_threshold(),
            scale_up_factor: default_scale_up_factor(),
            scale_down_factor: default_scale_down_factor(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl SupervisorConfig {
    /// Default thresholds and factors with the given worker bounds.
    pub fn with_bounds(min_workers: usize, max_workers: usize) -> Self {
        Self {
            min_workers,
            max_workers,
            ..Self::default()
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Shutdown section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// Upper bound on the wait for workers to join.
    #[serde(default = "default_shutdown_timeout")]
    pub timeout_secs: u64,
}

fn default_shutdown_timeout() -> u64 {
    30
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl ShutdownConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
