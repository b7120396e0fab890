//! Scheduler configuration.
//!
//! Parsed from `scheduler.toml`, with `SCHEDULER_*` environment overrides.
//! Split into focused submodules:
//! - `types`: config structs and their defaults
//! - `loading`: TOML/file parsing and env overrides
//! - `validation`: bound and threshold checks

mod loading;
mod types;
mod validation;

pub use types::{PoolConfig, QueueConfig, SchedulerConfig, ShutdownConfig, SupervisorConfig};
