use std::path::Path;
use std::str::FromStr;

use tracing::warn;

use crate::error::SchedulerError;

use super::types::SchedulerConfig;

impl SchedulerConfig {
    /// Parse config from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, SchedulerError> {
        let mut config: Self = toml::from_str(toml_str)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SchedulerError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Defaults plus environment overrides, validated.
    pub fn from_env() -> Result<Self, SchedulerError> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    // ── Environment variable overrides ──────────────────────────────

    /// Apply environment variable overrides.
    ///
    /// Convention: `SCHEDULER_SECTION_KEY` overrides `section.key`.
    /// Examples:
    /// - `SCHEDULER_QUEUE_CAPACITY` -> `queue.capacity`
    /// - `SCHEDULER_POOL_INITIAL_WORKERS` -> `pool.initial_workers`
    /// - `SCHEDULER_SUPERVISOR_MAX_WORKERS` -> `supervisor.max_workers`
    /// - `SCHEDULER_SHUTDOWN_TIMEOUT_SECS` -> `shutdown.timeout_secs`
    pub(crate) fn apply_env_overrides(&mut self) {
        override_from_env("SCHEDULER_QUEUE_CAPACITY", &mut self.queue.capacity);
        override_from_env("SCHEDULER_POOL_INITIAL_WORKERS", &mut self.pool.initial_workers);
        override_from_env("SCHEDULER_POOL_IDLE_BACKOFF_MS", &mut self.pool.idle_backoff_ms);

        let s = &mut self.supervisor;
        override_from_env("SCHEDULER_SUPERVISOR_MIN_WORKERS", &mut s.min_workers);
        override_from_env("SCHEDULER_SUPERVISOR_MAX_WORKERS", &mut s.max_workers);
        override_from_env("SCHEDULER_SUPERVISOR_SCALE_UP_THRESHOLD", &mut s.scale_up_threshold);
        override_from_env("SCHEDULER_SUPERVISOR_SCALE_DOWN_THRESHOLD", &mut s.scale_down_threshold);
        override_from_env("SCHEDULER_SUPERVISOR_SCALE_UP_FACTOR", &mut s.scale_up_factor);
        override_from_env("SCHEDULER_SUPERVISOR_SCALE_DOWN_FACTOR", &mut s.scale_down_factor);
        override_from_env("SCHEDULER_SUPERVISOR_TICK_INTERVAL_MS", &mut s.tick_interval_ms);

        override_from_env("SCHEDULER_SHUTDOWN_TIMEOUT_SECS", &mut self.shutdown.timeout_secs);
    }
}

/// Overwrite `slot` with the parsed value of `key` if it is set and parses.
fn override_from_env<T: FromStr>(key: &str, slot: &mut T) {
    let Ok(raw) = std::env::var(key) else {
        return;
    };
    match raw.parse() {
        Ok(v) => *slot = v,
        Err(_) => warn!(key, value = %raw, "ignoring unparsable env override"),
    }
}
