use super::types::SchedulerConfig;
use crate::error::SchedulerError;

impl SchedulerConfig {
    /// Validate the config: worker bounds, thresholds and factors.
    ///
    /// A zero queue capacity is allowed; the supervisor treats it as "no
    /// signal" and skips its ticks.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        self.validate_worker_bounds()?;
        self.validate_thresholds()?;
        self.validate_factors()?;
        self.validate_intervals()?;
        Ok(())
    }

    fn validate_worker_bounds(&self) -> Result<(), SchedulerError> {
        let s = &self.supervisor;
        if s.min_workers > s.max_workers {
            return Err(SchedulerError::Config(format!(
                "min_workers ({}) exceeds max_workers ({})",
                s.min_workers, s.max_workers
            )));
        }
        let initial = self.pool.initial_workers;
        if initial < s.min_workers || initial > s.max_workers {
            return Err(SchedulerError::Config(format!(
                "initial_workers ({initial}) outside [{}, {}]",
                s.min_workers, s.max_workers
            )));
        }
        Ok(())
    }

    fn validate_thresholds(&self) -> Result<(), SchedulerError> {
        let s = &self.supervisor;
        for (name, value) in [
            ("scale_up_threshold", s.scale_up_threshold),
            ("scale_down_threshold", s.scale_down_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SchedulerError::Config(format!(
                    "{name} ({value}) must be within [0, 1]"
                )));
            }
        }
        if s.scale_down_threshold >= s.scale_up_threshold {
            return Err(SchedulerError::Config(format!(
                "scale_down_threshold ({}) must be below scale_up_threshold ({})",
                s.scale_down_threshold, s.scale_up_threshold
            )));
        }
        Ok(())
    }

    fn validate_factors(&self) -> Result<(), SchedulerError> {
        let s = &self.supervisor;
        if !s.scale_up_factor.is_finite() || s.scale_up_factor <= 1.0 {
            return Err(SchedulerError::Config(format!(
                "scale_up_factor ({}) must be greater than 1",
                s.scale_up_factor
            )));
        }
        let down = s.scale_down_factor;
        if !down.is_finite() || down <= 0.0 || down >= 1.0 {
            return Err(SchedulerError::Config(format!(
                "scale_down_factor ({}) must be within (0, 1)",
                s.scale_down_factor
            )));
        }
        Ok(())
    }

    fn validate_intervals(&self) -> Result<(), SchedulerError> {
        if self.supervisor.tick_interval_ms == 0 {
            return Err(SchedulerError::Config(
                "supervisor tick_interval_ms must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
