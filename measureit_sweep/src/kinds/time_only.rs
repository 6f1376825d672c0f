//! No controlled parameter: samples the follow set on a fixed tick until
//! stopped, or until `max_time` elapses.

use super::{StepOutcome, SweepKind};
use measureit_common::consts::OUTER_DELAY_MIN;
use measureit_common::error::MeasureItError;
use serde_json::json;
use std::thread;
use std::time::{Duration, Instant};

/// A time-driven sweep with no controlled parameter. Ticks every
/// `outer_delay` seconds; finishes when `max_time` elapses, if set.
pub struct TimeOnlySweep {
    outer_delay: f64,
    max_time: Option<f64>,
    started_at: Option<Instant>,
}

impl TimeOnlySweep {
    /// Construct with a tick period and optional wall-clock budget.
    pub fn new(outer_delay: f64, max_time: Option<f64>) -> Self {
        Self { outer_delay, max_time, started_at: None }
    }
}

impl SweepKind for TimeOnlySweep {
    fn kind_name(&self) -> &'static str {
        "time_only"
    }

    fn validate(&self) -> Result<(), MeasureItError> {
        if self.outer_delay < OUTER_DELAY_MIN {
            return Err(MeasureItError::Config(format!(
                "outer_delay {} below minimum {}",
                self.outer_delay, OUTER_DELAY_MIN
            )));
        }
        Ok(())
    }

    fn trajectory_count(&self) -> Option<u64> {
        None
    }

    fn controlled_names(&self) -> Vec<String> {
        Vec::new()
    }

    fn ramp_to_start(&mut self) -> Result<(), MeasureItError> {
        self.started_at = Some(Instant::now());
        Ok(())
    }

    fn run_step(&mut self) -> Result<StepOutcome, MeasureItError> {
        thread::sleep(Duration::from_secs_f64(self.outer_delay));
        if let (Some(started), Some(max)) = (self.started_at, self.max_time) {
            if started.elapsed().as_secs_f64() >= max {
                return Ok(StepOutcome::EndOneShot);
            }
        }
        Ok(StepOutcome::More)
    }

    fn current_setpoints(&self) -> Vec<f64> {
        Vec::new()
    }

    fn export_attributes(&self) -> serde_json::Value {
        json!({ "outer_delay": self.outer_delay, "max_time": self.max_time })
    }

    fn controlled_descriptor(&self) -> Option<serde_json::Value> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_small_outer_delay() {
        let s = TimeOnlySweep::new(0.01, None);
        assert!(s.validate().is_err());
    }

    #[test]
    fn no_controlled_parameters() {
        let s = TimeOnlySweep::new(0.1, None);
        assert!(s.controlled_names().is_empty());
        assert!(s.controlled_descriptor().is_none());
    }

    #[test]
    fn ends_after_max_time() {
        let mut s = TimeOnlySweep::new(0.01, Some(0.005));
        s.ramp_to_start().unwrap();
        assert_eq!(s.run_step().unwrap(), StepOutcome::EndOneShot);
    }
}
