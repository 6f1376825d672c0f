//! No controlled parameter: polls a watched parameter and emits a row on
//! every qualifying change, with no coalescing.

use super::{StepOutcome, SweepKind};
use measureit_common::consts::OUTER_DELAY_MIN;
use measureit_common::error::MeasureItError;
use measureit_parameter::{safe_get, Parameter};
use serde_json::json;
use std::thread;
use std::time::Duration;

/// A sweep with no controlled parameter: polls `watched` every `poll_delay`
/// and emits whenever it changes by at least `threshold`.
pub struct ListeningSweep {
    watched: Box<dyn Parameter>,
    poll_delay: f64,
    threshold: f64,
    last_value: Option<f64>,
}

impl ListeningSweep {
    /// Construct from the watched parameter, poll period, and minimum
    /// change magnitude that counts as "qualifying".
    pub fn new(watched: Box<dyn Parameter>, poll_delay: f64, threshold: f64) -> Self {
        Self { watched, poll_delay, threshold, last_value: None }
    }
}

impl SweepKind for ListeningSweep {
    fn kind_name(&self) -> &'static str {
        "listening"
    }

    fn validate(&self) -> Result<(), MeasureItError> {
        if self.poll_delay < OUTER_DELAY_MIN {
            return Err(MeasureItError::Config(format!(
                "poll_delay {} below minimum {}",
                self.poll_delay, OUTER_DELAY_MIN
            )));
        }
        if self.threshold < 0.0 {
            return Err(MeasureItError::Config("threshold must not be negative".to_string()));
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
        self.last_value = Some(safe_get(self.watched.as_mut())?);
        Ok(())
    }

    fn run_step(&mut self) -> Result<StepOutcome, MeasureItError> {
        loop {
            thread::sleep(Duration::from_secs_f64(self.poll_delay));
            let current = safe_get(self.watched.as_mut())?;
            let changed = match self.last_value {
                Some(prev) => (current - prev).abs() >= self.threshold,
                None => true,
            };
            if changed {
                self.last_value = Some(current);
                return Ok(StepOutcome::More);
            }
        }
    }

    fn current_setpoints(&self) -> Vec<f64> {
        Vec::new()
    }

    fn export_attributes(&self) -> serde_json::Value {
        json!({
            "poll_delay": self.poll_delay,
            "threshold": self.threshold,
            "watched_identity": self.watched.identity(),
        })
    }

    fn controlled_descriptor(&self) -> Option<serde_json::Value> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use measureit_parameter::SimulatedParameter;

    #[test]
    fn emits_only_on_qualifying_change() {
        struct Drifting {
            v: f64,
        }
        impl Parameter for Drifting {
            fn name(&self) -> &str {
                "drift"
            }
            fn unit(&self) -> &str {
                "Wb"
            }
            fn get(&mut self) -> Result<f64, String> {
                self.v += 0.1;
                Ok(self.v)
            }
            fn set(&mut self, _v: f64) -> Result<(), String> {
                Err("not settable".to_string())
            }
            fn settable(&self) -> bool {
                false
            }
        }
        let mut s = ListeningSweep::new(Box::new(Drifting { v: 0.0 }), 0.0, 0.5);
        s.ramp_to_start().unwrap();
        assert_eq!(s.run_step().unwrap(), StepOutcome::More);
    }

    #[test]
    fn validate_rejects_negative_threshold() {
        let s = ListeningSweep::new(Box::new(SimulatedParameter::new("f", "Wb", 0.0)), 0.2, -1.0);
        assert!(s.validate().is_err());
    }
}
