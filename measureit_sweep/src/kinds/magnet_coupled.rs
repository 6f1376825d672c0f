//! Wraps a one-axis sweep with a second parameter driven by a fixed ratio
//! of the primary setpoint.

use super::one_axis::OneAxisSweep;
use super::{StepOutcome, SweepKind};
use measureit_common::error::MeasureItError;
use measureit_parameter::{safe_get, safe_set, Parameter};
use serde_json::json;

/// A one-axis sweep whose primary setpoint also drives a coupled parameter
/// at a fixed `ratio` (e.g. a compensation magnet tracking a sample
/// magnet).
pub struct MagnetCoupledSweep {
    inner: OneAxisSweep,
    coupled: Box<dyn Parameter>,
    ratio: f64,
    last_coupled: f64,
}

impl MagnetCoupledSweep {
    /// Wrap `inner`, driving `coupled` to `ratio * primary_setpoint` after
    /// every step.
    pub fn new(inner: OneAxisSweep, coupled: Box<dyn Parameter>, ratio: f64) -> Self {
        Self { inner, coupled, ratio, last_coupled: 0.0 }
    }
}

impl SweepKind for MagnetCoupledSweep {
    fn kind_name(&self) -> &'static str {
        "magnet_coupled"
    }

    fn validate(&self) -> Result<(), MeasureItError> {
        self.inner.validate()
    }

    fn trajectory_count(&self) -> Option<u64> {
        self.inner.trajectory_count()
    }

    fn controlled_names(&self) -> Vec<String> {
        let mut names = self.inner.controlled_names();
        names.push(self.coupled.name().to_string());
        names
    }

    fn ramp_to_start(&mut self) -> Result<(), MeasureItError> {
        self.inner.ramp_to_start()?;
        let primary = self.inner.current_setpoints()[0];
        safe_set(self.coupled.as_mut(), primary * self.ratio)?;
        self.last_coupled = safe_get(self.coupled.as_mut())?;
        Ok(())
    }

    fn run_step(&mut self) -> Result<StepOutcome, MeasureItError> {
        let outcome = self.inner.run_step()?;
        let primary = self.inner.current_setpoints()[0];
        safe_set(self.coupled.as_mut(), primary * self.ratio)?;
        self.last_coupled = safe_get(self.coupled.as_mut())?;
        Ok(outcome)
    }

    fn current_setpoints(&self) -> Vec<f64> {
        let mut v = self.inner.current_setpoints();
        v.push(self.last_coupled);
        v
    }

    fn on_flip(&mut self) {
        self.inner.on_flip();
    }

    fn export_attributes(&self) -> serde_json::Value {
        json!({
            "ratio": self.ratio,
            "coupled_identity": self.coupled.identity(),
            "inner": self.inner.export_attributes(),
        })
    }

    fn controlled_descriptor(&self) -> Option<serde_json::Value> {
        Some(json!({
            "inner": self.inner.controlled_descriptor(),
            "coupled": {
                "name": self.coupled.name(),
                "identity": self.coupled.identity(),
                "ratio": self.ratio,
            },
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trajectory::{Trajectory, TrajectoryMode};
    use measureit_parameter::SimulatedParameter;

    fn inner() -> OneAxisSweep {
        let traj = Trajectory::new(0.0, 1.0, 0.5, TrajectoryMode::OneShot).unwrap();
        OneAxisSweep::new(Box::new(SimulatedParameter::new("gate", "V", 0.0)), traj, 0.0, false)
    }

    #[test]
    fn coupled_tracks_ratio_of_primary() {
        let mut s = MagnetCoupledSweep::new(inner(), Box::new(SimulatedParameter::new("comp", "T", 0.0)), 2.0);
        s.ramp_to_start().unwrap();
        assert_eq!(s.current_setpoints(), vec![0.0, 0.0]);
        s.run_step().unwrap();
        assert_eq!(s.current_setpoints(), vec![0.5, 1.0]);
    }
}
