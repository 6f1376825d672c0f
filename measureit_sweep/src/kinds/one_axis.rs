//! Single controlled parameter stepped along one [`Trajectory`].

use super::{StepOutcome, SweepKind};
use crate::ramp::ramp_to_default;
use crate::trajectory::{Trajectory, TrajectoryMode};
use measureit_common::consts::INTER_DELAY_MIN;
use measureit_common::error::MeasureItError;
use measureit_parameter::{safe_get, safe_set, Parameter};
use serde_json::json;
use std::thread;
use std::time::Duration;

/// The most common sweep kind: one controlled parameter, one trajectory.
pub struct OneAxisSweep {
    param: Box<dyn Parameter>,
    trajectory: Trajectory,
    inter_delay: f64,
    index: u64,
    last_setpoint: f64,
    restart_from_start: bool,
}

impl OneAxisSweep {
    /// Construct from a controlled parameter, its trajectory, and the
    /// inter-point delay. `restart_from_start` governs what `resume()` does
    /// after a pause: `true` re-homes to the trajectory's start, `false`
    /// (the common case) continues from wherever the sweep was paused.
    pub fn new(param: Box<dyn Parameter>, trajectory: Trajectory, inter_delay: f64, restart_from_start: bool) -> Self {
        let last_setpoint = trajectory.start();
        Self { param, trajectory, inter_delay, index: 0, last_setpoint, restart_from_start }
    }

    /// The wrapped trajectory, for composed kinds that need to read it.
    pub fn trajectory(&self) -> Trajectory {
        self.trajectory
    }

    /// The controlled parameter's name.
    pub fn name(&self) -> &str {
        self.param.name()
    }

    /// Flip the trajectory in place (swap `start`/`stop`, negate `step`)
    /// and reset to its new start index — the same transition a
    /// bidirectional end-of-trajectory applies to itself, exposed for
    /// compositions (e.g. the leakage limiter) that need to trigger it
    /// without having actually reached the trajectory's end.
    pub(crate) fn flip(&mut self) {
        self.trajectory = self.trajectory.flipped();
        self.index = 0;
    }
}

impl SweepKind for OneAxisSweep {
    fn kind_name(&self) -> &'static str {
        "one_axis"
    }

    fn validate(&self) -> Result<(), MeasureItError> {
        if self.inter_delay < INTER_DELAY_MIN {
            return Err(MeasureItError::Config(format!(
                "inter_delay {} below minimum {}",
                self.inter_delay, INTER_DELAY_MIN
            )));
        }
        Ok(())
    }

    fn trajectory_count(&self) -> Option<u64> {
        match self.trajectory.mode() {
            TrajectoryMode::OneShot => Some(self.trajectory.count()),
            TrajectoryMode::Bidirectional | TrajectoryMode::Continual => None,
        }
    }

    fn controlled_names(&self) -> Vec<String> {
        vec![self.param.name().to_string()]
    }

    fn ramp_to_start(&mut self) -> Result<(), MeasureItError> {
        ramp_to_default(self.param.as_mut(), self.trajectory.start(), self.trajectory.step())?;
        self.last_setpoint = self.trajectory.start();
        self.index = 0;
        Ok(())
    }

    fn run_step(&mut self) -> Result<StepOutcome, MeasureItError> {
        let setpoint = self.trajectory.setpoint_at(self.index);
        safe_set(self.param.as_mut(), setpoint)?;
        if self.inter_delay > 0.0 {
            thread::sleep(Duration::from_secs_f64(self.inter_delay));
        }
        self.last_setpoint = safe_get(self.param.as_mut())?;
        self.index += 1;

        if self.index < self.trajectory.count() {
            return Ok(StepOutcome::More);
        }

        match self.trajectory.mode() {
            TrajectoryMode::OneShot => Ok(StepOutcome::EndOneShot),
            TrajectoryMode::Bidirectional => {
                self.flip();
                Ok(StepOutcome::EndBidirectional)
            }
            TrajectoryMode::Continual => {
                self.index = 0;
                Ok(StepOutcome::EndContinual)
            }
        }
    }

    fn current_setpoints(&self) -> Vec<f64> {
        vec![self.last_setpoint]
    }

    fn on_resume(&mut self) {
        if self.restart_from_start {
            self.index = 0;
            self.last_setpoint = self.trajectory.start();
        }
    }

    fn export_attributes(&self) -> serde_json::Value {
        json!({
            "inter_delay": self.inter_delay,
            "mode": format!("{:?}", self.trajectory.mode()),
            "restart_from_start": self.restart_from_start,
        })
    }

    fn controlled_descriptor(&self) -> Option<serde_json::Value> {
        Some(json!({
            "name": self.param.name(),
            "identity": self.param.identity(),
            "start": self.trajectory.start(),
            "stop": self.trajectory.stop(),
            "step": self.trajectory.step(),
        }))
    }
}
