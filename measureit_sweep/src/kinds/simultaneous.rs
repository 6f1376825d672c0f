//! Multiple controlled parameters stepped together, each along its own
//! trajectory, all sharing the same point count.

use super::{StepOutcome, SweepKind};
use crate::ramp::ramp_to_default;
use crate::trajectory::{Trajectory, TrajectoryMode};
use measureit_common::consts::INTER_DELAY_MIN;
use measureit_common::error::MeasureItError;
use measureit_parameter::{safe_get, safe_set, Parameter};
use serde_json::json;
use std::thread;
use std::time::Duration;

struct Axis {
    param: Box<dyn Parameter>,
    trajectory: Trajectory,
    last_setpoint: f64,
}

/// Several controlled parameters advanced together: step `i` of every axis
/// is written before the shared settle delay.
///
/// # Non-goals
/// Mixed trajectory modes across axes are rejected at construction — every
/// axis must share the same [`TrajectoryMode`] so a single transition event
/// describes the whole sweep.
pub struct SimultaneousSweep {
    axes: Vec<Axis>,
    inter_delay: f64,
    index: u64,
}

impl SimultaneousSweep {
    /// Construct from a non-empty list of (parameter, trajectory) axes.
    ///
    /// # Errors
    /// Returns [`MeasureItError::Config`] if `axes` is empty, if trajectory
    /// counts differ, or if trajectory modes differ.
    pub fn new(
        axes: Vec<(Box<dyn Parameter>, Trajectory)>,
        inter_delay: f64,
    ) -> Result<Self, MeasureItError> {
        if axes.is_empty() {
            return Err(MeasureItError::Config("simultaneous sweep needs at least one axis".to_string()));
        }
        let count = axes[0].1.count();
        let mode = axes[0].1.mode();
        for (_, t) in &axes {
            if t.count() != count {
                return Err(MeasureItError::Config(
                    "simultaneous axes must share the same trajectory count".to_string(),
                ));
            }
            if t.mode() != mode {
                return Err(MeasureItError::Config(
                    "simultaneous axes must share the same trajectory mode".to_string(),
                ));
            }
        }
        let axes = axes
            .into_iter()
            .map(|(param, trajectory)| Axis { last_setpoint: trajectory.start(), param, trajectory })
            .collect();
        Ok(Self { axes, inter_delay, index: 0 })
    }
}

impl SweepKind for SimultaneousSweep {
    fn kind_name(&self) -> &'static str {
        "simultaneous"
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
        match self.axes[0].trajectory.mode() {
            TrajectoryMode::OneShot => Some(self.axes[0].trajectory.count()),
            TrajectoryMode::Bidirectional | TrajectoryMode::Continual => None,
        }
    }

    fn controlled_names(&self) -> Vec<String> {
        self.axes.iter().map(|a| a.param.name().to_string()).collect()
    }

    fn ramp_to_start(&mut self) -> Result<(), MeasureItError> {
        for axis in self.axes.iter_mut() {
            ramp_to_default(axis.param.as_mut(), axis.trajectory.start(), axis.trajectory.step())?;
            axis.last_setpoint = axis.trajectory.start();
        }
        self.index = 0;
        Ok(())
    }

    fn run_step(&mut self) -> Result<StepOutcome, MeasureItError> {
        for axis in self.axes.iter_mut() {
            let setpoint = axis.trajectory.setpoint_at(self.index);
            safe_set(axis.param.as_mut(), setpoint)?;
        }
        if self.inter_delay > 0.0 {
            thread::sleep(Duration::from_secs_f64(self.inter_delay));
        }
        for axis in self.axes.iter_mut() {
            axis.last_setpoint = safe_get(axis.param.as_mut())?;
        }
        self.index += 1;

        let count = self.axes[0].trajectory.count();
        if self.index < count {
            return Ok(StepOutcome::More);
        }

        match self.axes[0].trajectory.mode() {
            TrajectoryMode::OneShot => Ok(StepOutcome::EndOneShot),
            TrajectoryMode::Bidirectional => {
                for axis in self.axes.iter_mut() {
                    axis.trajectory = axis.trajectory.flipped();
                }
                self.index = 0;
                Ok(StepOutcome::EndBidirectional)
            }
            TrajectoryMode::Continual => {
                self.index = 0;
                Ok(StepOutcome::EndContinual)
            }
        }
    }

    fn current_setpoints(&self) -> Vec<f64> {
        self.axes.iter().map(|a| a.last_setpoint).collect()
    }

    fn export_attributes(&self) -> serde_json::Value {
        json!({
            "inter_delay": self.inter_delay,
            "mode": format!("{:?}", self.axes[0].trajectory.mode()),
            "axis_count": self.axes.len(),
        })
    }

    fn controlled_descriptor(&self) -> Option<serde_json::Value> {
        Some(json!(self
            .axes
            .iter()
            .map(|a| json!({
                "name": a.param.name(),
                "identity": a.param.identity(),
                "start": a.trajectory.start(),
                "stop": a.trajectory.stop(),
                "step": a.trajectory.step(),
            }))
            .collect::<Vec<_>>()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use measureit_parameter::SimulatedParameter;

    fn axes() -> Vec<(Box<dyn Parameter>, Trajectory)> {
        vec![
            (
                Box::new(SimulatedParameter::new("a", "V", 0.0)) as Box<dyn Parameter>,
                Trajectory::new(0.0, 1.0, 0.5, TrajectoryMode::OneShot).unwrap(),
            ),
            (
                Box::new(SimulatedParameter::new("b", "V", 0.0)) as Box<dyn Parameter>,
                Trajectory::new(0.0, 2.0, 1.0, TrajectoryMode::OneShot).unwrap(),
            ),
        ]
    }

    #[test]
    fn mismatched_counts_rejected() {
        let bad = vec![
            (
                Box::new(SimulatedParameter::new("a", "V", 0.0)) as Box<dyn Parameter>,
                Trajectory::new(0.0, 1.0, 0.5, TrajectoryMode::OneShot).unwrap(),
            ),
            (
                Box::new(SimulatedParameter::new("b", "V", 0.0)) as Box<dyn Parameter>,
                Trajectory::new(0.0, 1.0, 0.25, TrajectoryMode::OneShot).unwrap(),
            ),
        ];
        assert!(SimultaneousSweep::new(bad, 0.0).is_err());
    }

    #[test]
    fn steps_all_axes_together() {
        let mut s = SimultaneousSweep::new(axes(), 0.0).unwrap();
        assert_eq!(s.trajectory_count(), Some(3));
        assert_eq!(s.run_step().unwrap(), StepOutcome::More);
        assert_eq!(s.current_setpoints(), vec![0.5, 1.0]);
        s.run_step().unwrap();
        assert_eq!(s.run_step().unwrap(), StepOutcome::EndOneShot);
        assert_eq!(s.current_setpoints(), vec![1.0, 2.0]);
    }
}
