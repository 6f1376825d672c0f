//! Fast axis nested inside a slow outer axis — the two-axis composed sweep
//! owns an inner one-axis sweep rather than subclassing it.

use super::one_axis::OneAxisSweep;
use super::{StepOutcome, SweepKind};
use crate::ramp::ramp_to_default;
use crate::trajectory::{Trajectory, TrajectoryMode};
use measureit_common::consts::{BACK_MULTIPLIER_DEFAULT, OUTER_DELAY_MIN};
use measureit_common::error::MeasureItError;
use measureit_parameter::{safe_get, safe_set, Parameter};
use serde_json::json;
use std::thread;
use std::time::Duration;

/// A slow outer axis stepped once per full pass of a fast inner
/// [`OneAxisSweep`].
///
/// # Non-goals
/// The outer trajectory must be [`TrajectoryMode::OneShot`]: a bidirectional
/// or continual outer axis would need to re-derive its own flip/wrap
/// semantics on top of an already-wrapping inner axis, which the original
/// system does not support either.
pub struct TwoAxisSweep {
    inner: OneAxisSweep,
    inner_start: f64,
    outer_param: Box<dyn Parameter>,
    outer_trajectory: Trajectory,
    outer_delay: f64,
    outer_index: u64,
    back_multiplier: u32,
    passes_done: u32,
    last_outer_setpoint: f64,
}

impl TwoAxisSweep {
    /// Construct from an inner fast-axis sweep and an outer slow-axis
    /// parameter/trajectory/delay. `back_multiplier` repeats the inner pass
    /// that many times before advancing the outer axis (default 1).
    ///
    /// # Errors
    /// Returns [`MeasureItError::Config`] if `outer_trajectory` is not
    /// [`TrajectoryMode::OneShot`].
    pub fn new(
        inner: OneAxisSweep,
        outer_param: Box<dyn Parameter>,
        outer_trajectory: Trajectory,
        outer_delay: f64,
        back_multiplier: u32,
    ) -> Result<Self, MeasureItError> {
        if outer_trajectory.mode() != TrajectoryMode::OneShot {
            return Err(MeasureItError::Config(
                "two-axis outer trajectory must be one-shot".to_string(),
            ));
        }
        let inner_start = inner.trajectory().start();
        let last_outer_setpoint = outer_trajectory.start();
        Ok(Self {
            inner,
            inner_start,
            outer_param,
            outer_trajectory,
            outer_delay,
            outer_index: 0,
            back_multiplier: back_multiplier.max(1),
            passes_done: 0,
            last_outer_setpoint,
        })
    }

    /// Construct with the default back-multiplier.
    pub fn new_default_back_multiplier(
        inner: OneAxisSweep,
        outer_param: Box<dyn Parameter>,
        outer_trajectory: Trajectory,
        outer_delay: f64,
    ) -> Result<Self, MeasureItError> {
        Self::new(inner, outer_param, outer_trajectory, outer_delay, BACK_MULTIPLIER_DEFAULT)
    }
}

impl SweepKind for TwoAxisSweep {
    fn kind_name(&self) -> &'static str {
        "two_axis"
    }

    fn validate(&self) -> Result<(), MeasureItError> {
        self.inner.validate()?;
        if self.outer_delay < OUTER_DELAY_MIN {
            return Err(MeasureItError::Config(format!(
                "outer_delay {} below minimum {}",
                self.outer_delay, OUTER_DELAY_MIN
            )));
        }
        Ok(())
    }

    fn trajectory_count(&self) -> Option<u64> {
        let inner_count = self.inner.trajectory_count()?;
        Some(inner_count * self.outer_trajectory.count() * self.back_multiplier as u64)
    }

    fn controlled_names(&self) -> Vec<String> {
        let mut names = self.inner.controlled_names();
        names.push(self.outer_param.name().to_string());
        names
    }

    fn ramp_to_start(&mut self) -> Result<(), MeasureItError> {
        ramp_to_default(self.outer_param.as_mut(), self.outer_trajectory.start(), self.outer_trajectory.step())?;
        self.last_outer_setpoint = self.outer_trajectory.start();
        self.outer_index = 0;
        self.passes_done = 0;
        self.inner.ramp_to_start()
    }

    fn run_step(&mut self) -> Result<StepOutcome, MeasureItError> {
        let inner_outcome = self.inner.run_step()?;
        if !matches!(inner_outcome, StepOutcome::EndOneShot) {
            return Ok(StepOutcome::More);
        }

        self.passes_done += 1;
        if self.passes_done < self.back_multiplier {
            self.inner.ramp_to_start()?;
            return Ok(StepOutcome::More);
        }
        self.passes_done = 0;

        self.outer_index += 1;
        if self.outer_index >= self.outer_trajectory.count() {
            return Ok(StepOutcome::EndOneShot);
        }

        let next_outer = self.outer_trajectory.setpoint_at(self.outer_index);
        safe_set(self.outer_param.as_mut(), next_outer)?;
        if self.outer_delay > 0.0 {
            thread::sleep(Duration::from_secs_f64(self.outer_delay));
        }
        self.last_outer_setpoint = safe_get(self.outer_param.as_mut())?;
        self.on_flip();
        self.inner.ramp_to_start()?;
        Ok(StepOutcome::LineBreak)
    }

    fn current_setpoints(&self) -> Vec<f64> {
        let mut v = self.inner.current_setpoints();
        v.push(self.last_outer_setpoint);
        v
    }

    fn on_flip(&mut self) {
        // Re-home the fast axis to its declared start, independent of
        // whichever direction it last ran in.
        self.inner_start = self.inner.trajectory().start();
    }

    fn export_attributes(&self) -> serde_json::Value {
        json!({
            "outer_delay": self.outer_delay,
            "back_multiplier": self.back_multiplier,
            "inner": self.inner.export_attributes(),
        })
    }

    fn controlled_descriptor(&self) -> Option<serde_json::Value> {
        Some(json!({
            "inner": self.inner.controlled_descriptor(),
            "outer": {
                "name": self.outer_param.name(),
                "identity": self.outer_param.identity(),
                "start": self.outer_trajectory.start(),
                "stop": self.outer_trajectory.stop(),
                "step": self.outer_trajectory.step(),
            },
        }))
    }
}
