//! Setpoint trajectories: `start`, `stop`, `step`, derived
//! `count`, and a `TrajectoryMode`.

use measureit_common::error::MeasureItError;

/// How a trajectory behaves once it reaches `stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrajectoryMode {
    /// Run once, end-to-end, then finish.
    OneShot,
    /// On reaching `stop`, flip direction and continue.
    Bidirectional,
    /// On reaching `stop`, ramp back to `start` and continue.
    Continual,
}

/// A single controlled parameter's setpoint trajectory.
///
/// Invariant: `step != 0`; `sign(step) * (stop - start) >= 0`, i.e. the
/// trajectory direction is consistent with `start -> stop`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trajectory {
    start: f64,
    stop: f64,
    step: f64,
    mode: TrajectoryMode,
}

impl Trajectory {
    /// Construct and validate a trajectory.
    ///
    /// # Errors
    /// Returns [`MeasureItError::Config`] if `step == 0` or the sign of
    /// `step` is inconsistent with `start -> stop`.
    pub fn new(start: f64, stop: f64, step: f64, mode: TrajectoryMode) -> Result<Self, MeasureItError> {
        if step == 0.0 {
            return Err(MeasureItError::Config("step must not be zero".to_string()));
        }
        let delta = stop - start;
        if delta != 0.0 && step.signum() != delta.signum() {
            return Err(MeasureItError::Config(
                "step sign must be consistent with start -> stop".to_string(),
            ));
        }
        Ok(Self { start, stop, step, mode })
    }

    /// Trajectory start.
    pub fn start(&self) -> f64 {
        self.start
    }

    /// Trajectory stop.
    pub fn stop(&self) -> f64 {
        self.stop
    }

    /// Trajectory step (signed).
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Trajectory mode.
    pub fn mode(&self) -> TrajectoryMode {
        self.mode
    }

    /// `count = floor(|stop - start| / |step|) + 1`.
    pub fn count(&self) -> u64 {
        let span = (self.stop - self.start).abs();
        ((span / self.step.abs()).floor() as u64) + 1
    }

    /// The setpoint at trajectory index `i` (forward direction), i.e.
    /// `start + i * step`.
    pub fn setpoint_at(&self, i: u64) -> f64 {
        self.start + (i as f64) * self.step
    }

    /// A trajectory with `start`/`stop` swapped and `step` negated — used
    /// by `flip_direction()`.
    pub fn flipped(&self) -> Self {
        Self {
            start: self.stop,
            stop: self.start,
            step: -self.step,
            mode: self.mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_step_is_config_error() {
        assert!(Trajectory::new(0.0, 1.0, 0.0, TrajectoryMode::OneShot).is_err());
    }

    #[test]
    fn inconsistent_sign_is_config_error() {
        assert!(Trajectory::new(0.0, 1.0, -0.1, TrajectoryMode::OneShot).is_err());
    }

    #[test]
    fn s1_count_is_eleven_for_0_to_1_step_0_1() {
        let t = Trajectory::new(0.0, 1.0, 0.1, TrajectoryMode::OneShot).unwrap();
        assert_eq!(t.count(), 11);
        for i in 0..t.count() {
            let expected = (i as f64) * 0.1;
            assert!((t.setpoint_at(i) - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn flipped_swaps_and_negates() {
        let t = Trajectory::new(0.0, 5.0, 0.5, TrajectoryMode::Bidirectional).unwrap();
        let f = t.flipped();
        assert_eq!(f.start(), 5.0);
        assert_eq!(f.stop(), 0.0);
        assert_eq!(f.step(), -0.5);
    }

    #[test]
    fn negative_direction_trajectory_is_valid() {
        let t = Trajectory::new(5.0, 0.0, -1.0, TrajectoryMode::OneShot).unwrap();
        assert_eq!(t.count(), 6);
    }

    proptest! {
        #[test]
        fn count_matches_formula(start in -100.0f64..100.0, step_mag in 0.01f64..10.0, n in 0u32..50) {
            let stop = start + step_mag * n as f64;
            let t = Trajectory::new(start, stop, step_mag, TrajectoryMode::OneShot).unwrap();
            let expected = (((stop - start).abs() / step_mag).floor() as u64) + 1;
            prop_assert_eq!(t.count(), expected);
        }
    }
}
