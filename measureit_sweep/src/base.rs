//! `SweepCore`: the pure, thread-agnostic sweep object.
//!
//! Owning and driving a background thread is the Runner's job
//! (`measureit_runtime::ManagedSweep`); this crate only models what a step
//! does and what state it leaves behind.

use crate::followset::FollowSet;
use crate::ids::Ancestry;
use crate::kinds::{StepOutcome, SweepKind};
use crate::metadata::{followed_map, Metadata};
use crate::progress::{Direction, ProgressState};
use crate::row::Row;
use crate::state::SweepEvent;
use measureit_common::error::MeasureItError;

/// The pure sweep object: kind + follow set + progress, with no thread of
/// its own.
pub struct SweepCore {
    ancestry: Ancestry,
    kind: Box<dyn SweepKind>,
    follow: FollowSet,
    progress: ProgressState,
}

impl SweepCore {
    /// Construct a standalone (non-composed) sweep.
    ///
    /// # Errors
    /// Returns whatever [`SweepKind::validate`] returns.
    pub fn new(kind: Box<dyn SweepKind>, follow: FollowSet) -> Result<Self, MeasureItError> {
        kind.validate()?;
        let total_points = kind.trajectory_count();
        let controlled_count = kind.controlled_names().len();
        Ok(Self {
            ancestry: Ancestry::standalone(),
            kind,
            follow,
            progress: ProgressState::new(total_points, controlled_count),
        })
    }

    /// Construct a sweep nested under `parent`'s ancestry.
    pub fn new_nested(
        kind: Box<dyn SweepKind>,
        follow: FollowSet,
        parent: &SweepCore,
    ) -> Result<Self, MeasureItError> {
        kind.validate()?;
        let total_points = kind.trajectory_count();
        let controlled_count = kind.controlled_names().len();
        Ok(Self {
            ancestry: Ancestry::nested_under(parent.ancestry),
            kind,
            follow,
            progress: ProgressState::new(total_points, controlled_count),
        })
    }

    /// This sweep's ancestry (own id + tree root id).
    pub fn ancestry(&self) -> Ancestry {
        self.ancestry
    }

    /// Names of controlled parameter(s), in declared order.
    pub fn controlled_names(&self) -> Vec<String> {
        self.kind.controlled_names()
    }

    /// Names of follow parameter(s), in declared order.
    pub fn followed_names(&self) -> Vec<String> {
        self.follow.names()
    }

    /// A cheaply-clonable handle to this sweep's progress, for readers on
    /// other threads.
    pub fn progress(&self) -> ProgressState {
        self.progress.clone()
    }

    /// `start()`: READY -> RAMPING_TO_START -> RUNNING, or -> ERROR on
    /// non-convergence.
    ///
    /// # Errors
    /// Returns [`MeasureItError::Config`] if called outside READY, or the
    /// ramp error on non-convergence.
    pub fn start(&mut self) -> Result<(), MeasureItError> {
        if !self.progress.handle_event(SweepEvent::Start).is_ok() {
            return Err(MeasureItError::Config("start() is only legal from READY".to_string()));
        }
        match self.kind.ramp_to_start() {
            Ok(()) => {
                self.progress.handle_event(SweepEvent::RampConverged);
                Ok(())
            }
            Err(err) => {
                self.progress.handle_event(SweepEvent::RampFailed);
                self.progress.mark_error(err.user_message());
                Err(err)
            }
        }
    }

    /// Advance one step: write the next setpoint(s), sample the follow set,
    /// and update progress. Returns the emitted [`Row`] and what happened
    /// to the trajectory.
    ///
    /// # Errors
    /// Returns [`MeasureItError::Parameter`] on instrument failure, which
    /// also transitions the sweep to ERROR.
    pub fn step(&mut self) -> Result<(StepOutcome, Row), MeasureItError> {
        let outcome = match self.kind.run_step() {
            Ok(outcome) => outcome,
            Err(err) => {
                self.progress.handle_event(SweepEvent::ParameterFault);
                self.progress.mark_error(err.user_message());
                return Err(err);
            }
        };

        let followed = match self.follow.sample() {
            Ok(values) => values,
            Err(err) => {
                self.progress.handle_event(SweepEvent::ParameterFault);
                self.progress.mark_error(err.user_message());
                return Err(err);
            }
        };

        let setpoints = self.kind.current_setpoints();
        let index = self.progress.snapshot().points_emitted;
        self.progress.record_point(setpoints.clone());

        match outcome {
            StepOutcome::More | StepOutcome::LineBreak => {}
            StepOutcome::EndOneShot => {
                self.progress.handle_event(SweepEvent::TrajectoryEndOneShot);
            }
            StepOutcome::EndBidirectional => {
                self.kind.on_flip();
                self.progress.flip_direction();
                self.progress.handle_event(SweepEvent::TrajectoryEndBidirectional);
            }
            StepOutcome::EndContinual => {
                self.progress.handle_event(SweepEvent::TrajectoryEndContinual);
            }
        }

        Ok((outcome, Row { index, setpoints, followed, is_break: false }))
    }

    /// Current direction.
    pub fn direction(&self) -> Direction {
        self.progress.snapshot().direction
    }

    /// `stop()`: RUNNING -> STOPPING (drains in-flight point) or PAUSED ->
    /// DONE directly.
    pub fn request_stop(&self) {
        self.progress.handle_event(SweepEvent::Stop);
    }

    /// Mark the in-flight point drained after a stop request.
    pub fn mark_drained(&self) {
        self.progress.handle_event(SweepEvent::Drained);
    }

    /// `kill()`: any non-terminal state -> KILLED immediately.
    pub fn kill(&self) {
        self.progress.handle_event(SweepEvent::Kill);
    }

    /// `pause()`: RUNNING -> PAUSED, honored by the Runner between steps.
    pub fn pause(&self) {
        self.progress.force_pause();
    }

    /// `resume()`: PAUSED -> RUNNING. Gives the kind a chance to act on a
    /// restart-from-start option (see [`SweepKind::on_resume`]) before the
    /// state transition is applied.
    pub fn resume(&mut self) {
        self.kind.on_resume();
        self.progress.handle_event(SweepEvent::Resume);
    }

    /// `clear_error()`/`reset()`: any terminal state -> READY.
    pub fn clear_error(&self) {
        self.progress.clear_error();
    }

    /// Build the self-describing metadata record for this sweep.
    pub fn export_metadata(&self) -> Metadata {
        Metadata {
            kind: self.kind.kind_name().to_string(),
            module: "measureit_sweep".to_string(),
            attributes: self.kind.export_attributes(),
            controlled: self.kind.controlled_descriptor(),
            followed: followed_map(&self.follow.names(), &self.follow.identities()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::one_axis::OneAxisSweep;
    use crate::kinds::simultaneous::SimultaneousSweep;
    use crate::kinds::time_only::TimeOnlySweep;
    use crate::progress::Direction;
    use crate::state::SweepState;
    use crate::trajectory::{Trajectory, TrajectoryMode};
    use measureit_parameter::{Parameter, SimulatedParameter};

    fn one_axis_core() -> SweepCore {
        let traj = Trajectory::new(0.0, 1.0, 0.5, TrajectoryMode::OneShot).unwrap();
        let kind = OneAxisSweep::new(Box::new(SimulatedParameter::new("gate", "V", 0.0)), traj, 0.0, false);
        SweepCore::new(Box::new(kind), FollowSet::new()).unwrap()
    }

    #[test]
    fn full_one_shot_lifecycle_reaches_done() {
        let mut core = one_axis_core();
        core.start().unwrap();
        assert_eq!(core.progress().state(), SweepState::Running);
        let (o1, row1) = core.step().unwrap();
        assert_eq!(o1, StepOutcome::More);
        assert_eq!(row1.index, 0);
        core.step().unwrap();
        let (o3, _) = core.step().unwrap();
        assert_eq!(o3, StepOutcome::EndOneShot);
        assert_eq!(core.progress().state(), SweepState::Done);
    }

    #[test]
    fn nested_sweep_shares_root_with_parent() {
        let parent = one_axis_core();
        let child_kind = TimeOnlySweep::new(0.1, None);
        let child = SweepCore::new_nested(Box::new(child_kind), FollowSet::new(), &parent).unwrap();
        assert!(child.ancestry().related_to(parent.ancestry()));
    }

    #[test]
    fn export_metadata_reports_kind_and_controlled() {
        let core = one_axis_core();
        let meta = core.export_metadata();
        assert_eq!(meta.kind, "one_axis");
        assert!(meta.controlled.is_some());
    }

    #[test]
    fn kill_is_immediate_from_running() {
        let mut core = one_axis_core();
        core.start().unwrap();
        core.kill();
        assert_eq!(core.progress().state(), SweepState::Killed);
    }

    #[test]
    #[ignore = "exercises the full ramp-to-start wall-clock timeout (~30s)"]
    fn start_enters_error_when_ramp_never_converges() {
        let traj = Trajectory::new(0.0, 1.0, 0.5, TrajectoryMode::OneShot).unwrap();
        let mut param = SimulatedParameter::new("gate", "V", 0.0);
        param.jam_get_at(100.0);
        let kind = OneAxisSweep::new(Box::new(param), traj, 0.0, false);
        let mut core = SweepCore::new(Box::new(kind), FollowSet::new()).unwrap();

        let err = core.start().unwrap_err();
        assert!(matches!(err, MeasureItError::RampConvergence { .. }));
        let snap = core.progress().snapshot();
        assert_eq!(snap.state, SweepState::Error);
        assert!(snap.error_message.as_deref().unwrap_or("").contains("tolerance"));
    }

    #[test]
    fn bidirectional_simultaneous_sweep_runs_forward_then_back_with_direction_flip() {
        let axes: Vec<(Box<dyn Parameter>, Trajectory)> = vec![
            (
                Box::new(SimulatedParameter::new("a", "V", 0.0)),
                Trajectory::new(0.0, 5.0, 0.5, TrajectoryMode::Bidirectional).unwrap(),
            ),
            (
                Box::new(SimulatedParameter::new("b", "V", 0.0)),
                Trajectory::new(0.0, 10.0, 1.0, TrajectoryMode::Bidirectional).unwrap(),
            ),
        ];
        let kind = SimultaneousSweep::new(axes, 0.0).unwrap();
        let mut core = SweepCore::new(Box::new(kind), FollowSet::new()).unwrap();
        core.start().unwrap();
        assert_eq!(core.direction(), Direction::Forward);

        let mut outcomes = Vec::new();
        for _ in 0..11 {
            let (o, _) = core.step().unwrap();
            outcomes.push(o);
        }
        assert!(outcomes[..10].iter().all(|o| *o == StepOutcome::More));
        assert_eq!(outcomes[10], StepOutcome::EndBidirectional);
        assert_eq!(core.direction(), Direction::Reverse);

        for _ in 0..11 {
            core.step().unwrap();
        }
        assert_eq!(core.direction(), Direction::Forward);
    }
}
