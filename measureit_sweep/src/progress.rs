//! `ProgressState`: mutated only by the Runner, read by supervisors.
//!
//! The `(state, error_message, error_count)` triple is updated under a
//! single `parking_lot::Mutex` critical section so readers never observe
//! `ERROR` without a message.

use crate::state::{SweepEvent, SweepState, SweepStateMachine, TransitionResult};
use parking_lot::Mutex;
use std::sync::Arc;

/// A snapshot of sweep progress, cheap to clone for reporting.
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    /// Current lifecycle state.
    pub state: SweepState,
    /// Points emitted so far.
    pub points_emitted: u64,
    /// Total points expected, if the trajectory is finite and one-shot.
    pub total_points: Option<u64>,
    /// Most recent setpoint(s) of the controlled parameter(s).
    pub current_setpoints: Vec<f64>,
    /// Current sweep direction.
    pub direction: Direction,
    /// First error message, if any.
    pub error_message: Option<String>,
    /// Number of `mark_error` calls observed (monotonic).
    pub error_count: u64,
}

/// Sweep direction along its trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Forward, i.e. `sign(step)` as declared.
    Forward,
    /// Reverse of the declared direction.
    Reverse,
}

impl Direction {
    /// Flip to the opposite direction.
    pub fn flipped(self) -> Self {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }
}

struct Inner {
    machine: SweepStateMachine,
    points_emitted: u64,
    total_points: Option<u64>,
    current_setpoints: Vec<f64>,
    direction: Direction,
    error_message: Option<String>,
    error_count: u64,
}

/// Thread-safe progress tracker shared between the Runner (writer) and
/// supervisors (readers).
#[derive(Clone)]
pub struct ProgressState {
    inner: Arc<Mutex<Inner>>,
}

impl ProgressState {
    /// Create a fresh tracker in READY with the given total point count
    /// (`None` for unbounded sweeps, e.g. time-only or listening).
    pub fn new(total_points: Option<u64>, controlled_count: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                machine: SweepStateMachine::new(),
                points_emitted: 0,
                total_points,
                current_setpoints: vec![0.0; controlled_count],
                direction: Direction::Forward,
                error_message: None,
                error_count: 0,
            })),
        }
    }

    /// Current state.
    pub fn state(&self) -> SweepState {
        self.inner.lock().machine.state()
    }

    /// A full snapshot, useful for `progress()` calls from user code.
    pub fn snapshot(&self) -> ProgressSnapshot {
        let g = self.inner.lock();
        ProgressSnapshot {
            state: g.machine.state(),
            points_emitted: g.points_emitted,
            total_points: g.total_points,
            current_setpoints: g.current_setpoints.clone(),
            direction: g.direction,
            error_message: g.error_message.clone(),
            error_count: g.error_count,
        }
    }

    /// Apply a state-machine event under the single critical section.
    pub fn handle_event(&self, event: SweepEvent) -> TransitionResult {
        self.inner.lock().machine.handle_event(event)
    }

    /// Force-pause (see [`SweepStateMachine::force_pause`]).
    pub fn force_pause(&self) -> TransitionResult {
        self.inner.lock().machine.force_pause()
    }

    /// Record a point: bump the counter and update the last setpoints.
    pub fn record_point(&self, setpoints: Vec<f64>) {
        let mut g = self.inner.lock();
        g.points_emitted += 1;
        g.current_setpoints = setpoints;
    }

    /// Overwrite the current direction.
    pub fn set_direction(&self, direction: Direction) {
        self.inner.lock().direction = direction;
    }

    /// Flip the current direction, returning the new value.
    pub fn flip_direction(&self) -> Direction {
        let mut g = self.inner.lock();
        g.direction = g.direction.flipped();
        g.direction
    }

    /// Idempotent error marking: the first message wins; later
    /// calls only bump `error_count`. Also transitions the state machine
    /// to ERROR if it is not already terminal.
    pub fn mark_error(&self, message: impl Into<String>) {
        let mut g = self.inner.lock();
        if g.error_message.is_none() {
            g.error_message = Some(message.into());
        }
        g.error_count += 1;
        if !g.machine.state().is_terminal() {
            g.machine.force_error();
        }
    }

    /// Reset to READY, clearing the error triple.
    pub fn clear_error(&self) {
        let mut g = self.inner.lock();
        let _ = g.machine.handle_event(SweepEvent::ClearError);
        g.error_message = None;
        g.error_count = 0;
        g.points_emitted = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_error_keeps_first_message_bumps_count() {
        let p = ProgressState::new(Some(10), 1);
        p.mark_error("first");
        p.mark_error("second");
        let snap = p.snapshot();
        assert_eq!(snap.error_message.as_deref(), Some("first"));
        assert_eq!(snap.error_count, 2);
        assert_eq!(snap.state, SweepState::Error);
    }

    #[test]
    fn clear_error_resets_triple() {
        let p = ProgressState::new(Some(10), 1);
        p.mark_error("boom");
        p.clear_error();
        let snap = p.snapshot();
        assert!(snap.error_message.is_none());
        assert_eq!(snap.error_count, 0);
        assert_eq!(snap.state, SweepState::Ready);
    }

    #[test]
    fn record_point_updates_setpoints_and_counter() {
        let p = ProgressState::new(Some(3), 2);
        p.record_point(vec![1.0, 2.0]);
        let snap = p.snapshot();
        assert_eq!(snap.points_emitted, 1);
        assert_eq!(snap.current_setpoints, vec![1.0, 2.0]);
    }

    #[test]
    fn flip_direction_toggles() {
        let p = ProgressState::new(None, 1);
        assert_eq!(p.flip_direction(), Direction::Reverse);
        assert_eq!(p.flip_direction(), Direction::Forward);
    }

    #[test]
    fn readers_never_see_error_without_message() {
        let p = ProgressState::new(None, 1);
        p.mark_error("boom");
        let snap = p.snapshot();
        if snap.state == SweepState::Error {
            assert!(snap.error_message.is_some());
        }
    }
}
