//! `SweepState` transitions.
//!
//! Lifecycle: `READY → RAMPING_TO_START → RUNNING → {DONE, ERROR, KILLED}`,
//! with `PAUSED`/`STOPPING` as intermediate RUNNING-adjacent states.
//! `ERROR` and `KILLED` are terminal until `clear_error`/`reset`.

use serde::{Deserialize, Serialize};

/// The sweep lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SweepState {
    /// Constructed, not yet started. The only state from which `start` is legal.
    Ready,
    /// Ramping the controlled parameter to its trajectory start.
    RampingToStart,
    /// Actively stepping through the trajectory.
    Running,
    /// Stopped cooperatively, awaiting `resume`.
    Paused,
    /// `stop()` was called; draining the in-flight point before `Done`.
    Stopping,
    /// Terminal: trajectory exhausted or drained after `stop()`.
    Done,
    /// Terminal: a `ParameterError` or `RampConvergenceError` occurred.
    Error,
    /// Terminal: `kill()` was called.
    Killed,
}

impl SweepState {
    /// Terminal states require `clear_error`/`reset` to leave.
    pub fn is_terminal(self) -> bool {
        matches!(self, SweepState::Done | SweepState::Error | SweepState::Killed)
    }
}

/// Result of a [`SweepState`] transition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    /// Transition succeeded — new state.
    Ok(SweepState),
    /// Transition rejected — reason.
    Rejected(&'static str),
}

impl TransitionResult {
    /// Whether the transition succeeded.
    pub fn is_ok(&self) -> bool {
        matches!(self, TransitionResult::Ok(_))
    }
}

/// Event that can trigger a [`SweepState`] transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepEvent {
    /// `start()` was called from READY.
    Start,
    /// Ramp-to-start converged within tolerance.
    RampConverged,
    /// Ramp-to-start did not converge, or a parameter error occurred while ramping.
    RampFailed,
    /// A one-shot trajectory reached its end.
    TrajectoryEndOneShot,
    /// A bidirectional trajectory reached its end; flips and keeps running.
    TrajectoryEndBidirectional,
    /// A continual trajectory reached its end; wraps and keeps running.
    TrajectoryEndContinual,
    /// `stop()` was called while RUNNING.
    Stop,
    /// The in-flight point finished draining after `stop()`.
    Drained,
    /// `kill()` was called.
    Kill,
    /// `resume()` was called from PAUSED.
    Resume,
    /// A `ParameterError` was raised mid-run.
    ParameterFault,
    /// `clear_error()`/`reset()` was called from a terminal state.
    ClearError,
}

/// Holds the current [`SweepState`] and applies the transition table.
#[derive(Debug, Clone)]
pub struct SweepStateMachine {
    state: SweepState,
}

impl Default for SweepStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SweepStateMachine {
    /// Create a new state machine in READY.
    pub const fn new() -> Self {
        Self { state: SweepState::Ready }
    }

    /// Current state.
    #[inline]
    pub const fn state(&self) -> SweepState {
        self.state
    }

    /// Attempt a transition given an event.
    pub fn handle_event(&mut self, event: SweepEvent) -> TransitionResult {
        use SweepEvent::*;
        use SweepState::*;

        let next = match (self.state, event) {
            (Ready, Start) => RampingToStart,
            (RampingToStart, RampConverged) => Running,
            (RampingToStart, RampFailed) => Error,

            (Running, TrajectoryEndOneShot) => Done,
            (Running, TrajectoryEndBidirectional) => Running,
            (Running, TrajectoryEndContinual) => Running,
            (Running, Stop) => Stopping,
            (Running, Kill) => Killed,
            (Running, ParameterFault) => Error,

            (Stopping, Drained) => Done,
            (Stopping, Kill) => Killed,

            (Paused, Resume) => Running,
            (Paused, Kill) => Killed,
            (Paused, Stop) => Done,

            // Pausing is driven by the Runner honoring a control-channel
            // command between points, not by sweep progress, so it is
            // applied directly via `force_pause` rather than through this
            // event table.
            (Done, ClearError) | (Error, ClearError) | (Killed, ClearError) => Ready,

            _ => return TransitionResult::Rejected(invalid_transition_reason(self.state, event)),
        };

        self.state = next;
        TransitionResult::Ok(next)
    }

    /// Force a transition to PAUSED. Legal only from RUNNING; mirrors the
    /// Runner's control-channel `Pause` handling, which does not fit the
    /// event-table shape cleanly because pausing is not driven by sweep
    /// progress but by an external command honored between points.
    pub fn force_pause(&mut self) -> TransitionResult {
        if self.state == SweepState::Running {
            self.state = SweepState::Paused;
            TransitionResult::Ok(SweepState::Paused)
        } else {
            TransitionResult::Rejected("Pause only legal while RUNNING")
        }
    }

    /// Force the state to ERROR (e.g. from a Runner-side fault that has no
    /// natural event mapping).
    pub fn force_error(&mut self) {
        self.state = SweepState::Error;
    }
}

fn invalid_transition_reason(state: SweepState, event: SweepEvent) -> &'static str {
    use SweepEvent::*;
    use SweepState::*;
    match (state, event) {
        (s, Start) if s != Ready => "start() is only legal from READY",
        (Done, _) | (Error, _) | (Killed, _) => "terminal state: only clear_error/reset allowed",
        (Ready, _) => "READY: only start() allowed",
        (RampingToStart, _) => "RAMPING_TO_START: only ramp outcome events allowed",
        (Paused, _) => "PAUSED: only resume/stop/kill allowed",
        (Stopping, _) => "STOPPING: only drained/kill allowed",
        (Running, _) => "RUNNING: invalid event for current state",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SweepEvent::*;
    use SweepState::*;

    #[test]
    fn initial_state_is_ready() {
        assert_eq!(SweepStateMachine::new().state(), Ready);
    }

    #[test]
    fn normal_one_shot_run() {
        let mut sm = SweepStateMachine::new();
        assert_eq!(sm.handle_event(Start), TransitionResult::Ok(RampingToStart));
        assert_eq!(sm.handle_event(RampConverged), TransitionResult::Ok(Running));
        assert_eq!(sm.handle_event(TrajectoryEndOneShot), TransitionResult::Ok(Done));
    }

    #[test]
    fn bidirectional_keeps_running_across_flips() {
        let mut sm = SweepStateMachine::new();
        sm.handle_event(Start);
        sm.handle_event(RampConverged);
        assert_eq!(sm.handle_event(TrajectoryEndBidirectional), TransitionResult::Ok(Running));
        assert_eq!(sm.handle_event(TrajectoryEndBidirectional), TransitionResult::Ok(Running));
    }

    #[test]
    fn ramp_failure_to_error() {
        let mut sm = SweepStateMachine::new();
        sm.handle_event(Start);
        assert_eq!(sm.handle_event(RampFailed), TransitionResult::Ok(Error));
    }

    #[test]
    fn stop_drains_then_done() {
        let mut sm = SweepStateMachine::new();
        sm.handle_event(Start);
        sm.handle_event(RampConverged);
        assert_eq!(sm.handle_event(Stop), TransitionResult::Ok(Stopping));
        assert_eq!(sm.handle_event(Drained), TransitionResult::Ok(Done));
    }

    #[test]
    fn kill_from_running_is_immediate() {
        let mut sm = SweepStateMachine::new();
        sm.handle_event(Start);
        sm.handle_event(RampConverged);
        assert_eq!(sm.handle_event(Kill), TransitionResult::Ok(Killed));
    }

    #[test]
    fn kill_after_stop_keeps_first_terminal_semantics_at_caller() {
        // The state machine itself allows Stopping -> Killed; "final state
        // is whichever terminal was reached first" is a Runner-level
        // guarantee built from checking `is_terminal()` before transitioning.
        let mut sm = SweepStateMachine::new();
        sm.handle_event(Start);
        sm.handle_event(RampConverged);
        sm.handle_event(Stop);
        assert!(matches!(sm.handle_event(Kill), TransitionResult::Ok(Killed)));
    }

    #[test]
    fn parameter_fault_to_error() {
        let mut sm = SweepStateMachine::new();
        sm.handle_event(Start);
        sm.handle_event(RampConverged);
        assert_eq!(sm.handle_event(ParameterFault), TransitionResult::Ok(Error));
    }

    #[test]
    fn clear_error_resets_to_ready_from_any_terminal() {
        for terminal in [Done, Error, Killed] {
            let mut sm = SweepStateMachine { state: terminal };
            assert_eq!(sm.handle_event(ClearError), TransitionResult::Ok(Ready));
        }
    }

    #[test]
    fn start_only_legal_from_ready() {
        let mut sm = SweepStateMachine { state: Running };
        assert!(matches!(sm.handle_event(Start), TransitionResult::Rejected(_)));
    }

    #[test]
    fn terminal_states_reject_other_events() {
        let mut sm = SweepStateMachine { state: Error };
        assert!(matches!(sm.handle_event(Start), TransitionResult::Rejected(_)));
        assert!(matches!(sm.handle_event(Stop), TransitionResult::Rejected(_)));
    }

    #[test]
    fn pause_only_from_running() {
        let mut sm = SweepStateMachine { state: Ready };
        assert!(matches!(sm.force_pause(), TransitionResult::Rejected(_)));
        let mut sm = SweepStateMachine { state: Running };
        assert_eq!(sm.force_pause(), TransitionResult::Ok(Paused));
    }

    #[test]
    fn resume_from_paused() {
        let mut sm = SweepStateMachine { state: Paused };
        assert_eq!(sm.handle_event(Resume), TransitionResult::Ok(Running));
    }

    #[test]
    fn is_terminal_classifies_correctly() {
        assert!(Done.is_terminal());
        assert!(Error.is_terminal());
        assert!(Killed.is_terminal());
        assert!(!Ready.is_terminal());
        assert!(!Running.is_terminal());
        assert!(!Paused.is_terminal());
        assert!(!Stopping.is_terminal());
        assert!(!RampingToStart.is_terminal());
    }
}
