//! Sweep kinds: the capability trait and its seven implementations.

pub mod leakage_limiter;
pub mod listening;
pub mod magnet_coupled;
pub mod one_axis;
pub mod simultaneous;
pub mod time_only;
pub mod two_axis;

use measureit_common::error::MeasureItError;
use serde_json::Value;

/// What happened on the most recent [`SweepKind::run_step`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// More points remain; caller keeps stepping.
    More,
    /// A one-shot trajectory reached its end: the sweep finishes.
    EndOneShot,
    /// A bidirectional trajectory reached its end: direction flips, sweep
    /// keeps running.
    EndBidirectional,
    /// A continual trajectory reached its end: wraps to the start, sweep
    /// keeps running.
    EndContinual,
    /// An inner pass completed and the outer axis advanced (composed
    /// kinds only): sweep keeps running, a line-break marker is due.
    LineBreak,
}

/// The behavior every sweep kind must provide.
pub trait SweepKind: Send {
    /// The metadata `kind` discriminator, e.g. `"one_axis"`.
    fn kind_name(&self) -> &'static str;

    /// Validate construction-time invariants (delays, trajectory shape).
    ///
    /// # Errors
    /// Returns [`MeasureItError::Config`] describing the first violation.
    fn validate(&self) -> Result<(), MeasureItError>;

    /// Total point count if the trajectory is finite and one-shot;
    /// `None` for unbounded kinds (time-only, listening, bidirectional,
    /// continual).
    fn trajectory_count(&self) -> Option<u64>;

    /// Names of the parameter(s) this kind controls, in declared order.
    /// Empty for kinds with no controlled parameter (time-only, listening).
    fn controlled_names(&self) -> Vec<String>;

    /// Ramp every controlled parameter to its trajectory start.
    ///
    /// # Errors
    /// Returns [`MeasureItError::RampConvergence`] or
    /// [`MeasureItError::Parameter`] on failure.
    fn ramp_to_start(&mut self) -> Result<(), MeasureItError>;

    /// Advance one step: write the next setpoint(s) and settle.
    ///
    /// # Errors
    /// Returns [`MeasureItError::Parameter`] if the underlying `set`/`get`
    /// fails.
    fn run_step(&mut self) -> Result<StepOutcome, MeasureItError>;

    /// Current setpoint(s) of the controlled parameter(s), in declared
    /// order, valid after `run_step`/`ramp_to_start`.
    fn current_setpoints(&self) -> Vec<f64>;

    /// Called by the Runner when direction flips (bidirectional wrap);
    /// default no-op, overridden by kinds that track extra flip-dependent
    /// state (e.g. two-axis, which re-homes its inner axis).
    fn on_flip(&mut self) {}

    /// Called by the Runner when `resume()` is invoked from PAUSED; default
    /// no-op, overridden by kinds with a restart-from-start option (e.g.
    /// one-axis) to reset their position before the next step.
    fn on_resume(&mut self) {}

    /// Kind-specific attributes for metadata export.
    fn export_attributes(&self) -> Value;

    /// Controlled-parameter descriptor for metadata export; `None` for
    /// kinds with no controlled parameter.
    fn controlled_descriptor(&self) -> Option<Value>;
}
