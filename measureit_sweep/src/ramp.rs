//! Ramp-to-start convergence check.
//!
//! Before RUNNING begins, every controlled parameter is driven toward its
//! trajectory's `start` and polled until it settles within `tolerance`, or
//! the attempt budget is exhausted and the sweep transitions to ERROR via
//! [`crate::state::SweepEvent::RampFailed`].
//!
//! Each poll advances the setpoint by at most [`RAMP_STEP_CAP_DEFAULT`]
//! rather than jumping straight to `target`, so a large excursion ramps in
//! bounded steps instead of slewing the instrument in one move. Polling is
//! paced by [`RAMP_POLL_INTERVAL_S`] and bounded by a wall-clock deadline of
//! [`RAMP_TIMEOUT_DEFAULT_S`], independent of the attempt-count cap.

use measureit_common::consts::{
    RAMP_POLL_ATTEMPTS, RAMP_POLL_INTERVAL_S, RAMP_STEP_CAP_DEFAULT, RAMP_TIMEOUT_DEFAULT_S,
    RAMP_TOLERANCE_FACTOR_DEFAULT,
};
use measureit_common::error::MeasureItError;
use measureit_parameter::{safe_get, safe_set, Parameter};
use std::thread;
use std::time::{Duration, Instant};

/// Drive `param` toward `target` in steps capped at [`RAMP_STEP_CAP_DEFAULT`],
/// polling between steps until it settles within `tolerance`. Retries up to
/// [`RAMP_POLL_ATTEMPTS`] times or until [`RAMP_TIMEOUT_DEFAULT_S`] elapses,
/// whichever comes first.
///
/// # Errors
/// - [`MeasureItError::Parameter`] if the underlying `set`/`get` fails.
/// - [`MeasureItError::RampConvergence`] if the parameter never settles
///   within `tolerance` before the attempt budget or timeout is exhausted.
pub fn ramp_to(param: &mut dyn Parameter, target: f64, tolerance: f64) -> Result<(), MeasureItError> {
    let deadline = Instant::now() + Duration::from_secs_f64(RAMP_TIMEOUT_DEFAULT_S);
    for _ in 0..RAMP_POLL_ATTEMPTS {
        let current = safe_get(param)?;
        if (current - target).abs() <= tolerance {
            return Ok(());
        }
        if Instant::now() >= deadline {
            break;
        }
        let delta = (target - current).clamp(-RAMP_STEP_CAP_DEFAULT, RAMP_STEP_CAP_DEFAULT);
        safe_set(param, current + delta)?;
        thread::sleep(Duration::from_secs_f64(RAMP_POLL_INTERVAL_S));
    }
    Err(MeasureItError::RampConvergence { tolerance })
}

/// Same as [`ramp_to`] but with the default tolerance, derived from the
/// trajectory's step size: `tolerance = |step| * RAMP_TOLERANCE_FACTOR_DEFAULT`.
pub fn ramp_to_default(param: &mut dyn Parameter, target: f64, step: f64) -> Result<(), MeasureItError> {
    ramp_to(param, target, step.abs() * RAMP_TOLERANCE_FACTOR_DEFAULT)
}
