//! `safe_get`/`safe_set`: retry and error classification.
//!
//! Neither call suspends cooperatively; both may block the caller thread
//! for arbitrary instrument-dependent time. `safe_get` retries once after a
//! fixed delay; `safe_set` never retries, since setting may have
//! side effects.

use crate::parameter::Parameter;
use measureit_common::error::MeasureItError;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// The delay `safe_get` waits before its single retry.
pub const GET_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Read `param`, retrying once after [`GET_RETRY_DELAY`] on failure.
///
/// # Errors
/// Returns [`MeasureItError::Parameter`] with
/// [`ParameterErrorKind::Get`](measureit_common::error::ParameterErrorKind::Get)
/// if both the initial attempt and the retry fail.
pub fn safe_get(param: &mut dyn Parameter) -> Result<f64, MeasureItError> {
    safe_get_with_delay(param, GET_RETRY_DELAY)
}

/// As [`safe_get`], but with an explicit retry delay — exposed for tests
/// that cannot afford the real one-second wait.
pub fn safe_get_with_delay(param: &mut dyn Parameter, delay: Duration) -> Result<f64, MeasureItError> {
    match param.get() {
        Ok(v) => Ok(v),
        Err(first_err) => {
            warn!(parameter = param.name(), error = %first_err, "get failed, retrying once");
            thread::sleep(delay);
            match param.get() {
                Ok(v) => {
                    debug!(parameter = param.name(), "get succeeded on retry");
                    Ok(v)
                }
                Err(second_err) => Err(MeasureItError::get_failed(param.name(), second_err)),
            }
        }
    }
}

/// Write `value` to `param`. Never retries.
///
/// # Errors
/// Returns [`MeasureItError::Parameter`] with
/// [`ParameterErrorKind::Set`](measureit_common::error::ParameterErrorKind::Set)
/// if the underlying `set` fails.
pub fn safe_set(param: &mut dyn Parameter, value: f64) -> Result<(), MeasureItError> {
    param
        .set(value)
        .map_err(|cause| MeasureItError::set_failed(param.name(), cause))
}
