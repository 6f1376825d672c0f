//! Error taxonomy shared across the MeasureIt workspace.
//!
//! Each crate's local error type wraps into [`MeasureItError`] at the
//! boundary where it crosses a thread or a queue/registry that needs a
//! uniform type to report on. Sweep-internal logic generally works with its
//! own narrower error types and converts only when handing the error to a
//! consumer that must treat all kinds uniformly (the Runner, the Queue).

use thiserror::Error;

/// What kind of parameter operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterErrorKind {
    /// A `get()` call failed (after one retry).
    Get,
    /// A `set()` call failed (no retry attempted).
    Set,
}

impl std::fmt::Display for ParameterErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterErrorKind::Get => write!(f, "get"),
            ParameterErrorKind::Set => write!(f, "set"),
        }
    }
}

/// The unified error taxonomy every crate in the workspace converts into.
#[derive(Debug, Error)]
pub enum MeasureItError {
    /// Invalid construction arguments: delays below minima, zero step,
    /// mismatched simultaneous-axis counts.
    #[error("configuration error: {0}")]
    Config(String),

    /// Instrument I/O failed: `get` after retry, or `set` immediately.
    #[error("could not {kind} parameter '{parameter}': {cause}")]
    Parameter {
        /// Which operation failed.
        kind: ParameterErrorKind,
        /// The parameter's stable name.
        parameter: String,
        /// The underlying instrument-reported cause.
        cause: String,
    },

    /// Ramp-to-start (or ramp-to-point) did not converge within tolerance.
    #[error("ramp did not converge: |actual - expected| exceeds tolerance ({tolerance})")]
    RampConvergence {
        /// The tolerance that was exceeded.
        tolerance: f64,
    },

    /// `start()` was blocked by an unrelated active sweep.
    #[error("another sweep is active")]
    Concurrency,

    /// Persistence context could not be opened, or a row could not be
    /// appended.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// A queue entry raised any of the above.
    #[error("queue error: {0}")]
    Queue(String),
}

impl MeasureItError {
    /// Build a [`MeasureItError::Parameter`] for a failed `set()`.
    pub fn set_failed(parameter: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        MeasureItError::Parameter {
            kind: ParameterErrorKind::Set,
            parameter: parameter.into(),
            cause: cause.to_string(),
        }
    }

    /// Build a [`MeasureItError::Parameter`] for a failed `get()`.
    pub fn get_failed(parameter: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        MeasureItError::Parameter {
            kind: ParameterErrorKind::Get,
            parameter: parameter.into(),
            cause: cause.to_string(),
        }
    }

    /// A human-readable message suitable for `ProgressState::error_message`.
    pub fn user_message(&self) -> String {
        match self {
            MeasureItError::Parameter { kind, parameter, .. } if *kind == ParameterErrorKind::Set => {
                format!("Could not set parameter '{parameter}'")
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_failed_message_contains_could_not_set() {
        let err = MeasureItError::set_failed("gate_voltage", "timeout");
        assert!(err.user_message().contains("Could not set"));
    }

    #[test]
    fn ramp_convergence_message_contains_tolerance() {
        let err = MeasureItError::RampConvergence { tolerance: 0.05 };
        assert!(err.to_string().contains("tolerance"));
    }
}
