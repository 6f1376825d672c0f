//! Wraps a one-axis sweep with a compliance/leakage guard: a monitored
//! parameter is checked after every step and the sweep is killed early if
//! it exceeds a limit.

use super::one_axis::OneAxisSweep;
use super::{StepOutcome, SweepKind};
use measureit_common::error::MeasureItError;
use measureit_parameter::{safe_get, Parameter};
use serde_json::json;

/// A one-axis sweep guarded by a leakage/compliance parameter. Tripping is
/// two-sided: each time the guard's magnitude exceeds `limit` after a step,
/// direction flips rather than ending the sweep outright; only after
/// `max_flips` trips does the sweep finish.
pub struct LeakageLimiterSweep {
    inner: OneAxisSweep,
    guard: Box<dyn Parameter>,
    limit: f64,
    tripped: bool,
    flips: u32,
    max_flips: u32,
}

impl LeakageLimiterSweep {
    /// Wrap `inner` with a `guard` parameter checked after each step
    /// against `limit` (absolute value). `max_flips` is clamped to at
    /// least 1.
    pub fn new(inner: OneAxisSweep, guard: Box<dyn Parameter>, limit: f64, max_flips: u32) -> Self {
        Self { inner, guard, limit, tripped: false, flips: 0, max_flips: max_flips.max(1) }
    }

    /// Whether the guard has tripped at least once during the most recent
    /// run.
    pub fn tripped(&self) -> bool {
        self.tripped
    }

    /// Number of trips recorded during the most recent run.
    pub fn flips(&self) -> u32 {
        self.flips
    }
}

impl SweepKind for LeakageLimiterSweep {
    fn kind_name(&self) -> &'static str {
        "leakage_limiter"
    }

    fn validate(&self) -> Result<(), MeasureItError> {
        self.inner.validate()?;
        if self.limit <= 0.0 {
            return Err(MeasureItError::Config("leakage limit must be positive".to_string()));
        }
        Ok(())
    }

    fn trajectory_count(&self) -> Option<u64> {
        self.inner.trajectory_count()
    }

    fn controlled_names(&self) -> Vec<String> {
        self.inner.controlled_names()
    }

    fn ramp_to_start(&mut self) -> Result<(), MeasureItError> {
        self.tripped = false;
        self.flips = 0;
        self.inner.ramp_to_start()
    }

    fn run_step(&mut self) -> Result<StepOutcome, MeasureItError> {
        let outcome = self.inner.run_step()?;
        let level = safe_get(self.guard.as_mut())?;
        if level.abs() > self.limit {
            self.tripped = true;
            self.flips += 1;
            if self.flips >= self.max_flips {
                return Ok(StepOutcome::EndOneShot);
            }
            self.inner.flip();
            return Ok(StepOutcome::EndBidirectional);
        }
        Ok(outcome)
    }

    fn current_setpoints(&self) -> Vec<f64> {
        self.inner.current_setpoints()
    }

    fn export_attributes(&self) -> serde_json::Value {
        json!({
            "limit": self.limit,
            "guard_identity": self.guard.identity(),
            "max_flips": self.max_flips,
            "inner": self.inner.export_attributes(),
        })
    }

    fn controlled_descriptor(&self) -> Option<serde_json::Value> {
        self.inner.controlled_descriptor()
    }
}
