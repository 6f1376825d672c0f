//! The unit of data a sweep emits: one row per step.

/// One emitted data row: controlled setpoint(s) followed by sampled
/// follow-parameter value(s), in declared order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Monotonically increasing index within this sweep's run.
    pub index: u64,
    /// Controlled parameter setpoint(s), in declared order. Empty for
    /// kinds with no controlled parameter (time-only, listening) or for a
    /// break marker.
    pub setpoints: Vec<f64>,
    /// Sampled follow-parameter value(s), in declared order. Empty for a
    /// break marker.
    pub followed: Vec<f64>,
    /// Whether this is a direction-change or line-boundary marker rather
    /// than a real data point. Consumers render it as a gap; persistence
    /// skips it entirely, so it never counts toward a stored row index.
    pub is_break: bool,
}

impl Row {
    /// A break marker: signals a direction change (bidirectional flip) or
    /// a line boundary (two-axis outer step) in the emitted stream.
    pub fn break_marker(index: u64) -> Self {
        Self { index, setpoints: Vec::new(), followed: Vec::new(), is_break: true }
    }
}

/// A consumer of [`Row`]s as a sweep runs — implemented by the persistence
/// façade and by plot sinks. Defined here rather than in
/// the persistence crate so that crate can depend on this one without a
/// cycle.
pub trait RowSink: Send {
    /// Called once when the sweep transitions to RUNNING, before the first
    /// row.
    fn on_start(&mut self, controlled_names: &[String], followed_names: &[String]);

    /// Called for every emitted row, in order.
    fn on_row(&mut self, row: &Row);

    /// Called once when the sweep reaches a terminal state.
    fn on_finish(&mut self, final_state: crate::state::SweepState);
}
