//! The persistence contract every storage backend implements: open a dataset, begin a measurement, append rows, and close.

use measureit_common::error::MeasureItError;
use measureit_sweep::{Metadata, SweepState};

/// A storage backend for sweep data. One instance corresponds
/// to one open dataset file/connection.
pub trait PersistenceFacade: Send {
    /// Begin a new measurement within the open dataset: write metadata and
    /// column headers.
    ///
    /// # Errors
    /// Returns [`MeasureItError::Persistence`] on I/O failure.
    fn begin_measurement(
        &mut self,
        metadata: &Metadata,
        controlled_names: &[String],
        followed_names: &[String],
    ) -> Result<(), MeasureItError>;

    /// Append one row of setpoints + followed values.
    ///
    /// # Errors
    /// Returns [`MeasureItError::Persistence`] on I/O failure.
    fn append(&mut self, setpoints: &[f64], followed: &[f64]) -> Result<(), MeasureItError>;

    /// Record the sweep's final state once it reaches a terminal state.
    ///
    /// # Errors
    /// Returns [`MeasureItError::Persistence`] on I/O failure.
    fn finish(&mut self, final_state: SweepState) -> Result<(), MeasureItError>;

    /// Flush and close the dataset. Idempotent.
    ///
    /// # Errors
    /// Returns [`MeasureItError::Persistence`] on I/O failure.
    fn close(&mut self) -> Result<(), MeasureItError>;
}
