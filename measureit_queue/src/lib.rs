//! # Queue
//!
//! An ordered sequence of sweeps (and interleaved callables/context
//! switches) run one at a time by a background supervisor.
//!
//! ## Module Structure
//!
//! - [`entry`] — `QueueEntry`: `Sweep` / `Callable` / `ContextSwitch`
//! - [`queue`] — `SweepQueue`, the supervisor loop

pub mod entry;
pub mod queue;

pub use entry::QueueEntry;
pub use queue::{EntryOutcome, QueueState, SweepQueue};
