//! # Sweep
//!
//! The sweep state machine, trajectories, sweep kinds, and the pure
//! `SweepCore` object.
//!
//! ## Module Structure
//!
//! - [`state`] — `SweepState`/`SweepEvent`/`SweepStateMachine`
//! - [`progress`] — thread-safe `ProgressState` shared with readers
//! - [`trajectory`] — setpoint trajectories and their modes
//! - [`followset`] — the follow-parameter list sampled after each step
//! - [`ramp`] — ramp-to-start convergence
//! - [`ids`] — sweep identity and composed-tree relatedness
//! - [`row`] — the emitted data unit and the `RowSink` consumer trait
//! - [`metadata`] — self-describing JSON export/import
//! - [`kinds`] — the `SweepKind` capability trait and its implementations
//! - [`base`] — `SweepCore`, which ties all of the above together

pub mod base;
pub mod followset;
pub mod ids;
pub mod kinds;
pub mod metadata;
pub mod progress;
pub mod ramp;
pub mod row;
pub mod state;
pub mod trajectory;

pub use base::SweepCore;
pub use followset::FollowSet;
pub use ids::{Ancestry, SweepId};
pub use kinds::{StepOutcome, SweepKind};
pub use metadata::{Metadata, Station};
pub use progress::{Direction, ProgressSnapshot, ProgressState};
pub use row::{Row, RowSink};
pub use state::{SweepEvent, SweepState, SweepStateMachine, TransitionResult};
pub use trajectory::{Trajectory, TrajectoryMode};
