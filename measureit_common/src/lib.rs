//! # MeasureIt Common
//!
//! Shared constants, configuration loading, error taxonomy, persistence-path
//! discovery, and logging setup used by every crate in the MeasureIt
//! workspace.
//!
//! # Module Structure
//!
//! - [`consts`] — timing minima and other workspace-wide constants
//! - [`config`] — TOML app configuration loading
//! - [`error`] — the `MeasureItError` taxonomy
//! - [`paths`] — persistence target selection
//! - [`logging`] — per-run log file + stderr tracing subscriber setup
//! - [`prelude`] — common re-exports

pub mod config;
pub mod consts;
pub mod error;
pub mod logging;
pub mod paths;
pub mod prelude;
