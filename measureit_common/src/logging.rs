//! Per-run log file + stderr tracing subscriber setup.
//!
//! Sweep logs are emitted to a per-run file `sweeps_<YYYYMMDD_HHMMSS>.log`
//! under the persistence root's `logs/` directory, capturing info/warning/
//! error at sweep-state transitions, in addition to the usual stderr
//! output.

use crate::config::LogLevel;
use crate::paths::PersistenceRoot;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber with both a stderr layer and a
/// per-run log file layer.
///
/// Returns the path of the log file that was created.
pub fn init(root: &PersistenceRoot, level: LogLevel) -> io::Result<PathBuf> {
    let logs_dir = root.logs_dir()?;
    let file_name = format!("sweeps_{}.log", chrono::Local::now().format("%Y%m%d_%H%M%S"));
    let log_path = logs_dir.join(&file_name);
    let file = File::create(&log_path)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr.and(file))
        .with_target(false)
        .init();

    Ok(log_path)
}
