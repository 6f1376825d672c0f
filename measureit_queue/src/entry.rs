//! Ordered queue entries.

use measureit_sweep::SweepCore;

/// One item in a [`crate::queue::SweepQueue`].
pub enum QueueEntry {
    /// A sweep to run to completion. `experiment` names its dataset file;
    /// `None` persists it under whatever experiment name the most recent
    /// `ContextSwitch` set (or `"default"` if none has run yet).
    Sweep {
        /// The sweep to run.
        core: SweepCore,
        /// Explicit experiment name override.
        experiment: Option<String>,
    },
    /// An arbitrary callback run synchronously between sweeps (e.g. an
    /// instrument reconfiguration step with no data of its own).
    Callable(Box<dyn FnOnce() + Send>),
    /// Switches the experiment name subsequent `Sweep` entries are
    /// persisted under, without running anything.
    ContextSwitch(String),
}

impl std::fmt::Debug for QueueEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueEntry::Sweep { experiment, .. } => {
                f.debug_struct("Sweep").field("experiment", &experiment.as_deref().unwrap_or("<context>")).finish()
            }
            QueueEntry::Callable(_) => write!(f, "Callable(..)"),
            QueueEntry::ContextSwitch(name) => write!(f, "ContextSwitch({name})"),
        }
    }
}
