//! The global active-sweep registry enforcing the engine-wide exclusivity
//! rule: at most one *unrelated* sweep may be active at a time.
//!
//! Related sweeps (same composed-tree root, see [`measureit_sweep::Ancestry`])
//! are exempt, since a two-axis sweep's inner axis and a leakage-limiter's
//! guard checks are themselves tracked as related sweeps of the same run.

use crate::channel::DataSender;
use crate::managed::ManagedSweep;
use measureit_common::error::MeasureItError;
use measureit_sweep::{Ancestry, ProgressState};
use parking_lot::Mutex;
use std::sync::OnceLock;

struct Entry {
    ancestry: Ancestry,
    progress: ProgressState,
}

static REGISTRY: OnceLock<Mutex<Vec<Entry>>> = OnceLock::new();

fn registry() -> &'static Mutex<Vec<Entry>> {
    REGISTRY.get_or_init(|| Mutex::new(Vec::new()))
}

fn prune_terminal(entries: &mut Vec<Entry>) {
    entries.retain(|e| !e.progress.state().is_terminal());
}

/// Attempt to start `managed`, failing with [`MeasureItError::Concurrency`]
/// if an unrelated sweep is currently active.
///
/// # Errors
/// - [`MeasureItError::Concurrency`] if blocked by an unrelated active sweep.
/// - Whatever [`ManagedSweep::start`] returns (e.g. already started).
pub fn start(managed: &mut ManagedSweep, data_txs: Vec<DataSender>) -> Result<(), MeasureItError> {
    let mut entries = registry().lock();
    prune_terminal(&mut entries);
    if entries.iter().any(|e| !e.ancestry.related_to(managed.ancestry())) {
        return Err(MeasureItError::Concurrency);
    }
    entries.push(Entry { ancestry: managed.ancestry(), progress: managed.progress() });
    drop(entries);
    managed.start(data_txs)
}

/// Start `managed` unconditionally, bypassing the exclusivity check. The
/// caller is responsible for having stopped/killed any conflicting sweep
/// first; this only updates the registry's bookkeeping.
pub fn start_force(managed: &mut ManagedSweep, data_txs: Vec<DataSender>) -> Result<(), MeasureItError> {
    let mut entries = registry().lock();
    prune_terminal(&mut entries);
    entries.retain(|e| e.ancestry.related_to(managed.ancestry()));
    entries.push(Entry { ancestry: managed.ancestry(), progress: managed.progress() });
    drop(entries);
    managed.start(data_txs)
}

/// Remove every entry belonging to `ancestry`'s tree.
pub fn remove(ancestry: Ancestry) {
    registry().lock().retain(|e| !e.ancestry.related_to(ancestry));
}

/// Whether any unrelated sweep is currently active.
pub fn blocks(ancestry: Ancestry) -> bool {
    let mut entries = registry().lock();
    prune_terminal(&mut entries);
    entries.iter().any(|e| !e.ancestry.related_to(ancestry))
}

/// Clear all registry state. Test-only: production code has no legitimate
/// reason to forget active sweeps outright.
#[doc(hidden)]
pub fn reset_for_test() {
    registry().lock().clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::data_channel;
    use measureit_parameter::SimulatedParameter;
    use measureit_sweep::kinds::one_axis::OneAxisSweep;
    use measureit_sweep::{FollowSet, SweepCore, Trajectory, TrajectoryMode};

    fn managed() -> ManagedSweep {
        let traj = Trajectory::new(0.0, 0.2, 0.1, TrajectoryMode::OneShot).unwrap();
        let kind = OneAxisSweep::new(Box::new(SimulatedParameter::new("gate", "V", 0.0)), traj, 0.0, false);
        let core = SweepCore::new(Box::new(kind), FollowSet::new()).unwrap();
        ManagedSweep::new(core)
    }

    fn slow_managed() -> ManagedSweep {
        // Generous per-step delay so the concurrency check below has a
        // wide window before this sweep can reach a terminal state.
        let traj = Trajectory::new(0.0, 1.0, 0.1, TrajectoryMode::OneShot).unwrap();
        let kind = OneAxisSweep::new(Box::new(SimulatedParameter::new("gate", "V", 0.0)), traj, 0.2, false);
        let core = SweepCore::new(Box::new(kind), FollowSet::new()).unwrap();
        ManagedSweep::new(core)
    }

    #[test]
    fn second_unrelated_sweep_is_blocked_until_first_finishes() {
        reset_for_test();
        let mut a = slow_managed();
        let mut b = managed();
        let (tx, _rx) = data_channel();
        start(&mut a, vec![tx.clone()]).unwrap();
        assert!(matches!(start(&mut b, vec![tx]), Err(MeasureItError::Concurrency)));
        a.kill();
        a.join();
        reset_for_test();
    }

    #[test]
    fn sweep_is_allowed_again_once_prior_one_is_terminal() {
        reset_for_test();
        let mut a = managed();
        let (tx, _rx) = data_channel();
        start(&mut a, vec![tx.clone()]).unwrap();
        a.join();
        let mut b = managed();
        assert!(start(&mut b, vec![tx]).is_ok());
        b.join();
        reset_for_test();
    }
}
