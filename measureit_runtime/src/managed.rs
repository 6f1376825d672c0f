//! `ManagedSweep`: the public lifecycle wrapper around a [`SweepCore`] plus
//! its background thread.

use crate::channel::DataSender;
use crate::control::{control_channel, ControlMsg, ControlSender};
use crate::runner;
use measureit_common::error::MeasureItError;
use measureit_sweep::{Ancestry, Metadata, ProgressState, SweepCore, SweepId, SweepState};
use std::thread::JoinHandle;
use tracing::warn;

/// Owns a sweep's background thread once started, and exposes the full
/// public lifecycle contract (`start`/`pause`/`resume`/`stop`/`kill`,
/// progress reads) without requiring callers to touch `SweepCore`
/// directly.
pub struct ManagedSweep {
    ancestry: Ancestry,
    progress: ProgressState,
    metadata: Metadata,
    controlled_names: Vec<String>,
    followed_names: Vec<String>,
    core: Option<SweepCore>,
    control_tx: Option<ControlSender>,
    handle: Option<JoinHandle<SweepState>>,
}

impl ManagedSweep {
    /// Wrap a freshly constructed (READY) sweep. The background thread is
    /// not spawned until [`ManagedSweep::start`] is called.
    pub fn new(core: SweepCore) -> Self {
        Self {
            ancestry: core.ancestry(),
            progress: core.progress(),
            metadata: core.export_metadata(),
            controlled_names: core.controlled_names(),
            followed_names: core.followed_names(),
            core: Some(core),
            control_tx: None,
            handle: None,
        }
    }

    /// This sweep's ancestry (own id + composed-tree root id).
    pub fn ancestry(&self) -> Ancestry {
        self.ancestry
    }

    /// This sweep's id.
    pub fn id(&self) -> SweepId {
        self.ancestry.id()
    }

    /// A cheaply-clonable progress handle.
    pub fn progress(&self) -> ProgressState {
        self.progress.clone()
    }

    /// Names of controlled parameter(s).
    pub fn controlled_names(&self) -> &[String] {
        &self.controlled_names
    }

    /// Names of follow parameter(s).
    pub fn followed_names(&self) -> &[String] {
        &self.followed_names
    }

    /// The metadata record captured at construction.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Spawn the Runner thread, handing it every row consumer that should
    /// see this sweep's data.
    ///
    /// # Errors
    /// Returns [`MeasureItError::Config`] if the sweep was already started.
    pub fn start(&mut self, data_txs: Vec<DataSender>) -> Result<(), MeasureItError> {
        let core = self
            .core
            .take()
            .ok_or_else(|| MeasureItError::Config("sweep already started".to_string()))?;
        let (control_tx, control_rx) = control_channel();
        let sweep_id = self.ancestry.id();
        let handle = std::thread::Builder::new()
            .name(format!("sweep-runner-{}", sweep_id.value()))
            .spawn(move || runner::run(core, sweep_id, control_rx, data_txs))
            .expect("failed to spawn sweep runner thread");
        self.control_tx = Some(control_tx);
        self.handle = Some(handle);
        Ok(())
    }

    /// Request a cooperative pause. No-op if the sweep has not started.
    pub fn pause(&self) {
        self.send(ControlMsg::Pause);
    }

    /// Resume from PAUSED.
    pub fn resume(&self) {
        self.send(ControlMsg::Resume);
    }

    /// Request a cooperative stop: drains the in-flight point, then DONE.
    pub fn stop(&self) {
        self.send(ControlMsg::Stop);
    }

    /// Stop immediately, without draining.
    pub fn kill(&self) {
        self.send(ControlMsg::Kill);
    }

    fn send(&self, msg: ControlMsg) {
        if let Some(tx) = &self.control_tx {
            if tx.send(msg).is_err() {
                warn!(sweep = %self.ancestry.id(), "control send failed: runner already finished");
            }
        }
    }

    /// Block until the Runner thread finishes and return the final state.
    /// Returns the current progress state immediately if the sweep was
    /// never started.
    pub fn join(&mut self) -> SweepState {
        match self.handle.take() {
            Some(h) => h.join().unwrap_or(SweepState::Error),
            None => self.progress.state(),
        }
    }

    /// Whether the Runner thread has been spawned.
    pub fn is_started(&self) -> bool {
        self.handle.is_some()
    }

    /// A clone of the control sender, for callers (e.g. a queue supervisor)
    /// that need to forward kill/stop requests to whichever sweep is
    /// currently running without holding a `&ManagedSweep` themselves.
    pub fn control_handle(&self) -> Option<ControlSender> {
        self.control_tx.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::data_channel;
    use measureit_sweep::kinds::one_axis::OneAxisSweep;
    use measureit_sweep::{FollowSet, Trajectory, TrajectoryMode};
    use measureit_parameter::SimulatedParameter;

    fn managed() -> ManagedSweep {
        let traj = Trajectory::new(0.0, 0.2, 0.1, TrajectoryMode::OneShot).unwrap();
        let kind = OneAxisSweep::new(Box::new(SimulatedParameter::new("gate", "V", 0.0)), traj, 0.0, false);
        let core = SweepCore::new(Box::new(kind), FollowSet::new()).unwrap();
        ManagedSweep::new(core)
    }

    #[test]
    fn runs_to_done_and_emits_rows() {
        let mut m = managed();
        let (tx, rx) = data_channel();
        m.start(vec![tx]).unwrap();
        let final_state = m.join();
        assert_eq!(final_state, SweepState::Done);
        let rows: Vec<_> = rx.try_iter().collect();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn cannot_start_twice() {
        let mut m = managed();
        let (tx, _rx) = data_channel();
        m.start(vec![tx.clone()]).unwrap();
        m.join();
        assert!(m.start(vec![tx]).is_err());
    }
}
