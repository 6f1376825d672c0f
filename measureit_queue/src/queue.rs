//! The supervisor loop driving a [`QueueEntry`] sequence.
//!
//! A queue-level `kill()` kills whichever sweep is currently running and
//! halts consumption of the remaining entries; a queue-level `stop()` lets
//! the current entry finish naturally before halting. An entry that ends in
//! ERROR halts the queue the same way, leaving its siblings unconsumed
//! rather than run.

use crate::entry::QueueEntry;
use measureit_common::error::MeasureItError;
use measureit_common::paths::PersistenceRoot;
use measureit_persistence::{JsonLinesStore, PersistenceFacade};
use measureit_runtime::{data_channel, registry, ControlMsg, ControlSender, ManagedSweep};
use measureit_sweep::SweepState;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{info, warn};

/// The queue's own lifecycle state, distinct from any individual sweep's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    /// Constructed, not yet started.
    Idle,
    /// Consuming entries.
    Running,
    /// Every entry ran to completion (or consumption was halted by
    /// `kill()`/`stop()`) and the supervisor thread has exited.
    Finished,
    /// A `Sweep` entry ended in `SweepState::Error`: the supervisor stopped
    /// consuming immediately, leaving any remaining entries in the queue.
    Error,
}

/// What happened to one [`QueueEntry::Sweep`].
#[derive(Debug, Clone)]
pub struct EntryOutcome {
    /// The experiment name it was persisted under.
    pub experiment: String,
    /// The sweep's final state.
    pub final_state: SweepState,
}

struct Shared {
    state: Mutex<QueueState>,
    current_control: Mutex<Option<ControlSender>>,
    kill_requested: AtomicBool,
    stop_requested: AtomicBool,
}

struct SupervisorResult {
    outcomes: Vec<EntryOutcome>,
    remaining: VecDeque<QueueEntry>,
}

/// An ordered sequence of sweeps (and interleaved callables/context
/// switches) run one at a time by a background supervisor thread.
pub struct SweepQueue {
    entries: VecDeque<QueueEntry>,
    shared: Arc<Shared>,
    handle: Option<JoinHandle<SupervisorResult>>,
}

impl Default for SweepQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl SweepQueue {
    /// An empty, idle queue.
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState::Idle),
                current_control: Mutex::new(None),
                kill_requested: AtomicBool::new(false),
                stop_requested: AtomicBool::new(false),
            }),
            handle: None,
        }
    }

    /// Append one entry to the back of the queue.
    pub fn append(&mut self, entry: QueueEntry) {
        self.entries.push_back(entry);
    }

    /// Number of entries not yet consumed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue has no pending entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current queue-level state.
    pub fn state(&self) -> QueueState {
        *self.shared.state.lock()
    }

    /// Spawn the supervisor thread and drain entries in order, persisting
    /// each `Sweep` entry's rows under `root`.
    ///
    /// # Errors
    /// Returns [`MeasureItError::Config`] if already started.
    pub fn start(&mut self, root: PersistenceRoot) -> Result<(), MeasureItError> {
        if self.handle.is_some() {
            return Err(MeasureItError::Config("queue already started".to_string()));
        }
        let entries = std::mem::take(&mut self.entries);
        let shared = Arc::clone(&self.shared);
        *shared.state.lock() = QueueState::Running;
        self.handle = Some(std::thread::Builder::new().name("sweep-queue".to_string()).spawn(move || {
            run_supervisor(entries, shared, root)
        }).expect("failed to spawn queue supervisor thread"));
        Ok(())
    }

    /// Kill the currently running sweep, if any, and halt consumption of
    /// remaining entries.
    pub fn kill(&self) {
        self.shared.kill_requested.store(true, Ordering::SeqCst);
        if let Some(ctrl) = self.shared.current_control.lock().clone() {
            let _ = ctrl.send(ControlMsg::Kill);
        }
    }

    /// Let the current entry finish, then halt consumption of the rest.
    pub fn stop(&self) {
        self.shared.stop_requested.store(true, Ordering::SeqCst);
    }

    /// Block until the supervisor thread exits and return every sweep
    /// entry's outcome, in order. Entries left unconsumed (queue killed,
    /// stopped, or halted by an entry that errored) are put back at the
    /// front of this queue.
    pub fn join(&mut self) -> Vec<EntryOutcome> {
        match self.handle.take() {
            Some(h) => {
                let result = h.join().unwrap_or(SupervisorResult { outcomes: Vec::new(), remaining: VecDeque::new() });
                self.entries = result.remaining;
                result.outcomes
            }
            None => Vec::new(),
        }
    }
}

impl std::ops::AddAssign<QueueEntry> for SweepQueue {
    fn add_assign(&mut self, entry: QueueEntry) {
        self.append(entry);
    }
}

impl<'a> IntoIterator for &'a SweepQueue {
    type Item = &'a QueueEntry;
    type IntoIter = std::collections::vec_deque::Iter<'a, QueueEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

fn run_supervisor(mut entries: VecDeque<QueueEntry>, shared: Arc<Shared>, root: PersistenceRoot) -> SupervisorResult {
    let mut outcomes = Vec::new();
    let mut current_experiment = "default".to_string();
    let mut final_state = QueueState::Finished;

    while let Some(entry) = entries.pop_front() {
        if shared.kill_requested.load(Ordering::SeqCst) || shared.stop_requested.load(Ordering::SeqCst) {
            break;
        }

        match entry {
            QueueEntry::ContextSwitch(name) => {
                current_experiment = name;
            }
            QueueEntry::Callable(f) => {
                f();
            }
            QueueEntry::Sweep { core, experiment } => {
                let tag = experiment.unwrap_or_else(|| current_experiment.clone());
                match run_one_sweep(core, &tag, &root, &shared) {
                    Ok(final_sweep_state) => {
                        outcomes.push(EntryOutcome { experiment: tag, final_state: final_sweep_state })
                    }
                    Err(err) => {
                        warn!(experiment = %tag, error = %err, "queue entry failed, halting consumption of remaining entries");
                        outcomes.push(EntryOutcome { experiment: tag, final_state: SweepState::Error });
                        final_state = QueueState::Error;
                        break;
                    }
                }
            }
        }
    }

    *shared.state.lock() = final_state;
    info!(count = outcomes.len(), remaining = entries.len(), "queue supervisor finished");
    SupervisorResult { outcomes, remaining: entries }
}

fn run_one_sweep(
    core: measureit_sweep::SweepCore,
    experiment: &str,
    root: &PersistenceRoot,
    shared: &Arc<Shared>,
) -> Result<SweepState, MeasureItError> {
    let mut managed = ManagedSweep::new(core);
    let metadata = managed.metadata().clone();
    let controlled_names = managed.controlled_names().to_vec();
    let followed_names = managed.followed_names().to_vec();

    let (tx, rx) = data_channel();
    registry::start(&mut managed, vec![tx])?;
    *shared.current_control.lock() = managed.control_handle();

    let run_tag = format!("{}", managed.id().value());
    let mut store = JsonLinesStore::open(root, experiment, &run_tag)?;
    store.begin_measurement(&metadata, &controlled_names, &followed_names)?;

    for envelope in rx.iter() {
        if envelope.row.is_break {
            continue;
        }
        if let Err(err) = store.append(&envelope.row.setpoints, &envelope.row.followed) {
            warn!(experiment = %experiment, error = %err, "failed to persist row");
        }
    }

    let final_state = managed.join();
    store.finish(final_state)?;
    store.close()?;
    registry::remove(managed.ancestry());
    *shared.current_control.lock() = None;
    Ok(final_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::QueueEntry;
    use measureit_parameter::SimulatedParameter;
    use measureit_sweep::kinds::one_axis::OneAxisSweep;
    use measureit_sweep::{FollowSet, SweepCore, Trajectory, TrajectoryMode};
    use std::sync::atomic::AtomicUsize;

    fn sweep_core() -> SweepCore {
        let traj = Trajectory::new(0.0, 0.2, 0.1, TrajectoryMode::OneShot).unwrap();
        let kind = OneAxisSweep::new(Box::new(SimulatedParameter::new("gate", "V", 0.0)), traj, 0.0, false);
        SweepCore::new(Box::new(kind), FollowSet::new()).unwrap()
    }

    fn failing_sweep_core() -> SweepCore {
        let traj = Trajectory::new(0.0, 0.2, 0.1, TrajectoryMode::OneShot).unwrap();
        let mut param = SimulatedParameter::new("gate", "V", 0.0);
        param.fail_next_sets(1_000_000);
        let kind = OneAxisSweep::new(Box::new(param), traj, 0.0, false);
        SweepCore::new(Box::new(kind), FollowSet::new()).unwrap()
    }

    #[test]
    fn failed_entry_halts_the_queue_and_preserves_remaining_entries() {
        registry::reset_for_test();
        let tmp = tempfile::tempdir().unwrap();
        let root = PersistenceRoot::resolve(Some(tmp.path()));

        let mut q = SweepQueue::new();
        q.append(QueueEntry::Sweep { core: failing_sweep_core(), experiment: Some("bad".to_string()) });
        q.append(QueueEntry::Sweep { core: sweep_core(), experiment: Some("good".to_string()) });
        q.start(root).unwrap();
        let outcomes = q.join();

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].final_state, SweepState::Error);
        assert_eq!(q.state(), QueueState::Error);
        // The "good" entry was never popped: it's preserved for a caller to
        // retry or inspect rather than silently discarded.
        assert_eq!(q.len(), 1);
        registry::reset_for_test();
    }

    #[test]
    fn context_switch_names_subsequent_sweeps() {
        registry::reset_for_test();
        let tmp = tempfile::tempdir().unwrap();
        let root = PersistenceRoot::resolve(Some(tmp.path()));

        let mut q = SweepQueue::new();
        q.append(QueueEntry::ContextSwitch("cooldown".to_string()));
        q.append(QueueEntry::Sweep { core: sweep_core(), experiment: None });
        q.start(root).unwrap();
        let outcomes = q.join();

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].experiment, "cooldown");
        registry::reset_for_test();
    }

    #[test]
    fn callable_entries_run_synchronously() {
        registry::reset_for_test();
        let tmp = tempfile::tempdir().unwrap();
        let root = PersistenceRoot::resolve(Some(tmp.path()));
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut q = SweepQueue::new();
        q.append(QueueEntry::Callable(Box::new(move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        })));
        q.start(root).unwrap();
        q.join();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        registry::reset_for_test();
    }

    #[test]
    fn add_assign_appends_and_iteration_sees_pending_entries() {
        let mut q = SweepQueue::new();
        q += QueueEntry::ContextSwitch("a".to_string());
        q += QueueEntry::ContextSwitch("b".to_string());

        assert_eq!(q.len(), 2);
        let names: Vec<&str> = (&q)
            .into_iter()
            .map(|e| match e {
                QueueEntry::ContextSwitch(name) => name.as_str(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
