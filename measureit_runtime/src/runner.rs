//! The background thread that drives a [`SweepCore`].
//!
//! Only this thread ever calls `step()`/`ramp_to_start()` on the sweep's
//! parameters; everything else reads through `ProgressState`.

use crate::channel::{DataEnvelope, DataSender};
use crate::control::{ControlMsg, ControlReceiver};
use measureit_sweep::{Row, StepOutcome, SweepCore, SweepId, SweepState};
use tracing::{error, info, warn};

/// Run `core` to completion, publishing every row to `data_txs` and
/// honoring commands on `control_rx`. Returns the final [`SweepState`].
pub fn run(
    mut core: SweepCore,
    sweep_id: SweepId,
    control_rx: ControlReceiver,
    data_txs: Vec<DataSender>,
) -> SweepState {
    if let Err(err) = core.start() {
        error!(sweep = %sweep_id, error = %err, "sweep failed to ramp to start");
        return core.progress().state();
    }

    loop {
        match control_rx.try_recv() {
            Ok(ControlMsg::Kill) => {
                core.kill();
                break;
            }
            Ok(ControlMsg::Stop) => {
                core.request_stop();
                if let Err(err) = step_once(&mut core, sweep_id, &data_txs) {
                    warn!(sweep = %sweep_id, error = %err, "final drained step faulted");
                } else {
                    core.mark_drained();
                }
                break;
            }
            Ok(ControlMsg::Pause) => {
                core.pause();
                if wait_paused(&mut core, &control_rx) {
                    break;
                }
                continue;
            }
            Ok(ControlMsg::Resume) => continue, // not paused; ignore stray Resume
            Err(_) => {}
        }

        if let Err(err) = step_once(&mut core, sweep_id, &data_txs) {
            warn!(sweep = %sweep_id, error = %err, "sweep step faulted");
            break;
        }

        if core.progress().state().is_terminal() {
            break;
        }
    }

    let final_state = core.progress().state();
    info!(sweep = %sweep_id, state = ?final_state, "sweep run finished");
    final_state
}

/// Block until `Resume` or `Kill` arrives while PAUSED. A `Stop` received
/// while paused transitions straight to DONE.
/// Returns `true` if the Runner should stop its outer loop.
fn wait_paused(core: &mut SweepCore, control_rx: &ControlReceiver) -> bool {
    loop {
        match control_rx.recv() {
            Ok(ControlMsg::Resume) => {
                core.resume();
                return false;
            }
            Ok(ControlMsg::Kill) => {
                core.kill();
                return true;
            }
            Ok(ControlMsg::Stop) => {
                core.request_stop();
                return true;
            }
            Ok(ControlMsg::Pause) => continue, // already paused
            Err(_) => return true,             // control channel closed: treat as kill
        }
    }
}

fn step_once(
    core: &mut SweepCore,
    sweep_id: SweepId,
    data_txs: &[DataSender],
) -> Result<StepOutcome, measureit_common::error::MeasureItError> {
    let (outcome, row) = core.step()?;

    // A two-axis outer advance emits its line break before the first row of
    // the new inner pass; a bidirectional flip emits its break right after
    // the last row of the leg it just finished.
    if outcome == StepOutcome::LineBreak {
        send_break(sweep_id, data_txs, row.index);
    }
    send_row(sweep_id, data_txs, row.clone());
    if outcome == StepOutcome::EndBidirectional {
        send_break(sweep_id, data_txs, row.index + 1);
    }

    Ok(outcome)
}

fn send_row(sweep_id: SweepId, data_txs: &[DataSender], row: Row) {
    for tx in data_txs {
        if tx.send(DataEnvelope { sweep_id, row: row.clone() }).is_err() {
            warn!(sweep = %sweep_id, "data consumer disconnected, dropping remaining sends to it");
        }
    }
}

fn send_break(sweep_id: SweepId, data_txs: &[DataSender], index: u64) {
    send_row(sweep_id, data_txs, Row::break_marker(index));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::data_channel;
    use crate::control::control_channel;
    use measureit_parameter::SimulatedParameter;
    use measureit_sweep::kinds::one_axis::OneAxisSweep;
    use measureit_sweep::{FollowSet, Trajectory, TrajectoryMode};

    #[test]
    fn set_failure_mid_run_leaves_sweep_in_error_with_one_fault() {
        let traj = Trajectory::new(0.0, 1.0, 0.1, TrajectoryMode::OneShot).unwrap();
        let mut param = SimulatedParameter::new("gate", "V", 0.0);
        // Ramp-to-start consumes the first successful set; five more carry
        // the run through its first five points, then the next call fails,
        // putting the fault mid-run rather than at start().
        param.fail_sets_after(6);
        let kind = OneAxisSweep::new(Box::new(param), traj, 0.0, false);
        let core = SweepCore::new(Box::new(kind), FollowSet::new()).unwrap();
        let progress = core.progress();

        let (data_tx, _data_rx) = data_channel();
        let (_ctrl_tx, ctrl_rx) = control_channel();
        let final_state = run(core, SweepId::new(), ctrl_rx, vec![data_tx]);

        assert_eq!(final_state, SweepState::Error);
        let snap = progress.snapshot();
        assert!(snap.points_emitted >= 5);
        assert_eq!(snap.error_count, 1);
        assert!(snap.error_message.as_deref().unwrap_or("").contains("Could not set"));
    }

    #[test]
    fn bidirectional_flip_emits_a_break_marker_after_the_turnaround_row() {
        let traj = Trajectory::new(0.0, 0.2, 0.1, TrajectoryMode::Bidirectional).unwrap();
        let kind = OneAxisSweep::new(Box::new(SimulatedParameter::new("gate", "V", 0.0)), traj, 0.0, false);
        let core = SweepCore::new(Box::new(kind), FollowSet::new()).unwrap();

        let (data_tx, data_rx) = data_channel();
        let (_ctrl_tx, ctrl_rx) = control_channel();
        let sweep_id = SweepId::new();
        let handle = std::thread::spawn(move || run(core, sweep_id, ctrl_rx, vec![data_tx]));

        let mut saw_break_after_real_row = false;
        let mut last_was_real = false;
        for envelope in data_rx.iter() {
            if envelope.row.is_break {
                if last_was_real {
                    saw_break_after_real_row = true;
                }
            }
            last_was_real = !envelope.row.is_break;
        }
        handle.join().unwrap();

        assert!(saw_break_after_real_row, "expected at least one break marker following a real row");
    }
}
