//! A background thread that drains a data channel into per-parameter
//! buffers for live plotting.
//!
//! Consumers outside this crate only see [`PlotBuffers::snapshot`]; the
//! background thread is the only writer, matching the Runner/`ProgressState`
//! split in `measureit_sweep`.

use measureit_common::consts::PLOT_QUEUE_DEPTH;
use measureit_runtime::{control_channel, ControlMsg, ControlSender, DataReceiver};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::info;

/// One named trace: x-values (controlled setpoint or row index) paired
/// with y-values (a single followed parameter), with a `NaN` inserted at
/// every direction break.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    /// X-axis samples.
    pub x: Vec<f64>,
    /// Y-axis samples, same length as `x`.
    pub y: Vec<f64>,
}

/// A snapshot of every trace a [`PlotSink`] is currently buffering.
#[derive(Debug, Clone, Default)]
pub struct PlotBuffers {
    traces: Vec<Trace>,
}

impl PlotBuffers {
    /// The traces, one per followed parameter, in declared order.
    pub fn traces(&self) -> &[Trace] {
        &self.traces
    }
}

struct Inner {
    buffers: PlotBuffers,
    pending_update: bool,
}

fn insert_break(buffers: &mut PlotBuffers) {
    for trace in buffers.traces.iter_mut() {
        trace.x.push(f64::NAN);
        trace.y.push(f64::NAN);
    }
}

/// A background consumer that buffers rows for a live plot and maps
/// keyboard-style control requests onto the Runner's control channel.
pub struct PlotSink {
    state: Arc<Mutex<Inner>>,
    handle: Option<JoinHandle<()>>,
    runner_control: ControlSender,
}

impl PlotSink {
    /// Spawn a background thread draining `data_rx` into per-parameter
    /// buffers. `followed_count` fixes the number of traces up front.
    /// `runner_control` is the same control channel the Runner listens on,
    /// so this sink can translate a user's ESC/ENTER/SPACE keypress into a
    /// Kill/Stop/Pause command.
    pub fn spawn(data_rx: DataReceiver, runner_control: ControlSender, followed_count: usize) -> Self {
        let state = Arc::new(Mutex::new(Inner {
            buffers: PlotBuffers { traces: vec![Trace::default(); followed_count] },
            pending_update: false,
        }));
        let worker_state = Arc::clone(&state);
        let handle = std::thread::Builder::new()
            .name("plot-sink".to_string())
            .spawn(move || {
                for envelope in data_rx.iter() {
                    let mut g = worker_state.lock();
                    if envelope.row.is_break {
                        insert_break(&mut g.buffers);
                    } else {
                        for (i, y) in envelope.row.followed.iter().enumerate() {
                            if let Some(trace) = g.buffers.traces.get_mut(i) {
                                let x = envelope.row.setpoints.first().copied().unwrap_or(envelope.row.index as f64);
                                trace.x.push(x);
                                trace.y.push(*y);
                            }
                        }
                    }
                    // PLOT_QUEUE_DEPTH bounds how many pending-update flags
                    // we coalesce into one redraw; depth 1 means "at most
                    // one redraw owed at a time".
                    if PLOT_QUEUE_DEPTH > 0 {
                        g.pending_update = true;
                    }
                }
                info!("plot sink channel closed, exiting");
            })
            .expect("failed to spawn plot sink thread");
        Self { state, handle: Some(handle), runner_control }
    }

    /// A consistent snapshot of every trace, clearing the pending-update
    /// flag.
    pub fn snapshot(&self) -> PlotBuffers {
        let mut g = self.state.lock();
        g.pending_update = false;
        g.buffers.clone()
    }

    /// Whether a redraw is owed since the last `snapshot()`.
    pub fn has_pending_update(&self) -> bool {
        self.state.lock().pending_update
    }

    /// Insert a `NaN` gap into every trace — called when the Runner
    /// reports a direction flip, so forward and reverse legs don't connect
    /// visually.
    pub fn mark_break(&self) {
        let mut g = self.state.lock();
        insert_break(&mut g.buffers);
    }

    /// Map ESC to an immediate kill of the sweep being plotted.
    pub fn on_escape(&self) {
        let _ = self.runner_control.send(ControlMsg::Kill);
    }

    /// Map ENTER to a cooperative stop.
    pub fn on_enter(&self) {
        let _ = self.runner_control.send(ControlMsg::Stop);
    }

    /// Map SPACE to pause/resume toggling is left to the caller, since only
    /// the caller knows the sweep's current state; this just forwards one
    /// command.
    pub fn on_space(&self, currently_paused: bool) {
        let msg = if currently_paused { ControlMsg::Resume } else { ControlMsg::Pause };
        let _ = self.runner_control.send(msg);
    }

    /// Block until the background thread exits (the data channel closed).
    pub fn join(&mut self) {
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

/// Build a fresh control channel for a [`PlotSink`] to share with a Runner.
/// Convenience re-export of [`measureit_runtime::control_channel`] so
/// callers in this crate don't need to depend on it directly for the
/// common case.
pub fn plot_control_channel() -> (ControlSender, measureit_runtime::ControlReceiver) {
    control_channel()
}

#[cfg(test)]
mod tests {
    use super::*;
    use measureit_runtime::{data_channel, DataEnvelope};
    use measureit_sweep::{Row, SweepId};

    #[test]
    fn buffers_accumulate_per_followed_parameter() {
        let (tx, rx) = data_channel();
        let (ctrl_tx, _ctrl_rx) = plot_control_channel();
        let mut sink = PlotSink::spawn(rx, ctrl_tx, 1);
        let sweep_id = SweepId::new();
        tx.send(DataEnvelope {
            sweep_id,
            row: Row { index: 0, setpoints: vec![0.0], followed: vec![1.0], is_break: false },
        })
        .unwrap();
        tx.send(DataEnvelope {
            sweep_id,
            row: Row { index: 1, setpoints: vec![0.5], followed: vec![2.0], is_break: false },
        })
        .unwrap();
        drop(tx);
        sink.join();
        let snap = sink.snapshot();
        assert_eq!(snap.traces()[0].x, vec![0.0, 0.5]);
        assert_eq!(snap.traces()[0].y, vec![1.0, 2.0]);
    }

    #[test]
    fn mark_break_inserts_nan() {
        let (_tx, rx) = data_channel();
        let (ctrl_tx, _ctrl_rx) = plot_control_channel();
        let sink = PlotSink::spawn(rx, ctrl_tx, 1);
        sink.mark_break();
        let snap = sink.snapshot();
        assert!(snap.traces()[0].x[0].is_nan());
    }

    #[test]
    fn break_envelope_from_channel_inserts_nan() {
        let (tx, rx) = data_channel();
        let (ctrl_tx, _ctrl_rx) = plot_control_channel();
        let mut sink = PlotSink::spawn(rx, ctrl_tx, 1);
        let sweep_id = SweepId::new();
        tx.send(DataEnvelope {
            sweep_id,
            row: Row { index: 0, setpoints: vec![0.0], followed: vec![1.0], is_break: false },
        })
        .unwrap();
        tx.send(DataEnvelope { sweep_id, row: Row::break_marker(1) }).unwrap();
        drop(tx);
        sink.join();
        let snap = sink.snapshot();
        assert_eq!(snap.traces()[0].x.len(), 2);
        assert!(snap.traces()[0].x[1].is_nan());
        assert!(snap.traces()[0].y[1].is_nan());
    }
}
