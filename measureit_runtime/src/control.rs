//! The bounded control channel a supervisor uses to steer a running Runner.

use measureit_common::consts::CONTROL_CHANNEL_BOUND;

/// A command sent to a Runner from outside its thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMsg {
    /// Pause cooperatively after the in-flight step.
    Pause,
    /// Resume from PAUSED.
    Resume,
    /// Stop cooperatively: drain the in-flight step, then finish.
    Stop,
    /// Stop immediately, without draining.
    Kill,
}

/// Sending half of the control channel.
pub type ControlSender = crossbeam_channel::Sender<ControlMsg>;
/// Receiving half of the control channel.
pub type ControlReceiver = crossbeam_channel::Receiver<ControlMsg>;

/// Build a bounded control channel sized per [`CONTROL_CHANNEL_BOUND`].
pub fn control_channel() -> (ControlSender, ControlReceiver) {
    crossbeam_channel::bounded(CONTROL_CHANNEL_BOUND)
}
