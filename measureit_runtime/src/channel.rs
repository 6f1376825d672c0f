//! The bounded data channel a Runner uses to publish rows to consumers
//! (persistence, plot sinks).

use measureit_common::consts::DATA_CHANNEL_BOUND;
use measureit_sweep::{Row, SweepId};

/// A row tagged with the sweep that produced it, so a consumer fed by
/// several sweeps (e.g. a shared plot sink) can tell them apart.
#[derive(Debug, Clone)]
pub struct DataEnvelope {
    /// Which sweep this row belongs to.
    pub sweep_id: SweepId,
    /// The row itself.
    pub row: Row,
}

/// Sending half of the data channel.
pub type DataSender = crossbeam_channel::Sender<DataEnvelope>;
/// Receiving half of the data channel.
pub type DataReceiver = crossbeam_channel::Receiver<DataEnvelope>;

/// Build a bounded data channel sized per [`DATA_CHANNEL_BOUND`].
pub fn data_channel() -> (DataSender, DataReceiver) {
    crossbeam_channel::bounded(DATA_CHANNEL_BOUND)
}

#[cfg(test)]
mod tests {
    use super::*;
    use measureit_sweep::Row;

    #[test]
    fn envelope_round_trips_through_channel() {
        let (tx, rx) = data_channel();
        let row = Row { index: 0, setpoints: vec![1.0], followed: vec![2.0], is_break: false };
        tx.send(DataEnvelope { sweep_id: SweepId::new(), row: row.clone() }).unwrap();
        let received = rx.recv().unwrap();
        assert_eq!(received.row, row);
    }
}
