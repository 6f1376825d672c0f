//! A 2-D grid sink for composed (two-axis) sweeps.

use measureit_runtime::DataReceiver;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::info;

/// A row-major grid of a single followed parameter's values, indexed by
/// `(outer_index, inner_index)`. Cells not yet written read as `NaN`.
#[derive(Debug, Clone)]
pub struct Grid {
    data: Vec<f64>,
    inner_len: usize,
    outer_len: usize,
}

impl Grid {
    fn new(inner_len: usize, outer_len: usize) -> Self {
        Self { data: vec![f64::NAN; inner_len * outer_len], inner_len, outer_len }
    }

    fn set(&mut self, outer_index: usize, inner_index: usize, value: f64) {
        if outer_index < self.outer_len && inner_index < self.inner_len {
            self.data[outer_index * self.inner_len + inner_index] = value;
        }
    }

    /// Read one cell.
    pub fn get(&self, outer_index: usize, inner_index: usize) -> f64 {
        self.data[outer_index * self.inner_len + inner_index]
    }

    /// Grid dimensions as `(outer_len, inner_len)`.
    pub fn dims(&self) -> (usize, usize) {
        (self.outer_len, self.inner_len)
    }
}

struct Inner {
    grid: Grid,
    outer_index: usize,
    inner_index: usize,
}

/// Buffers a two-axis sweep's rows into a [`Grid`] for a heatmap display.
/// Every row emitted while the inner axis completes one pass fills one
/// grid row; a full inner-axis pass advances to the next outer row.
pub struct HeatmapSink {
    state: Arc<Mutex<Inner>>,
    handle: Option<JoinHandle<()>>,
}

impl HeatmapSink {
    /// Spawn a background thread filling an `outer_len` x `inner_len` grid
    /// from `data_rx`, tracking `followed_index` of each row's followed
    /// values as the cell value.
    pub fn spawn(data_rx: DataReceiver, inner_len: usize, outer_len: usize, followed_index: usize) -> Self {
        let state = Arc::new(Mutex::new(Inner {
            grid: Grid::new(inner_len, outer_len),
            outer_index: 0,
            inner_index: 0,
        }));
        let worker_state = Arc::clone(&state);
        let handle = std::thread::Builder::new()
            .name("heatmap-sink".to_string())
            .spawn(move || {
                for envelope in data_rx.iter() {
                    let mut g = worker_state.lock();
                    if envelope.row.is_break {
                        // The Runner emits this right at the line boundary;
                        // the grid advances on real rows only, so skip it
                        // rather than count it as a cell.
                        continue;
                    }
                    if let Some(value) = envelope.row.followed.get(followed_index) {
                        let (outer_index, inner_index) = (g.outer_index, g.inner_index);
                        g.grid.set(outer_index, inner_index, *value);
                    }
                    g.inner_index += 1;
                    if g.inner_index >= inner_len {
                        g.inner_index = 0;
                        g.outer_index += 1;
                    }
                }
                info!("heatmap sink channel closed, exiting");
            })
            .expect("failed to spawn heatmap sink thread");
        Self { state, handle: Some(handle) }
    }

    /// A snapshot of the current grid.
    pub fn snapshot(&self) -> Grid {
        self.state.lock().grid.clone()
    }

    /// Block until the background thread exits.
    pub fn join(&mut self) {
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}
