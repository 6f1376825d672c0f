//! JSON Lines reference adapter: one file per measurement, one JSON object
//! per row, preceded by a metadata header line.

use crate::facade::PersistenceFacade;
use measureit_common::error::MeasureItError;
use measureit_common::paths::PersistenceRoot;
use measureit_sweep::{Metadata, Row, RowSink, SweepState};
use serde_json::json;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{info, warn};

/// Writes one `.jsonl` file per measurement under the persistence root's
/// `databases/` directory: a `"metadata"` header line, one `"row"` line per
/// emitted point, and a closing `"final_state"` line.
pub struct JsonLinesStore {
    experiment: String,
    path: Option<PathBuf>,
    writer: Option<BufWriter<File>>,
    controlled_names: Vec<String>,
    followed_names: Vec<String>,
}

impl JsonLinesStore {
    /// Open a store rooted at `root`'s `databases/` directory, named after
    /// `experiment` plus a caller-supplied `run_tag` (typically a
    /// timestamp) to avoid collisions between runs of the same experiment.
    ///
    /// # Errors
    /// Returns [`MeasureItError::Persistence`] if the directory or file
    /// cannot be created.
    pub fn open(root: &PersistenceRoot, experiment: &str, run_tag: &str) -> Result<Self, MeasureItError> {
        let dir = root
            .databases_dir()
            .map_err(|e| MeasureItError::Persistence(format!("could not create databases dir: {e}")))?;
        let path = dir.join(format!("{experiment}_{run_tag}.jsonl"));
        let file = File::create(&path)
            .map_err(|e| MeasureItError::Persistence(format!("could not create {}: {e}", path.display())))?;
        Ok(Self {
            experiment: experiment.to_string(),
            path: Some(path),
            writer: Some(BufWriter::new(file)),
            controlled_names: Vec::new(),
            followed_names: Vec::new(),
        })
    }

    /// The path of the file currently open, if any.
    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    fn write_line(&mut self, value: &serde_json::Value) -> Result<(), MeasureItError> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| MeasureItError::Persistence("store is closed".to_string()))?;
        writeln!(writer, "{value}")
            .map_err(|e| MeasureItError::Persistence(format!("write failed: {e}")))
    }
}

impl PersistenceFacade for JsonLinesStore {
    fn begin_measurement(
        &mut self,
        metadata: &Metadata,
        controlled_names: &[String],
        followed_names: &[String],
    ) -> Result<(), MeasureItError> {
        self.controlled_names = controlled_names.to_vec();
        self.followed_names = followed_names.to_vec();
        let header = json!({
            "record": "metadata",
            "experiment": self.experiment,
            "started_at": chrono::Local::now().to_rfc3339(),
            "metadata": metadata.canonicalize(),
            "controlled_names": self.controlled_names,
            "followed_names": self.followed_names,
        });
        self.write_line(&header)
    }

    fn append(&mut self, setpoints: &[f64], followed: &[f64]) -> Result<(), MeasureItError> {
        let line = json!({
            "record": "row",
            "setpoints": setpoints,
            "followed": followed,
        });
        self.write_line(&line)
    }

    fn finish(&mut self, final_state: SweepState) -> Result<(), MeasureItError> {
        let line = json!({
            "record": "final_state",
            "state": format!("{final_state:?}"),
        });
        self.write_line(&line)
    }

    fn close(&mut self) -> Result<(), MeasureItError> {
        if let Some(mut writer) = self.writer.take() {
            writer
                .flush()
                .map_err(|e| MeasureItError::Persistence(format!("flush failed: {e}")))?;
            info!(experiment = %self.experiment, "dataset closed");
        }
        Ok(())
    }
}

impl RowSink for JsonLinesStore {
    fn on_start(&mut self, controlled_names: &[String], followed_names: &[String]) {
        self.controlled_names = controlled_names.to_vec();
        self.followed_names = followed_names.to_vec();
    }

    fn on_row(&mut self, row: &Row) {
        if let Err(err) = self.append(&row.setpoints, &row.followed) {
            warn!(experiment = %self.experiment, error = %err, "failed to append row");
        }
    }

    fn on_finish(&mut self, final_state: SweepState) {
        if let Err(err) = self.finish(final_state) {
            warn!(experiment = %self.experiment, error = %err, "failed to write final state");
        }
        if let Err(err) = self.close() {
            warn!(experiment = %self.experiment, error = %err, "failed to close dataset");
        }
    }
}

impl Drop for JsonLinesStore {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
