// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records training metrics to a CSV file after each epoch, one
// file per task inside the model folder:
//
//   models/digitization_metrics.csv
//   models/dx_metrics.csv
//
// Metrics recorded per epoch:
//   - epoch:        the epoch number (1, 2, 3, ...)
//   - train_loss:   mean loss over all training batches
//   - val_loss:     mean loss on the held-out tail (empty if none)
//   - val_accuracy: categorical accuracy on the held-out tail
//                   (dx only; empty otherwise)
//
// Example CSV output:
//   epoch,train_loss,val_loss,val_accuracy
//   1,0.693100,0.690200,0.500000
//   2,0.688400,0.687900,0.550000
//
// Rows are appended, so repeated runs into the same folder keep
// their history.

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

const CSV_HEADER: &str = "epoch,train_loss,val_loss,val_accuracy";

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Mean loss over all training batches
    pub train_loss: f64,

    /// Mean loss on the validation set, when there is one
    pub val_loss: Option<f64>,

    /// Fraction of validation samples whose top class matches the
    /// target's top class. Range: [0.0, 1.0]
    pub val_accuracy: Option<f64>,
}

impl EpochMetrics {
    pub fn new(
        epoch:        usize,
        train_loss:   f64,
        val_loss:     Option<f64>,
        val_accuracy: Option<f64>,
    ) -> Self {
        Self { epoch, train_loss, val_loss, val_accuracy }
    }

    fn to_csv_row(&self) -> String {
        let opt = |v: Option<f64>| v.map(|x| format!("{x:.6}")).unwrap_or_default();
        format!(
            "{},{:.6},{},{}",
            self.epoch,
            self.train_loss,
            opt(self.val_loss),
            opt(self.val_accuracy),
        )
    }
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    /// Full path to the CSV file
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create a logger writing `<dir>/<task>_metrics.csv`.
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: &Path, task: &str) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create model folder '{}'", dir.display()))?;

        let csv_path = dir.join(format!("{task}_metrics.csv"));

        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "{CSV_HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(f, "{}", m.to_csv_row())?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:?}",
            m.epoch,
            m.train_loss,
            m.val_loss,
        );

        Ok(())
    }

    /// Return the path to the metrics CSV file
    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}
