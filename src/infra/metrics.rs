// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records training metrics to a CSV file after each epoch.
// The CSV stands in for rendered learning curves: any plotting
// tool can draw loss and accuracy from it.
//
// Metrics recorded per epoch:
//   - epoch:      the epoch number (1, 2, 3, ...)
//   - train_loss: mean per-batch cross-entropy on the training set
//   - train_acc:  % of training samples classified correctly
//   - val_acc:    % of validation samples classified correctly
//   - lr:         learning rate used during the epoch
//
// Output file: artifacts/metrics.csv
//
// Example CSV output:
//   epoch,train_loss,train_acc,val_acc,lr
//   1,1.204311,55.120000,71.400000,0.001
//   2,0.731050,73.981000,80.233000,0.001
//
// Each run starts a fresh file; rows from an earlier run in the
// same directory are discarded.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};
use serde::{Deserialize, Serialize};

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Mean per-batch cross-entropy loss.
    /// Random initialisation gives ~ln(num_classes)
    pub train_loss: f64,

    /// Training accuracy in percent, measured with dropout active
    pub train_acc: f64,

    /// Validation accuracy in percent, drives the LR scheduler
    pub val_acc: f64,

    pub lr: f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, train_acc: f64, val_acc: f64, lr: f64) -> Self {
        Self { epoch, train_loss, train_acc, val_acc, lr }
    }
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Truncate `{dir}/metrics.csv` and write the header.
    pub fn new(dir: impl Into<String>) -> Result<Self> {
        let dir = PathBuf::from(dir.into());
        fs::create_dir_all(&dir)?;

        let csv_path = dir.join("metrics.csv");
        let mut f = fs::File::create(&csv_path)
            .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
        writeln!(f, "epoch,train_loss,train_acc,val_acc,lr")?;
        tracing::debug!("Started metrics CSV: '{}'", csv_path.display());

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{}",
            m.epoch,
            m.train_loss,
            m.train_acc,
            m.val_acc,
            m.lr,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_acc={:.2}",
            m.epoch,
            m.train_loss,
            m.val_acc,
        );

        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}
