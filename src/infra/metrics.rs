// ============================================================
// Layer 6 — Metrics Recorder
// ============================================================
// Turns a finished RunResult (plus the trained model) into
// files on disk:
//
//   <checkpoint_dir>/<Model>_checkpoint.mpk.gz   model weights
//   <log_dir>/<Model>_log.txt                    human-readable log
//   <log_dir>/<Model>_metrics.csv                one row per epoch
//
// Log format (one line per epoch, then two summary lines):
//
//   Loss: 0.6931, Accuracy: 50
//   Loss: 0.5123, Accuracy: 75
//   Total Training Time: 12.34 seconds
//   Average Time per Epoch: 6.17 seconds
//
// CSV format:
//   epoch,loss,accuracy,seconds
//   1,0.693100,50.000000,6.170000
//
// Every file is written whole and replaces an earlier file of
// the same name. The architecture config is saved by whoever
// builds the model, through the same CheckpointManager.
//
// Reference: Rust Book §12 (I/O and File Handling)

use burn::prelude::*;
use std::{
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
};

use crate::domain::error::{HarnessError, HarnessResult};
use crate::domain::metrics::RunResult;
use crate::infra::checkpoint::CheckpointManager;

/// Paths written for one persisted run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunArtifacts {
    pub checkpoint: PathBuf,
    pub log:        PathBuf,
    pub csv:        PathBuf,
}

pub struct MetricsRecorder {
    checkpoints: CheckpointManager,
    log_dir:     PathBuf,
}

impl MetricsRecorder {
    pub fn new(checkpoints: CheckpointManager, log_dir: impl Into<PathBuf>) -> Self {
        Self { checkpoints, log_dir: log_dir.into() }
    }

    #[cfg(test)]
    pub fn checkpoints(&self) -> &CheckpointManager {
        &self.checkpoints
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn log_path(&self, name: &str) -> PathBuf {
        self.log_dir.join(format!("{name}_log.txt"))
    }

    pub fn csv_path(&self, name: &str) -> PathBuf {
        self.log_dir.join(format!("{name}_metrics.csv"))
    }

    /// Write checkpoint, log and CSV for a completed run.
    pub fn persist<B: Backend, M: Module<B>>(
        &self,
        run:   &RunResult,
        model: &M,
    ) -> HarnessResult<RunArtifacts> {
        let name = run.model_name.as_str();

        let checkpoint = self.checkpoints.save_model::<B, M>(name, model)?;
        let log = self.write(self.log_path(name), &render_log(run))?;
        let csv = self.write(self.csv_path(name), &render_csv(run))?;

        tracing::info!(
            "Saved {} run: checkpoint '{}', log '{}'",
            name,
            checkpoint.display(),
            log.display()
        );
        Ok(RunArtifacts { checkpoint, log, csv })
    }

    fn write(&self, path: PathBuf, contents: &str) -> HarnessResult<PathBuf> {
        fs::create_dir_all(&self.log_dir)
            .map_err(|e| HarnessError::persistence(&self.log_dir, e))?;
        fs::write(&path, contents).map_err(|e| HarnessError::persistence(&path, e))?;
        tracing::debug!("Wrote '{}'", path.display());
        Ok(path)
    }
}

/// Text log: one `Loss: …, Accuracy: …` line per epoch, then the totals.
pub fn render_log(run: &RunResult) -> String {
    let mut out = String::new();
    for m in &run.epochs {
        let _ = writeln!(out, "Loss: {:?}, Accuracy: {:?}", m.mean_loss, m.accuracy);
    }
    let _ = writeln!(
        out,
        "Total Training Time: {:.2} seconds",
        run.total_duration.as_secs_f64()
    );
    let _ = writeln!(
        out,
        "Average Time per Epoch: {:.2} seconds",
        run.average_epoch_duration().as_secs_f64()
    );
    out
}

pub fn render_csv(run: &RunResult) -> String {
    let mut out = String::from("epoch,loss,accuracy,seconds\n");
    for m in &run.epochs {
        let _ = writeln!(
            out,
            "{},{:.6},{:.6},{:.6}",
            m.epoch,
            m.mean_loss,
            m.accuracy,
            m.duration.as_secs_f64()
        );
    }
    out
}
