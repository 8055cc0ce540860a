// ============================================================
// Layer 3 — Epoch Metrics and Run Results
// ============================================================
// What one training run produces, in plain Rust:
//
//   EpochMetric  — one row per completed epoch
//                  (index, mean loss, accuracy %, wall time)
//   RunResult    — the ordered rows plus total / average time
//                  and the model name
//
// A RunResult is built once, when a run completes, and is never
// mutated afterwards. The Metrics Recorder turns it into files
// and the Comparison Driver turns it into a plot.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Metrics for one completed epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetric {
    /// Epoch number, starting at 1
    pub epoch: usize,

    /// Running loss divided by the number of batches in the pass
    pub mean_loss: f64,

    /// 100 × correct / samples seen, always within [0, 100]
    pub accuracy: f64,

    /// Wall-clock time spent on this epoch
    pub duration: Duration,
}

impl EpochMetric {
    pub fn new(epoch: usize, mean_loss: f64, accuracy: f64, duration: Duration) -> Self {
        Self { epoch, mean_loss, accuracy, duration }
    }

    /// Build a metric from raw epoch counters.
    ///
    /// `loss_sum` is the sum of per-batch mean losses, so the epoch loss is
    /// averaged over batches, while accuracy is averaged over samples.
    pub fn from_counters(
        epoch:    usize,
        loss_sum: f64,
        batches:  usize,
        correct:  usize,
        seen:     usize,
        duration: Duration,
    ) -> Self {
        let mean_loss = if batches > 0 { loss_sum / batches as f64 } else { 0.0 };
        let accuracy  = if seen > 0 { 100.0 * correct as f64 / seen as f64 } else { 0.0 };
        Self::new(epoch, mean_loss, accuracy.clamp(0.0, 100.0), duration)
    }
}

/// Everything one Training Loop Engine invocation produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub model_name:     String,
    pub epochs:         Vec<EpochMetric>,
    pub total_duration: Duration,
}

impl RunResult {
    pub fn new(model_name: impl Into<String>, epochs: Vec<EpochMetric>, total_duration: Duration) -> Self {
        Self {
            model_name: model_name.into(),
            epochs,
            total_duration,
        }
    }

    /// Total time divided by the number of completed epochs.
    pub fn average_epoch_duration(&self) -> Duration {
        match u32::try_from(self.epochs.len()) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(n) => self.total_duration / n,
        }
    }

    pub fn losses(&self) -> Vec<f64> {
        self.epochs.iter().map(|m| m.mean_loss).collect()
    }

    pub fn accuracies(&self) -> Vec<f64> {
        self.epochs.iter().map(|m| m.accuracy).collect()
    }

    pub fn final_metric(&self) -> Option<&EpochMetric> {
        self.epochs.last()
    }
}
