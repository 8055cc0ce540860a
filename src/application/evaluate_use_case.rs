// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Quick sanity check of a saved model: load it the same way
// prediction does, classify one shuffled batch and compare the
// predicted labels with the ones the file names give.
//
//   Step 1: Index the image folder
//   Step 2: Restore the model (config + checkpoint)
//   Step 3: Classify the first batch

use anyhow::{Context, Result};
use burn::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::{batch_source::BatchSource, batcher::PetBatcher, dataset::PetImageDataset};
use crate::domain::label::PetLabel;
use crate::domain::traits::ModelName;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::inferencer::{input_transform, load_model};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateConfig {
    pub model:          ModelName,
    pub data_dir:       PathBuf,
    pub checkpoint_dir: PathBuf,
    pub batch_size:     usize,
    pub seed:           Option<u64>,
}

impl Default for EvaluateConfig {
    fn default() -> Self {
        Self {
            model:          ModelName::MobileNet,
            data_dir:       PathBuf::from("data/images"),
            checkpoint_dir: PathBuf::from("saved_models"),
            batch_size:     4,
            seed:           None,
        }
    }
}

/// Predicted and true labels for one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    pub predicted: Vec<PetLabel>,
    pub actual:    Vec<PetLabel>,
}

impl EvaluationReport {
    /// Percentage of matching labels, 0 for an empty batch.
    pub fn accuracy(&self) -> f64 {
        if self.actual.is_empty() {
            return 0.0;
        }
        let correct = self
            .predicted
            .iter()
            .zip(&self.actual)
            .filter(|(p, a)| p == a)
            .count();
        100.0 * correct as f64 / self.actual.len() as f64
    }
}

pub struct EvaluateUseCase {
    config: EvaluateConfig,
}

impl EvaluateUseCase {
    pub fn new(config: EvaluateConfig) -> Self {
        Self { config }
    }

    pub fn execute<B: Backend>(&self, device: &B::Device) -> Result<EvaluationReport> {
        let cfg = &self.config;

        // ── Step 1: Dataset ──────────────────────────────────────────────────
        let dataset = PetImageDataset::open(&cfg.data_dir, input_transform(cfg.model))
            .with_context(|| format!("Cannot load dataset from '{}'", cfg.data_dir.display()))?;

        // ── Step 2: Model ────────────────────────────────────────────────────
        let checkpoints = CheckpointManager::new(&cfg.checkpoint_dir);
        let model = load_model::<B>(cfg.model, &checkpoints, device)
            .with_context(|| format!("Failed to restore {}", cfg.model))?;

        // ── Step 3: One batch ────────────────────────────────────────────────
        let mut batches = BatchSource::new(
            &dataset,
            cfg.batch_size,
            PetBatcher::<B>::new(device.clone()),
            cfg.seed,
        )?;
        let batch = batches
            .epoch()
            .next()
            .context("Dataset produced no batch")??;

        let actual = batch
            .labels
            .into_data()
            .iter::<i64>()
            .map(|i| PetLabel::from_class_index(i as usize))
            .collect();
        let predicted = model.classify(batch.images)?;

        let report = EvaluationReport { predicted, actual };
        tracing::info!("{} batch accuracy: {:.2}%", cfg.model, report.accuracy());
        Ok(report)
    }
}
