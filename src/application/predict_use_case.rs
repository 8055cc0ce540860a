// ============================================================
// Layer 2 — Predict Use Case
// ============================================================
// Manual inference on one image at a time:
//   1. Restore the chosen model once (config + checkpoint)
//   2. Preprocess each image the way that model expects
//   3. Return Cat or Dog
//
// A missing checkpoint is not an error here; the model runs
// with fresh weights and a warning is logged.

use anyhow::{Context, Result};
use burn::prelude::*;
use std::path::Path;

use crate::domain::label::PetLabel;
use crate::domain::traits::ModelName;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::inferencer::{load_model, predict, preprocess, LoadedModel};

pub struct PredictUseCase<B: Backend> {
    name:   ModelName,
    model:  LoadedModel<B>,
    device: B::Device,
}

impl<B: Backend> PredictUseCase<B> {
    pub fn new(name: ModelName, checkpoint_dir: &Path, device: B::Device) -> Result<Self> {
        let ckpt  = CheckpointManager::new(checkpoint_dir);
        let model = load_model::<B>(name, &ckpt, &device)
            .with_context(|| format!("Failed to restore {name}"))?;
        Ok(Self { name, model, device })
    }

    pub fn classify(&self, image: &Path) -> Result<PetLabel> {
        let input = preprocess::<B>(image, self.name, &self.device)
            .with_context(|| format!("Cannot read '{}'", image.display()))?;
        let label = predict(&self.model, input, self.name)?;
        tracing::info!("{}: '{}' is a {}", self.name, image.display(), label);
        Ok(label)
    }
}
