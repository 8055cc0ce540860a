// ============================================================
// Layer 2 — InspectUseCase
// ============================================================
// Smoke test for the data pipeline: index the folder, pull the
// first shuffled batch and report what a model would receive.

use anyhow::{Context, Result};
use burn::prelude::*;
use std::path::PathBuf;

use crate::data::{
    batch_source::BatchSource, batcher::PetBatcher, dataset::PetImageDataset,
    transform::ImageTransform,
};
use crate::domain::label::PetLabel;

#[derive(Debug, Clone)]
pub struct InspectConfig {
    pub data_dir:   PathBuf,
    pub batch_size: usize,
    pub seed:       Option<u64>,
    pub transform:  ImageTransform,
}

impl Default for InspectConfig {
    fn default() -> Self {
        Self {
            data_dir:   PathBuf::from("data/images"),
            batch_size: 4,
            seed:       None,
            transform:  ImageTransform::classification(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSummary {
    pub files:       usize,
    pub cats:        usize,
    pub dogs:        usize,
    pub batches:     usize,
    /// [batch, channels, height, width] of the first batch
    pub image_shape: [usize; 4],
    pub labels:      Vec<PetLabel>,
}

pub struct InspectUseCase {
    config: InspectConfig,
}

impl InspectUseCase {
    pub fn new(config: InspectConfig) -> Self {
        Self { config }
    }

    pub fn execute<B: Backend>(&self, device: &B::Device) -> Result<DatasetSummary> {
        let cfg = &self.config;

        let dataset = PetImageDataset::open(&cfg.data_dir, cfg.transform)
            .with_context(|| format!("Cannot load dataset from '{}'", cfg.data_dir.display()))?;
        let (cats, dogs) = dataset.class_counts();

        let mut batches = BatchSource::new(
            &dataset,
            cfg.batch_size,
            PetBatcher::<B>::new(device.clone()),
            cfg.seed,
        )?;
        let files = batches.sample_count();
        let count = batches.batches_per_epoch();
        let first = batches
            .epoch()
            .next()
            .context("Dataset produced no batch")??;

        let labels = first
            .labels
            .into_data()
            .iter::<i64>()
            .map(|i| PetLabel::from_class_index(i as usize))
            .collect();

        Ok(DatasetSummary {
            files,
            cats,
            dogs,
            batches:     count,
            image_shape: first.images.dims(),
            labels,
        })
    }
}
