// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Trains one model family and persists the run:
//
//   Step 1: Index the image folder          (Layer 4 - data)
//   Step 2: Save settings + architecture    (Layer 6 - infra)
//   Step 3: Build the model + adapter       (Layer 5 - ml)
//   Step 4: Run the training loop           (Layer 5 - ml)
//   Step 5: Save checkpoint, log and CSV    (Layer 6 - infra)
//
// MobileNet is fed ImageNet-normalised pixels; DETR gets plain
// [0, 1] pixels and normalises through its processor.
//
// Reference: Burn Book §5 (Training)

use anyhow::{Context, Result};
use burn::{module::AutodiffModule, tensor::backend::AutodiffBackend};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::application::ModelScale;
use crate::data::{batch_source::BatchSource, batcher::PetBatcher, dataset::PetImageDataset};
use crate::domain::error::HarnessResult;
use crate::domain::metrics::RunResult;
use crate::domain::traits::{ModelName, SampleSource};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{MetricsRecorder, RunArtifacts},
};
use crate::ml::{
    adapter::{ImageModel, ModelAdapter},
    factory::{detr_adapter, mobilenet_adapter},
    inferencer::input_transform,
    processor::ImageProcessorConfig,
    trainer::{TrainingConfig, TrainingLoop},
};

// ─── Training Configuration ──────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub model:          ModelName,
    pub data_dir:       PathBuf,
    pub checkpoint_dir: PathBuf,
    pub log_dir:        PathBuf,
    pub batch_size:     usize,
    pub epochs:         usize,
    /// Adam learning rate; the model family's default when unset
    pub learning_rate:  Option<f64>,
    pub seed:           Option<u64>,
    pub scale:          ModelScale,
    /// Record file to start from instead of random weights
    pub weights:        Option<PathBuf>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            model:          ModelName::MobileNet,
            data_dir:       PathBuf::from("data/images"),
            checkpoint_dir: PathBuf::from("saved_models"),
            log_dir:        PathBuf::from("logs"),
            batch_size:     8,
            epochs:         10,
            learning_rate:  None,
            seed:           None,
            scale:          ModelScale::Full,
            weights:        None,
        }
    }
}

/// Train an adapter-wrapped model, then persist checkpoint, log and CSV.
pub fn train_and_persist<B, M, S>(
    training: TrainingConfig,
    adapter:  ModelAdapter<B, M>,
    batches:  &mut BatchSource<'_, S, B>,
    recorder: &MetricsRecorder,
) -> HarnessResult<(RunResult, RunArtifacts)>
where
    B: AutodiffBackend,
    M: ImageModel<B> + AutodiffModule<B>,
    S: SampleSource,
{
    tracing::info!("{}: {} trainable parameters", adapter.name(), adapter.num_params());
    let trained   = TrainingLoop::new(training).run(adapter, batches)?;
    let artifacts = recorder.persist::<B, M>(&trained.result, trained.adapter.model())?;
    Ok((trained.result, artifacts))
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute<B: AutodiffBackend>(&self, device: &B::Device) -> Result<RunResult> {
        let cfg = &self.config;

        // ── Step 1: Index the dataset ────────────────────────────────────────
        let dataset = PetImageDataset::open(&cfg.data_dir, input_transform(cfg.model))
            .with_context(|| format!("Cannot load dataset from '{}'", cfg.data_dir.display()))?;
        let (cats, dogs) = dataset.class_counts();
        tracing::info!("Training {} on {} cats and {} dogs", cfg.model, cats, dogs);

        let checkpoints = CheckpointManager::new(&cfg.checkpoint_dir);
        checkpoints.save_run_config(cfg)?;
        let name        = cfg.model.as_str();
        let weights     = cfg.weights.as_deref();

        // ── Steps 2-5 per model family ────────────────────────────────────────
        let (result, artifacts) = match cfg.model {
            ModelName::MobileNet => {
                let arch = cfg.scale.mobilenet();
                checkpoints.save_config(name, &arch)?;
                let adapter = mobilenet_adapter::<B>(&arch, device, weights)?;
                self.run(adapter, &dataset, device, checkpoints)?
            }
            ModelName::Detr => {
                let arch = cfg.scale.detr();
                checkpoints.save_config(name, &arch)?;
                let adapter =
                    detr_adapter::<B>(&arch, &ImageProcessorConfig::new(), device, weights)?;
                self.run(adapter, &dataset, device, checkpoints)?
            }
        };

        tracing::info!("Checkpoint written to '{}'", artifacts.checkpoint.display());
        Ok(result)
    }

    fn run<B, M>(
        &self,
        adapter:     ModelAdapter<B, M>,
        dataset:     &PetImageDataset,
        device:      &B::Device,
        checkpoints: CheckpointManager,
    ) -> Result<(RunResult, RunArtifacts)>
    where
        B: AutodiffBackend,
        M: ImageModel<B> + AutodiffModule<B>,
    {
        let cfg = &self.config;
        let mut batches = BatchSource::new(
            dataset,
            cfg.batch_size,
            PetBatcher::<B>::new(device.clone()),
            cfg.seed,
        )?;
        let recorder = MetricsRecorder::new(checkpoints, &cfg.log_dir);
        let training = TrainingConfig::new(cfg.epochs).with_learning_rate(cfg.learning_rate);

        Ok(train_and_persist(training, adapter, &mut batches, &recorder)?)
    }
}
