// ============================================================
// Layer 2 — CompareUseCase
// ============================================================
// Trains MobileNet and then DETR on the same images for the
// same number of epochs and draws both learning curves:
//
//   Step 1: Index the image folder          (Layer 4 - data)
//   Step 2: Save settings + both configs    (Layer 6 - infra)
//   Step 3: Build both adapters             (Layer 5 - ml)
//   Step 4: Train + persist MobileNet       (Layer 5 / 6)
//   Step 5: Train + persist DETR            (Layer 5 / 6)
//   Step 6: Render the comparison chart     (Layer 6 - infra)
//
// The runs are sequential and share one BatchSource. A failed
// run stops the comparison: no chart is drawn, and the runs
// that already finished come back inside ComparisonFailure.
//
// Two modes decide what the models see:
//
//   classification — ImageNet-normalised images, DETR's
//                    processor only pads
//   detection      — plain [0, 1] images, DETR's processor
//                    normalises and pads
//
// Reference: Burn Book §5 (Training)

use anyhow::{Context, Result};
use burn::{module::AutodiffModule, tensor::backend::AutodiffBackend};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::application::train_use_case::train_and_persist;
use crate::application::ModelScale;
use crate::data::{
    batch_source::BatchSource, batcher::PetBatcher, dataset::PetImageDataset,
    transform::ImageTransform,
};
use crate::domain::error::HarnessError;
use crate::domain::metrics::RunResult;
use crate::domain::traits::{AdapterKind, ModelName, SampleSource};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{MetricsRecorder, RunArtifacts},
    plot::render_comparison,
};
use crate::ml::{
    adapter::{ImageModel, ModelAdapter},
    factory::{detr_adapter, mobilenet_adapter},
    processor::ImageProcessorConfig,
    trainer::TrainingConfig,
};

// ─── ComparisonMode ───────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ComparisonMode {
    #[default]
    Classification,
    Detection,
}

impl ComparisonMode {
    pub fn transform(self) -> ImageTransform {
        match self {
            ComparisonMode::Classification => ImageTransform::classification(),
            ComparisonMode::Detection      => ImageTransform::detection(),
        }
    }

    /// The images are already normalised in classification mode.
    pub fn processor(self) -> ImageProcessorConfig {
        match self {
            ComparisonMode::Classification => ImageProcessorConfig::passthrough(),
            ComparisonMode::Detection      => ImageProcessorConfig::new(),
        }
    }

    pub fn checkpoint_dir(self) -> &'static str {
        match self {
            ComparisonMode::Classification => "saved_models_classification",
            ComparisonMode::Detection      => "saved_models",
        }
    }

    pub fn log_dir(self) -> &'static str {
        match self {
            ComparisonMode::Classification => "logs_classification",
            ComparisonMode::Detection      => "logs",
        }
    }

    pub fn plot_path(self) -> &'static str {
        match self {
            ComparisonMode::Classification => {
                "plots_classification/model_comparison_classification.png"
            }
            ComparisonMode::Detection => "plots/model_comparison.png",
        }
    }
}

// ─── Comparison Configuration ─────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareConfig {
    pub data_dir:          PathBuf,
    /// Mode-specific artifact folders are created under this root
    pub output_dir:        PathBuf,
    pub mode:              ComparisonMode,
    pub epochs:            usize,
    pub batch_size:        usize,
    pub seed:              Option<u64>,
    pub scale:             ModelScale,
    pub mobilenet_weights: Option<PathBuf>,
    pub detr_weights:      Option<PathBuf>,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            data_dir:          PathBuf::from("data/images"),
            output_dir:        PathBuf::from("."),
            mode:              ComparisonMode::Classification,
            epochs:            10,
            batch_size:        8,
            seed:              None,
            scale:             ModelScale::Full,
            mobilenet_weights: None,
            detr_weights:      None,
        }
    }
}

// ─── Outcome ──────────────────────────────────────────────────────────────────
#[derive(Debug)]
pub struct ComparisonReport {
    /// MobileNet first, then DETR
    pub runs:      Vec<RunResult>,
    pub artifacts: Vec<RunArtifacts>,
    pub plot:      PathBuf,
}

/// A comparison that stopped early. `completed` holds the runs
/// that finished (and were persisted) before `error`.
#[derive(Debug, thiserror::Error)]
#[error("comparison aborted after {} completed run(s): {error}", .completed.len())]
pub struct ComparisonFailure {
    pub completed: Vec<RunResult>,
    #[source]
    pub error:     HarnessError,
}

/// Train `direct` then `mediated` over the same batches and plot both.
pub fn run_comparison<B, S, D, P>(
    epochs:    usize,
    batches:   &mut BatchSource<'_, S, B>,
    direct:    ModelAdapter<B, D>,
    mediated:  ModelAdapter<B, P>,
    recorder:  &MetricsRecorder,
    plot_path: &Path,
) -> Result<ComparisonReport, ComparisonFailure>
where
    B: AutodiffBackend,
    S: SampleSource,
    D: ImageModel<B> + AutodiffModule<B>,
    P: ImageModel<B> + AutodiffModule<B>,
{
    let mut runs      = Vec::with_capacity(2);
    let mut artifacts = Vec::with_capacity(2);

    // Wiring is checked before any training time is spent
    for (name, expected, found) in [
        (direct.name(), AdapterKind::DirectTensor, direct.kind()),
        (mediated.name(), AdapterKind::ProcessorMediated, mediated.kind()),
    ] {
        if expected != found {
            let error = HarnessError::AdapterMismatch { model: name.to_string(), expected, found };
            return Err(ComparisonFailure { completed: runs, error });
        }
    }

    // Per-kind learning rates come from the adapters
    let training = TrainingConfig::new(epochs);

    match train_and_persist(training.clone(), direct, batches, recorder) {
        Ok((run, written)) => {
            runs.push(run);
            artifacts.push(written);
        }
        Err(error) => return Err(ComparisonFailure { completed: runs, error }),
    }

    match train_and_persist(training, mediated, batches, recorder) {
        Ok((run, written)) => {
            runs.push(run);
            artifacts.push(written);
        }
        Err(error) => return Err(ComparisonFailure { completed: runs, error }),
    }

    match render_comparison(&runs, plot_path) {
        Ok(plot)   => Ok(ComparisonReport { runs, artifacts, plot }),
        Err(error) => Err(ComparisonFailure { completed: runs, error }),
    }
}

// ─── CompareUseCase ───────────────────────────────────────────────────────────
pub struct CompareUseCase {
    config: CompareConfig,
}

impl CompareUseCase {
    pub fn new(config: CompareConfig) -> Self {
        Self { config }
    }

    pub fn execute<B: AutodiffBackend>(&self, device: &B::Device) -> Result<ComparisonReport> {
        let cfg  = &self.config;
        let mode = cfg.mode;
        let root = &cfg.output_dir;

        // ── Step 1: Index the dataset ────────────────────────────────────────
        let dataset = PetImageDataset::open(&cfg.data_dir, mode.transform())
            .with_context(|| format!("Cannot load dataset from '{}'", cfg.data_dir.display()))?;
        let (cats, dogs) = dataset.class_counts();
        tracing::info!(
            "Comparing models in {:?} mode on {} images ({} cats, {} dogs)",
            mode,
            SampleSource::len(&dataset),
            cats,
            dogs
        );

        // ── Step 2: Save run settings and architecture configs ───────────────
        let checkpoints = CheckpointManager::new(root.join(mode.checkpoint_dir()));
        checkpoints.save_run_config(cfg)?;
        let mobilenet   = cfg.scale.mobilenet();
        let detr        = cfg.scale.detr();
        checkpoints.save_config(ModelName::MobileNet.as_str(), &mobilenet)?;
        checkpoints.save_config(ModelName::Detr.as_str(), &detr)?;

        // ── Step 3: Build adapters ───────────────────────────────────────────
        let direct = mobilenet_adapter::<B>(&mobilenet, device, cfg.mobilenet_weights.as_deref())
            .context("Failed to build MobileNet")?;
        let mediated = detr_adapter::<B>(
            &detr,
            &mode.processor(),
            device,
            cfg.detr_weights.as_deref(),
        )
        .context("Failed to build DETR")?;

        // ── Steps 4-6: Train both, then plot ─────────────────────────────────
        let mut batches = BatchSource::new(
            &dataset,
            cfg.batch_size,
            PetBatcher::<B>::new(device.clone()),
            cfg.seed,
        )?;
        let recorder = MetricsRecorder::new(checkpoints, root.join(mode.log_dir()));

        let report = run_comparison(
            cfg.epochs,
            &mut batches,
            direct,
            mediated,
            &recorder,
            &root.join(mode.plot_path()),
        )?;

        Ok(report)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::write_pet_folder;
    use crate::ml::mobilenet::MobileNetConfig;
    use crate::ml::test_models::FaultyDetectorConfig;
    use burn::backend::{Autodiff, NdArray};
    use std::fs;

    type TestBackend = Autodiff<NdArray>;

    fn recorder_in(root: &Path) -> MetricsRecorder {
        MetricsRecorder::new(CheckpointManager::new(root.join("saved_models")), root.join("logs"))
    }

    #[test]
    fn test_failing_second_run_keeps_first_result_and_skips_plot() {
        let root = tempfile::tempdir().unwrap();
        let images = root.path().join("images");
        fs::create_dir_all(&images).unwrap();
        write_pet_folder(&images, 3, 3);

        let device  = Default::default();
        let dataset = PetImageDataset::open(&images, ImageTransform::classification()).unwrap();
        let mut batches =
            BatchSource::new(&dataset, 4, PetBatcher::<TestBackend>::new(device), Some(3))
                .unwrap();

        let direct = mobilenet_adapter::<TestBackend>(&MobileNetConfig::tiny(), &device, None)
            .unwrap();
        // Healthy for the batch of 4, three classes for the trailing batch of 2
        let mediated = ModelAdapter::processor_mediated(
            "DETR",
            FaultyDetectorConfig::new().init::<TestBackend>(&device),
            ImageProcessorConfig::passthrough().init(),
        )
        .unwrap();

        let recorder  = recorder_in(root.path());
        let plot_path = root.path().join("plots/model_comparison.png");
        let failure   = run_comparison(1, &mut batches, direct, mediated, &recorder, &plot_path)
            .unwrap_err();

        assert_eq!(failure.completed.len(), 1);
        assert_eq!(failure.completed[0].model_name, "MobileNet");
        assert_eq!(failure.completed[0].epochs.len(), 1);
        match &failure.error {
            HarnessError::TrainingFailure { model, epoch, .. } => {
                assert_eq!(model, "DETR");
                assert_eq!(*epoch, 1);
            }
            other => panic!("expected TrainingFailure, got {other:?}"),
        }

        assert!(!plot_path.exists());
        assert!(recorder.log_path("MobileNet").is_file());
        assert!(!recorder.log_path("DETR").exists());
        assert!(!recorder.checkpoints().has_checkpoint("DETR"));
    }

    #[test]
    fn test_swapped_adapters_fail_before_training() {
        let root = tempfile::tempdir().unwrap();
        let images = root.path().join("images");
        fs::create_dir_all(&images).unwrap();
        write_pet_folder(&images, 2, 2);

        let device  = Default::default();
        let dataset = PetImageDataset::open(&images, ImageTransform::classification()).unwrap();
        let mut batches =
            BatchSource::new(&dataset, 2, PetBatcher::<TestBackend>::new(device), Some(1))
                .unwrap();

        let detector = ModelAdapter::processor_mediated(
            "DETR",
            FaultyDetectorConfig::new().with_healthy_batch(2).init::<TestBackend>(&device),
            ImageProcessorConfig::passthrough().init(),
        )
        .unwrap();
        let classifier = mobilenet_adapter::<TestBackend>(&MobileNetConfig::tiny(), &device, None)
            .unwrap();

        let recorder = recorder_in(root.path());
        let failure  = run_comparison(
            1,
            &mut batches,
            detector,
            classifier,
            &recorder,
            &root.path().join("plot.png"),
        )
        .unwrap_err();

        assert!(failure.completed.is_empty());
        assert!(matches!(failure.error, HarnessError::AdapterMismatch { .. }));
        assert!(!recorder.log_dir().exists());
    }

    #[test]
    fn test_compare_use_case_trains_both_models_in_order() {
        let root = tempfile::tempdir().unwrap();
        let images = root.path().join("images");
        fs::create_dir_all(&images).unwrap();
        write_pet_folder(&images, 4, 4);

        let config = CompareConfig {
            data_dir:   images,
            output_dir: root.path().to_path_buf(),
            mode:       ComparisonMode::Detection,
            epochs:     1,
            batch_size: 4,
            seed:       Some(11),
            scale:      ModelScale::Compact,
            ..CompareConfig::default()
        };
        let checkpoint_dir = root.path().join("saved_models");
        let log_dir        = root.path().join("logs");

        let outcome = CompareUseCase::new(config).execute::<TestBackend>(&Default::default());

        let report = outcome.unwrap();
        assert!(report.plot.is_file());
        assert_eq!(report.plot, root.path().join("plots/model_comparison.png"));
        assert_eq!(report.artifacts.len(), 2);
        let runs = report.runs;

        let names: Vec<&str> = runs.iter().map(|r| r.model_name.as_str()).collect();
        assert_eq!(names, vec!["MobileNet", "DETR"]);
        for run in &runs {
            assert_eq!(run.epochs.len(), 1);
            let lines = fs::read_to_string(log_dir.join(format!("{}_log.txt", run.model_name)))
                .unwrap()
                .lines()
                .count();
            assert_eq!(lines, 3);
        }
        assert!(checkpoint_dir.join("MobileNet_config.json").is_file());
        assert!(checkpoint_dir.join("DETR_checkpoint.mpk.gz").is_file());
    }

    #[test]
    fn test_modes_use_separate_artifact_folders() {
        let c = ComparisonMode::Classification;
        let d = ComparisonMode::Detection;
        assert_ne!(c.checkpoint_dir(), d.checkpoint_dir());
        assert_ne!(c.log_dir(), d.log_dir());
        assert_ne!(c.plot_path(), d.plot_path());
        assert!(c.transform().normalize.is_some());
        assert!(d.transform().normalize.is_none());
        assert!(!c.processor().do_normalize);
        assert!(d.processor().do_normalize);
    }
}
