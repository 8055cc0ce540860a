// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the five subcommands and their flags:
//
//   compare          — train both models, plot the curves
//   train            — train one model
//   test             — classify one batch with a saved model
//   inspect-dataset  — show what the loader produces
//   predict          — classify one image file
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, enums, paths)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::application::{
    compare_use_case::{CompareConfig, ComparisonMode},
    evaluate_use_case::EvaluateConfig,
    inspect_use_case::InspectConfig,
    train_use_case::TrainConfig,
    ModelScale,
};
use crate::data::transform::ImageTransform;
use crate::domain::traits::ModelName;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train MobileNet and DETR on the same images and plot both runs
    Compare(CompareArgs),

    /// Train a single model
    Train(TrainArgs),

    /// Classify one batch with a saved model and show the hits
    Test(TestArgs),

    /// Print the shape and labels of the first batch
    InspectDataset(InspectArgs),

    /// Classify a single image
    Predict(PredictArgs),
}

// ─── Value enums ──────────────────────────────────────────────────────────────

/// Where tensors live
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeviceChoice {
    /// NdArray backend on the CPU
    #[default]
    Cpu,
    /// Wgpu backend on the default GPU adapter
    Wgpu,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeArg {
    /// Normalised images; DETR's processor only pads
    Classification,
    /// Plain images; DETR's processor normalises
    Detection,
}

impl From<ModeArg> for ComparisonMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Classification => ComparisonMode::Classification,
            ModeArg::Detection      => ComparisonMode::Detection,
        }
    }
}

fn scale(compact: bool) -> ModelScale {
    if compact { ModelScale::Compact } else { ModelScale::Full }
}

// ─── compare ──────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Flat folder of cat_*.jpg / dog_*.jpg files
    #[arg(long, default_value = "data/images")]
    pub data_dir: PathBuf,

    /// Root under which saved_models*/, logs*/ and plots*/ are created
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = ModeArg::Classification)]
    pub mode: ModeArg,

    /// Number of full passes through the images, per model
    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    #[arg(long, default_value_t = 8)]
    pub batch_size: usize,

    /// Fix the shuffle order
    #[arg(long)]
    pub seed: Option<u64>,

    /// Use the small architectures (quick CPU runs)
    #[arg(long)]
    pub compact: bool,

    /// Record file with MobileNet weights to start from
    #[arg(long)]
    pub mobilenet_weights: Option<PathBuf>,

    /// Record file with DETR weights to start from
    #[arg(long)]
    pub detr_weights: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = DeviceChoice::Cpu)]
    pub device: DeviceChoice,
}

/// Convert CLI CompareArgs into the application-layer CompareConfig.
/// The application layer never sees clap types.
impl From<CompareArgs> for CompareConfig {
    fn from(a: CompareArgs) -> Self {
        CompareConfig {
            data_dir:          a.data_dir,
            output_dir:        a.output_dir,
            mode:              a.mode.into(),
            epochs:            a.epochs,
            batch_size:        a.batch_size,
            seed:              a.seed,
            scale:             scale(a.compact),
            mobilenet_weights: a.mobilenet_weights,
            detr_weights:      a.detr_weights,
        }
    }
}

// ─── train ────────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// mobilenet or detr
    #[arg(long)]
    pub model: ModelName,

    #[arg(long, default_value = "data/images")]
    pub data_dir: PathBuf,

    #[arg(long, default_value = "saved_models")]
    pub checkpoint_dir: PathBuf,

    #[arg(long, default_value = "logs")]
    pub log_dir: PathBuf,

    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    #[arg(long, default_value_t = 8)]
    pub batch_size: usize,

    /// Adam learning rate (default: 1e-3 for MobileNet, 1e-4 for DETR)
    #[arg(long)]
    pub lr: Option<f64>,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Use the small architecture (quick CPU runs)
    #[arg(long)]
    pub compact: bool,

    /// Record file with weights to start from
    #[arg(long)]
    pub weights: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = DeviceChoice::Cpu)]
    pub device: DeviceChoice,
}

impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            model:          a.model,
            data_dir:       a.data_dir,
            checkpoint_dir: a.checkpoint_dir,
            log_dir:        a.log_dir,
            batch_size:     a.batch_size,
            epochs:         a.epochs,
            learning_rate:  a.lr,
            seed:           a.seed,
            scale:          scale(a.compact),
            weights:        a.weights,
        }
    }
}

// ─── test ─────────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct TestArgs {
    /// mobilenet or detr
    #[arg(long)]
    pub model: ModelName,

    #[arg(long, default_value = "data/images")]
    pub data_dir: PathBuf,

    /// Folder holding <Model>_checkpoint.mpk.gz and <Model>_config.json
    #[arg(long, default_value = "saved_models")]
    pub checkpoint_dir: PathBuf,

    #[arg(long, default_value_t = 4)]
    pub batch_size: usize,

    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, value_enum, default_value_t = DeviceChoice::Cpu)]
    pub device: DeviceChoice,
}

impl From<TestArgs> for EvaluateConfig {
    fn from(a: TestArgs) -> Self {
        EvaluateConfig {
            model:          a.model,
            data_dir:       a.data_dir,
            checkpoint_dir: a.checkpoint_dir,
            batch_size:     a.batch_size,
            seed:           a.seed,
        }
    }
}

// ─── inspect-dataset ──────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct InspectArgs {
    #[arg(long, default_value = "data/images")]
    pub data_dir: PathBuf,

    #[arg(long, default_value_t = 4)]
    pub batch_size: usize,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Skip ImageNet normalisation (what DETR is fed)
    #[arg(long)]
    pub raw: bool,

    #[arg(long, value_enum, default_value_t = DeviceChoice::Cpu)]
    pub device: DeviceChoice,
}

impl From<InspectArgs> for InspectConfig {
    fn from(a: InspectArgs) -> Self {
        InspectConfig {
            data_dir:   a.data_dir,
            batch_size: a.batch_size,
            seed:       a.seed,
            transform:  if a.raw {
                ImageTransform::detection()
            } else {
                ImageTransform::classification()
            },
        }
    }
}

// ─── predict ──────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct PredictArgs {
    /// mobilenet or detr
    #[arg(long)]
    pub model: ModelName,

    /// The image to classify
    #[arg(long)]
    pub image: PathBuf,

    #[arg(long, default_value = "saved_models")]
    pub checkpoint_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = DeviceChoice::Cpu)]
    pub device: DeviceChoice,
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_compare_defaults() {
        let cli = Cli::try_parse_from(["pet-compare", "compare"]).unwrap();
        let Commands::Compare(args) = cli.command else {
            panic!("expected compare");
        };
        let config: CompareConfig = args.into();
        assert_eq!(config.epochs, 10);
        assert_eq!(config.batch_size, 8);
        assert_eq!(config.mode, ComparisonMode::Classification);
        assert_eq!(config.scale, ModelScale::Full);
        assert_eq!(config.data_dir, PathBuf::from("data/images"));
    }

    #[test]
    fn test_train_flags_reach_the_config() {
        let cli = Cli::try_parse_from([
            "pet-compare", "train", "--model", "detr", "--epochs", "3", "--lr", "0.01",
            "--compact", "--device", "wgpu",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else {
            panic!("expected train");
        };
        assert_eq!(args.device, DeviceChoice::Wgpu);
        let config: TrainConfig = args.into();
        assert_eq!(config.model, ModelName::Detr);
        assert_eq!(config.epochs, 3);
        assert_eq!(config.learning_rate, Some(0.01));
        assert_eq!(config.scale, ModelScale::Compact);
    }

    #[test]
    fn test_inspect_uses_batch_of_four() {
        let cli = Cli::try_parse_from(["pet-compare", "inspect-dataset", "--raw"]).unwrap();
        let Commands::InspectDataset(args) = cli.command else {
            panic!("expected inspect-dataset");
        };
        let config: InspectConfig = args.into();
        assert_eq!(config.batch_size, 4);
        assert!(config.transform.normalize.is_none());
    }

    #[test]
    fn test_predict_requires_an_image() {
        assert!(Cli::try_parse_from(["pet-compare", "predict", "--model", "mobilenet"]).is_err());
    }
}
