// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights and architecture configs.
//
// What gets saved per model name:
//   1. <Model>_checkpoint.mpk.gz — all learned parameters
//   2. <Model>_config.json       — architecture config
//
// plus one run_config.json per directory recording the run
// settings (data folder, epochs, batch size, seed, ...) of the
// last training command.
//
// The config is needed to rebuild a model of the right shape
// before the weights can be loaded into it.
//
// Recorder: NamedMpkGzFileRecorder<FullPrecisionSettings>
//   - Serialises the record to named MessagePack
//   - Compresses with gzip
//   - Keeps f32 weights as f32, so a reloaded model produces
//     exactly the same outputs as the one that was saved
//
// Saving overwrites whatever was there for the same name.
//
// File layout:
//   saved_models/
//     MobileNet_checkpoint.mpk.gz
//     MobileNet_config.json
//     DETR_checkpoint.mpk.gz
//     DETR_config.json
//     run_config.json
//
// Reference: Burn Book §5 (Records and Checkpointing)

use burn::{
    config::Config,
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::error::{HarnessError, HarnessResult};

pub type CheckpointRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

/// Extension the recorder appends to every checkpoint path.
pub const CHECKPOINT_EXTENSION: &str = "mpk.gz";

/// Manages checkpoint and config files under one directory.
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Nothing is created until the first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Checkpoint path without extension; the recorder appends it.
    fn checkpoint_stem(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}_checkpoint"))
    }

    /// Full checkpoint file path, extension included.
    pub fn checkpoint_path(&self, name: &str) -> PathBuf {
        self.checkpoint_stem(name).with_extension(CHECKPOINT_EXTENSION)
    }

    pub fn config_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}_config.json"))
    }

    pub fn has_checkpoint(&self, name: &str) -> bool {
        self.checkpoint_path(name).is_file()
    }

    fn ensure_dir(&self) -> HarnessResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| HarnessError::persistence(&self.dir, e))
    }

    /// Save model weights, replacing any previous checkpoint of `name`.
    pub fn save_model<B: Backend, M: Module<B>>(&self, name: &str, model: &M) -> HarnessResult<PathBuf> {
        self.ensure_dir()?;
        let stem = self.checkpoint_stem(name);

        CheckpointRecorder::new()
            .record(model.clone().into_record(), stem.clone())
            .map_err(|e| HarnessError::persistence(&stem, e))?;

        let path = self.checkpoint_path(name);
        tracing::debug!("Saved checkpoint '{}'", path.display());
        Ok(path)
    }

    /// Load the checkpoint of `name` into `model`.
    ///
    /// `model` must have the architecture the checkpoint was saved from.
    pub fn load_model<B: Backend, M: Module<B>>(
        &self,
        name:   &str,
        model:  M,
        device: &B::Device,
    ) -> HarnessResult<M> {
        let path = self.checkpoint_stem(name);
        tracing::info!("Loading {} checkpoint from '{}'", name, self.dir.display());
        load_record(&path, model, device)
    }

    pub fn save_config<C: Config>(&self, name: &str, config: &C) -> HarnessResult<PathBuf> {
        self.ensure_dir()?;
        let path = self.config_path(name);
        config
            .save(&path)
            .map_err(|e| HarnessError::persistence(&path, e))?;
        tracing::debug!("Saved {} config to '{}'", name, path.display());
        Ok(path)
    }

    pub fn load_config<C: Config>(&self, name: &str) -> HarnessResult<C> {
        let path = self.config_path(name);
        C::load(&path).map_err(|e| HarnessError::persistence(&path, e))
    }

    pub fn run_config_path(&self) -> PathBuf {
        self.dir.join("run_config.json")
    }

    /// Write the settings of the current run as pretty JSON.
    pub fn save_run_config<T: Serialize>(&self, run: &T) -> HarnessResult<PathBuf> {
        self.ensure_dir()?;
        let path = self.run_config_path();
        let json = serde_json::to_string_pretty(run)
            .map_err(|e| HarnessError::persistence(&path, e))?;
        fs::write(&path, json).map_err(|e| HarnessError::persistence(&path, e))?;
        tracing::debug!("Saved run settings to '{}'", path.display());
        Ok(path)
    }
}

/// Load an arbitrary record file (e.g. externally supplied weights)
/// into `model`. The extension may be given or left off.
pub fn load_record<B: Backend, M: Module<B>>(
    path:   &Path,
    model:  M,
    device: &B::Device,
) -> HarnessResult<M> {
    let record = CheckpointRecorder::new()
        .load(record_stem(path), device)
        .map_err(|e| HarnessError::persistence(path, e))?;
    Ok(model.load_record(record))
}

/// `x.mpk.gz` → `x`; anything else is returned as is.
fn record_stem(path: &Path) -> PathBuf {
    let suffix = format!(".{CHECKPOINT_EXTENSION}");
    match path.to_str().and_then(|p| p.strip_suffix(suffix.as_str())) {
        Some(stem) => PathBuf::from(stem),
        None       => path.to_path_buf(),
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::mobilenet::{MobileNet, MobileNetConfig};
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_paths_follow_model_name() {
        let ckpt = CheckpointManager::new("saved_models");
        assert_eq!(
            ckpt.checkpoint_path("MobileNet"),
            PathBuf::from("saved_models/MobileNet_checkpoint.mpk.gz")
        );
        assert_eq!(
            ckpt.config_path("DETR"),
            PathBuf::from("saved_models/DETR_config.json")
        );
    }

    #[test]
    fn test_save_and_load_gives_identical_outputs() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path().join("nested/models"));
        let device = Default::default();
        let config = MobileNetConfig::tiny();

        let original: MobileNet<TestBackend> = config.init(&device);
        let path = ckpt.save_model::<TestBackend, _>("MobileNet", &original).unwrap();
        assert!(path.is_file());
        assert!(ckpt.has_checkpoint("MobileNet"));

        let fresh: MobileNet<TestBackend> = config.init(&device);
        let restored = ckpt.load_model::<TestBackend, _>("MobileNet", fresh, &device).unwrap();

        let images = Tensor::<TestBackend, 4>::random(
            [2, 3, 32, 32],
            burn::tensor::Distribution::Uniform(0.0, 1.0),
            &device,
        );
        let a = original.forward(images.clone()).into_data();
        let b = restored.forward(images).into_data();
        a.assert_eq(&b, true);
    }

    #[test]
    fn test_record_stem_strips_checkpoint_extension() {
        assert_eq!(
            record_stem(Path::new("w/MobileNet_checkpoint.mpk.gz")),
            PathBuf::from("w/MobileNet_checkpoint")
        );
        assert_eq!(record_stem(Path::new("w/weights")), PathBuf::from("w/weights"));
    }

    #[test]
    fn test_config_round_trip() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());

        ckpt.save_config("MobileNet", &MobileNetConfig::tiny()).unwrap();
        let loaded: MobileNetConfig = ckpt.load_config("MobileNet").unwrap();
        assert_eq!(loaded.num_stages, 3);
        assert_eq!(loaded.last_channels, 32);
    }

    #[test]
    fn test_missing_checkpoint_is_persistence_error() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());
        let model: MobileNet<TestBackend> = MobileNetConfig::tiny().init(&Default::default());

        let err = ckpt.load_model::<TestBackend, _>("MobileNet", model, &Default::default()).unwrap_err();
        assert!(matches!(err, HarnessError::Persistence { .. }));
        assert!(!ckpt.has_checkpoint("MobileNet"));
    }

    #[test]
    fn test_save_overwrites_previous_checkpoint() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path());
        let device = Default::default();
        let config = MobileNetConfig::tiny();

        let first: MobileNet<TestBackend> = config.init(&device);
        let second: MobileNet<TestBackend> = config.init(&device);
        ckpt.save_model::<TestBackend, _>("MobileNet", &first).unwrap();
        ckpt.save_model::<TestBackend, _>("MobileNet", &second).unwrap();

        let restored = ckpt
            .load_model::<TestBackend, _>("MobileNet", config.init(&device), &device)
            .unwrap();
        let images = Tensor::<TestBackend, 4>::ones([1, 3, 32, 32], &device);
        second
            .forward(images.clone())
            .into_data()
            .assert_eq(&restored.forward(images).into_data(), true);
    }

    #[test]
    fn test_run_config_is_pretty_json() {
        #[derive(serde::Serialize)]
        struct Settings {
            epochs:     usize,
            batch_size: usize,
        }

        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path().join("runs"));
        let path = ckpt
            .save_run_config(&Settings { epochs: 3, batch_size: 8 })
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["epochs"], 3);
        assert_eq!(value["batch_size"], 8);
    }
}
