// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Single-image prediction in three steps, the way a GUI would
// call it:
//
//   load_model(name)        → rebuild the architecture from its
//                             saved config, load saved weights
//   preprocess(path, name)  → decode + resize + the model's own
//                             input preparation
//   predict(model, input)   → argmax over the two classes
//                             → Cat or Dog
//
// Missing config or checkpoint is not fatal: the model falls
// back to defaults / fresh weights and a warning is logged.
use burn::{prelude::*, tensor::TensorData};
use std::path::{Path, PathBuf};

use crate::data::transform::ImageTransform;
use crate::domain::error::{HarnessError, HarnessResult};
use crate::domain::label::PetLabel;
use crate::domain::sample::CHANNELS;
use crate::domain::traits::{AdapterKind, ModelName};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::adapter::ModelInput;
use crate::ml::detr::DetrConfig;
use crate::ml::factory::{detr_adapter, mobilenet_adapter, DetrAdapter, MobileNetAdapter};
use crate::ml::mobilenet::MobileNetConfig;
use crate::ml::processor::ImageProcessorConfig;

/// A model restored for inference, tagged by family.
pub enum LoadedModel<B: Backend> {
    MobileNet(MobileNetAdapter<B>),
    Detr(DetrAdapter<B>),
}

impl<B: Backend> LoadedModel<B> {
    pub fn name(&self) -> ModelName {
        match self {
            LoadedModel::MobileNet(_) => ModelName::MobileNet,
            LoadedModel::Detr(_)      => ModelName::Detr,
        }
    }

    /// (B, 2) logits for already prepared input.
    pub fn logits(&self, input: ModelInput<B>) -> HarnessResult<Tensor<B, 2>> {
        match self {
            LoadedModel::MobileNet(adapter) => adapter.forward_prepared(input),
            LoadedModel::Detr(adapter)      => adapter.forward_prepared(input),
        }
    }

    /// Predicted label for every image of a raw batch.
    pub fn classify(&self, images: Tensor<B, 4>) -> HarnessResult<Vec<PetLabel>> {
        let logits = match self {
            LoadedModel::MobileNet(adapter) => adapter.forward(images)?,
            LoadedModel::Detr(adapter)      => adapter.forward(images)?,
        };
        Ok(to_labels(logits))
    }
}

/// The dataset transform a model family is fed with outside of
/// comparison runs.
pub fn input_transform(name: ModelName) -> ImageTransform {
    match name {
        ModelName::MobileNet => ImageTransform::classification(),
        ModelName::Detr      => ImageTransform::detection(),
    }
}

pub fn load_model<B: Backend>(
    name:        ModelName,
    checkpoints: &CheckpointManager,
    device:      &B::Device,
) -> HarnessResult<LoadedModel<B>> {
    let weights = saved_weights(name, checkpoints);
    let weights = weights.as_deref();

    let model = match name {
        ModelName::MobileNet => {
            let config = load_config_or(name, checkpoints, MobileNetConfig::new)?;
            LoadedModel::MobileNet(mobilenet_adapter::<B>(&config, device, weights)?)
        }
        ModelName::Detr => {
            let config = load_config_or(name, checkpoints, DetrConfig::new)?;
            let processor = ImageProcessorConfig::new();
            LoadedModel::Detr(detr_adapter::<B>(&config, &processor, device, weights)?)
        }
    };
    Ok(model)
}

fn load_config_or<C: Config>(
    name:        ModelName,
    checkpoints: &CheckpointManager,
    default:     impl FnOnce() -> C,
) -> HarnessResult<C> {
    if checkpoints.config_path(name.as_str()).is_file() {
        checkpoints.load_config(name.as_str())
    } else {
        tracing::warn!("No saved {} config; using the default architecture", name);
        Ok(default())
    }
}

fn saved_weights(name: ModelName, checkpoints: &CheckpointManager) -> Option<PathBuf> {
    if checkpoints.has_checkpoint(name.as_str()) {
        Some(checkpoints.checkpoint_path(name.as_str()))
    } else {
        tracing::warn!(
            "No {} checkpoint in '{}'; predicting with untrained weights",
            name,
            checkpoints.dir().display()
        );
        None
    }
}

pub fn preprocess<B: Backend>(
    image_path: &Path,
    name:       ModelName,
    device:     &B::Device,
) -> HarnessResult<ModelInput<B>> {
    let transform = input_transform(name);
    let pixels    = transform.load(image_path)?;
    let images    = Tensor::<B, 4>::from_floats(
        TensorData::new(pixels, [1, CHANNELS, transform.size, transform.size]),
        device,
    );

    Ok(match name.adapter_kind() {
        AdapterKind::DirectTensor      => ModelInput::Pixels(images),
        AdapterKind::ProcessorMediated => {
            ModelInput::Processed(ImageProcessorConfig::new().init().process(images))
        }
    })
}

pub fn predict<B: Backend>(
    model: &LoadedModel<B>,
    input: ModelInput<B>,
    name:  ModelName,
) -> HarnessResult<PetLabel> {
    if model.name() != name {
        return Err(HarnessError::AdapterMismatch {
            model:    name.to_string(),
            expected: name.adapter_kind(),
            found:    model.name().adapter_kind(),
        });
    }

    let labels = to_labels(model.logits(input)?);
    let label  = labels.first().copied().ok_or_else(|| HarnessError::ShapeMismatch {
        context:  "prediction".into(),
        expected: vec![1],
        found:    vec![0],
    })?;
    tracing::debug!("{} predicts {}", name, label);
    Ok(label)
}

fn to_labels<B: Backend>(logits: Tensor<B, 2>) -> Vec<PetLabel> {
    logits
        .argmax(1)
        .into_data()
        .iter::<i64>()
        .map(|i| PetLabel::from_class_index(i as usize))
        .collect()
}
