// ============================================================
// Layer 5 — Model Factory
// ============================================================
// Builds each model family from its architecture config and
// wraps it in the adapter its contract needs:
//
//   MobileNet → ModelAdapter::direct
//   DETR      → ModelAdapter::processor_mediated (+ processor)
//
// An optional record file replaces the random initial weights
// (e.g. weights pretrained elsewhere). It must have been saved
// from a model with the same config.

use burn::prelude::*;
use std::path::Path;

use crate::domain::error::HarnessResult;
use crate::domain::traits::ModelName;
use crate::infra::checkpoint::load_record;
use crate::ml::adapter::ModelAdapter;
use crate::ml::detr::{Detr, DetrConfig};
use crate::ml::mobilenet::{MobileNet, MobileNetConfig};
use crate::ml::processor::ImageProcessorConfig;

pub type MobileNetAdapter<B> = ModelAdapter<B, MobileNet<B>>;
pub type DetrAdapter<B> = ModelAdapter<B, Detr<B>>;

pub fn mobilenet_adapter<B: Backend>(
    config:  &MobileNetConfig,
    device:  &B::Device,
    weights: Option<&Path>,
) -> HarnessResult<MobileNetAdapter<B>> {
    let mut model = config.init::<B>(device);
    if let Some(path) = weights {
        model = load_record(path, model, device)?;
        tracing::info!("MobileNet weights loaded from '{}'", path.display());
    }
    ModelAdapter::direct(ModelName::MobileNet.as_str(), model)
}

pub fn detr_adapter<B: Backend>(
    config:    &DetrConfig,
    processor: &ImageProcessorConfig,
    device:    &B::Device,
    weights:   Option<&Path>,
) -> HarnessResult<DetrAdapter<B>> {
    let mut model = config.init::<B>(device);
    if let Some(path) = weights {
        model = load_record(path, model, device)?;
        tracing::info!("DETR weights loaded from '{}'", path.display());
    }
    ModelAdapter::processor_mediated(ModelName::Detr.as_str(), model, processor.init())
}
