// ============================================================
// Layer 5 — Model Adapter
// ============================================================
// One uniform call for the training loop and the inference
// path, whatever the model's native input/output contract:
//
//   forward(images [B, 3, S, S]) → logits [B, 2]
//
// Two contracts exist:
//
//   DirectTensor       images ─────────────▶ model ─▶ Logits [B, 2]
//
//   ProcessorMediated  images ─▶ processor ─▶ model ─▶ Detections
//                                                     logits [B, Q, C]
//                                                     boxes  [B, Q, 4]
//                      logits[:, 0, :] ─────────────▶ [B, C]
//
// The mediated path keeps only query slot 0 as the image-level
// prediction. That is a heuristic: slot 0 is not guaranteed to
// be the most confident query, but the classification loss
// trains that slot to carry the answer.

use burn::prelude::*;
use std::marker::PhantomData;

use crate::domain::error::{HarnessError, HarnessResult};
use crate::domain::label::NUM_CLASSES;
use crate::domain::traits::AdapterKind;
use crate::ml::processor::{ImageProcessor, ProcessedInput};

// ─── Native contracts ─────────────────────────────────────────────────────────
/// What a model receives.
#[derive(Debug, Clone)]
pub enum ModelInput<B: Backend> {
    Pixels(Tensor<B, 4>),
    Processed(ProcessedInput<B>),
}

impl<B: Backend> ModelInput<B> {
    pub fn batch_size(&self) -> usize {
        match self {
            ModelInput::Pixels(pixels)    => pixels.dims()[0],
            ModelInput::Processed(input)  => input.batch_size(),
        }
    }

    /// Pixel tensor, dropping the mask if there is one.
    pub fn into_pixels(self) -> Tensor<B, 4> {
        match self {
            ModelInput::Pixels(pixels)   => pixels,
            ModelInput::Processed(input) => input.pixel_values,
        }
    }

    /// Processed form; bare pixels get a full mask.
    pub fn into_processed(self) -> ProcessedInput<B> {
        match self {
            ModelInput::Pixels(pixels)   => ProcessedInput::unmasked(pixels),
            ModelInput::Processed(input) => input,
        }
    }
}

/// What a model returns.
#[derive(Debug, Clone)]
pub enum ModelOutput<B: Backend> {
    /// [batch, classes]
    Logits(Tensor<B, 2>),
    /// [batch, queries, classes] and [batch, queries, 4]
    Detections {
        logits: Tensor<B, 3>,
        boxes:  Tensor<B, 3>,
    },
}

impl<B: Backend> ModelOutput<B> {
    /// The contract that produces this kind of output.
    pub fn kind(&self) -> AdapterKind {
        match self {
            ModelOutput::Logits(_)          => AdapterKind::DirectTensor,
            ModelOutput::Detections { .. }  => AdapterKind::ProcessorMediated,
        }
    }
}

/// A burn module that declares which contract it speaks.
pub trait ImageModel<B: Backend>: Module<B> {
    fn contract(&self) -> AdapterKind;

    fn forward_native(&self, input: ModelInput<B>) -> HarnessResult<ModelOutput<B>>;
}

// ─── ModelAdapter ─────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct ModelAdapter<B: Backend, M> {
    name:      String,
    kind:      AdapterKind,
    model:     M,
    processor: Option<ImageProcessor>,
    _backend:  PhantomData<B>,
}

impl<B: Backend, M: ImageModel<B>> ModelAdapter<B, M> {
    /// Wrap a model that takes pixels and returns (B, 2) logits.
    pub fn direct(name: impl Into<String>, model: M) -> HarnessResult<Self> {
        Self::new(name.into(), AdapterKind::DirectTensor, model, None)
    }

    /// Wrap a model that needs the processor in front of it.
    pub fn processor_mediated(
        name:      impl Into<String>,
        model:     M,
        processor: ImageProcessor,
    ) -> HarnessResult<Self> {
        Self::new(name.into(), AdapterKind::ProcessorMediated, model, Some(processor))
    }

    fn new(
        name:      String,
        kind:      AdapterKind,
        model:     M,
        processor: Option<ImageProcessor>,
    ) -> HarnessResult<Self> {
        let found = model.contract();
        if found != kind {
            return Err(HarnessError::AdapterMismatch { model: name, expected: kind, found });
        }
        Ok(Self { name, kind, model, processor, _backend: PhantomData })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> AdapterKind {
        self.kind
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    #[cfg(test)]
    pub fn processor(&self) -> Option<&ImageProcessor> {
        self.processor.as_ref()
    }

    /// Replace the wrapped model, e.g. with the one an optimiser step returns.
    pub fn map_model(self, f: impl FnOnce(M) -> M) -> Self {
        Self { model: f(self.model), ..self }
    }

    pub fn num_params(&self) -> usize {
        self.model.num_params()
    }

    /// Put raw images into the shape this adapter's model consumes.
    pub fn prepare(&self, images: Tensor<B, 4>) -> ModelInput<B> {
        match &self.processor {
            Some(processor) => ModelInput::Processed(processor.process(images)),
            None            => ModelInput::Pixels(images),
        }
    }

    /// Run the model on prepared input and reduce to (B, 2) logits.
    pub fn forward_prepared(&self, input: ModelInput<B>) -> HarnessResult<Tensor<B, 2>> {
        let batch  = input.batch_size();
        let output = self.model.forward_native(input)?;

        let logits = match (self.kind, output) {
            (AdapterKind::DirectTensor, ModelOutput::Logits(logits)) => logits,
            (AdapterKind::ProcessorMediated, ModelOutput::Detections { logits, .. }) => {
                primary_query_logits(logits)?
            }
            (expected, other) => {
                return Err(HarnessError::AdapterMismatch {
                    model: self.name.clone(),
                    expected,
                    found: other.kind(),
                })
            }
        };

        let dims = logits.dims();
        if dims != [batch, NUM_CLASSES] {
            return Err(HarnessError::ShapeMismatch {
                context:  format!("{} logits", self.name),
                expected: vec![batch, NUM_CLASSES],
                found:    dims.to_vec(),
            });
        }
        Ok(logits)
    }

    pub fn forward(&self, images: Tensor<B, 4>) -> HarnessResult<Tensor<B, 2>> {
        self.forward_prepared(self.prepare(images))
    }
}

/// Query slot 0 of [B, Q, C] detection logits, as [B, C].
fn primary_query_logits<B: Backend>(logits: Tensor<B, 3>) -> HarnessResult<Tensor<B, 2>> {
    let [batch, queries, classes] = logits.dims();
    if queries == 0 {
        return Err(HarnessError::ShapeMismatch {
            context:  "detection logits".into(),
            expected: vec![batch, 1, classes],
            found:    vec![batch, queries, classes],
        });
    }
    Ok(logits
        .slice([0..batch, 0..1, 0..classes])
        .reshape([batch, classes]))
}
