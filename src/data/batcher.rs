// ============================================================
// Layer 4 — Pet Batcher
// ============================================================
// Implements Burn's Batcher trait to stack a Vec<PetSample>
// into tensors on the configured device.
//
// How batching works here:
//   Input:  N samples, each a flat CHW buffer of 3 × S × S floats
//   Output: images [N, 3, S, S] and labels [N]
//
//   All buffers are concatenated in order and reshaped once:
//   [s1_c0..., s1_c1..., s1_c2..., s2_c0..., ...] → [N, 3, S, S]
//
// Every sample already went through the same transform, so
// they all share one size and no padding is needed.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::domain::sample::{PetSample, CHANNELS};

// ─── PetBatch ─────────────────────────────────────────────────────────────────
/// A batch of pet images ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct PetBatch<B: Backend> {
    /// Images — shape: [batch_size, 3, size, size]
    pub images: Tensor<B, 4>,

    /// Class indices (0 = Cat, 1 = Dog) — shape: [batch_size]
    pub labels: Tensor<B, 1, Int>,
}

impl<B: Backend> PetBatch<B> {
    pub fn len(&self) -> usize {
        self.images.dims()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ─── PetBatcher ───────────────────────────────────────────────────────────────
/// Holds the target device so tensors are created where the model lives.
#[derive(Clone, Debug)]
pub struct PetBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> PetBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<PetSample, PetBatch<B>> for PetBatcher<B> {
    fn batch(&self, items: Vec<PetSample>) -> PetBatch<B> {
        let batch_size = items.len();
        let size       = items.first().map(|s| s.size).unwrap_or(0);

        let pixels: Vec<f32> = items
            .iter()
            .flat_map(|s| s.pixels.iter().copied())
            .collect();

        let labels: Vec<i32> = items
            .iter()
            .map(|s| s.label.class_index() as i32)
            .collect();

        let images = Tensor::<B, 4>::from_floats(
            TensorData::new(pixels, [batch_size, CHANNELS, size, size]),
            &self.device,
        );

        let labels = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        PetBatch { images, labels }
    }
}
