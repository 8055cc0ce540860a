// Test-only models.

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
};

use crate::domain::error::HarnessResult;
use crate::domain::traits::AdapterKind;
use crate::ml::adapter::{ImageModel, ModelInput, ModelOutput};

/// A processor-mediated detector that behaves for batches of
/// `healthy_batch` images and returns three classes otherwise.
#[derive(Config, Debug)]
pub struct FaultyDetectorConfig {
    #[config(default = 4)]
    pub healthy_batch: usize,

    #[config(default = 2)]
    pub num_queries: usize,
}

impl FaultyDetectorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> FaultyDetector<B> {
        FaultyDetector {
            head:          LinearConfig::new(3, 3).init(device),
            healthy_batch: self.healthy_batch,
            num_queries:   self.num_queries,
        }
    }
}

#[derive(Module, Debug)]
pub struct FaultyDetector<B: Backend> {
    head:          Linear<B>,
    healthy_batch: usize,
    num_queries:   usize,
}

impl<B: Backend> ImageModel<B> for FaultyDetector<B> {
    fn contract(&self) -> AdapterKind {
        AdapterKind::ProcessorMediated
    }

    fn forward_native(&self, input: ModelInput<B>) -> HarnessResult<ModelOutput<B>> {
        let pixels = input.into_processed().pixel_values;
        let [batch, channels, _, _] = pixels.dims();

        // Mean colour per image: [B, 3]
        let colour = pixels.mean_dim(3).mean_dim(2).reshape([batch, channels]);
        let scores = self.head.forward(colour);

        let classes = if batch == self.healthy_batch { 2 } else { 3 };
        let logits = scores
            .slice([0..batch, 0..classes])
            .unsqueeze_dim::<3>(1)
            .expand([batch, self.num_queries, classes]);
        let boxes = Tensor::zeros([batch, self.num_queries, 4], &logits.device());

        Ok(ModelOutput::Detections { logits, boxes })
    }
}

/// A direct-contract classifier whose head expects `in_features`
/// inputs. Any other flattened image width panics inside burn.
#[derive(Config, Debug)]
pub struct MisfitClassifierConfig {
    #[config(default = 5)]
    pub in_features: usize,
}

impl MisfitClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> MisfitClassifier<B> {
        MisfitClassifier { head: LinearConfig::new(self.in_features, 2).init(device) }
    }
}

#[derive(Module, Debug)]
pub struct MisfitClassifier<B: Backend> {
    head: Linear<B>,
}

impl<B: Backend> ImageModel<B> for MisfitClassifier<B> {
    fn contract(&self) -> AdapterKind {
        AdapterKind::DirectTensor
    }

    fn forward_native(&self, input: ModelInput<B>) -> HarnessResult<ModelOutput<B>> {
        let flat: Tensor<B, 2> = input.into_pixels().flatten(1, 3);
        Ok(ModelOutput::Logits(self.head.forward(flat)))
    }
}
