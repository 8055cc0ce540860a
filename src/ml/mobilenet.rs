// ============================================================
// Layer 5 — MobileNet (direct-tensor model)
// ============================================================
// A MobileNetV2-style classifier: a stride-2 stem, a stack of
// inverted residual blocks, a 1×1 head conv, global pooling and
// a two-way linear classifier.
//
// Inverted residual block:
//
//   x ─▶ 1×1 expand (×t) ─▶ 3×3 depthwise ─▶ 1×1 project ─▶ (+ x)
//          BN + ReLU6        BN + ReLU6        BN (linear)
//
//   The skip connection is only used when stride = 1 and the
//   channel count does not change.
//
// ReLU6 is min(max(x, 0), 6), written as clamp(0, 6).
//
// Reference: Sandler et al. (2018) MobileNetV2
//            Burn Book §3 (Building Blocks)

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig},
        BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Linear, LinearConfig,
        PaddingConfig2d,
    },
    prelude::*,
};

use crate::domain::error::HarnessResult;
use crate::domain::label::NUM_CLASSES;
use crate::domain::traits::AdapterKind;
use crate::ml::adapter::{ImageModel, ModelInput, ModelOutput};

/// (expansion t, output channels c, repeats n, first stride s)
const STAGES: [(usize, usize, usize, usize); 7] = [
    (1, 16, 1, 1),
    (6, 24, 2, 2),
    (6, 32, 3, 2),
    (6, 64, 4, 2),
    (6, 96, 3, 1),
    (6, 160, 3, 2),
    (6, 320, 1, 1),
];

const STEM_CHANNELS: usize = 32;

#[derive(Config, Debug)]
pub struct MobileNetConfig {
    #[config(default = "NUM_CLASSES")]
    pub num_classes: usize,

    /// Scales every channel count (rounded to a multiple of 8)
    #[config(default = 1.0)]
    pub width_mult: f64,

    /// How many rows of the stage table to build (1..=7)
    #[config(default = 7)]
    pub num_stages: usize,

    #[config(default = 1280)]
    pub last_channels: usize,

    #[config(default = 0.2)]
    pub dropout: f64,
}

impl MobileNetConfig {
    /// A few-thousand-parameter variant for quick CPU runs.
    pub fn tiny() -> Self {
        Self::new()
            .with_width_mult(0.25)
            .with_num_stages(3)
            .with_last_channels(32)
    }

    fn channels(&self, base: usize) -> usize {
        make_divisible(base as f64 * self.width_mult, 8)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> MobileNet<B> {
        let stem_out = self.channels(STEM_CHANNELS);
        let stem = ConvBnAct::new(3, stem_out, 3, 2, 1, true, device);

        let mut blocks = Vec::new();
        let mut in_channels = stem_out;
        for &(expansion, base, repeats, stride) in STAGES.iter().take(self.num_stages.clamp(1, STAGES.len())) {
            let out_channels = self.channels(base);
            for i in 0..repeats {
                let stride = if i == 0 { stride } else { 1 };
                blocks.push(InvertedResidual::new(in_channels, out_channels, stride, expansion, device));
                in_channels = out_channels;
            }
        }

        let head = ConvBnAct::new(in_channels, self.last_channels, 1, 1, 1, true, device);
        let model = MobileNet {
            stem,
            blocks,
            head,
            pool:       AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            dropout:    DropoutConfig::new(self.dropout).init(),
            classifier: LinearConfig::new(self.last_channels, self.num_classes).init(device),
        };
        tracing::info!("MobileNet built: {} parameters", model.num_params());
        model
    }
}

/// Round to the nearest multiple of `divisor`, never going more
/// than 10% below the requested value and never below `divisor`.
fn make_divisible(value: f64, divisor: usize) -> usize {
    let d = divisor as f64;
    let rounded = (((value + d / 2.0) / d).floor() * d).max(d);
    let rounded = if rounded < 0.9 * value { rounded + d } else { rounded };
    rounded as usize
}

// ─── Building blocks ──────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct ConvBnAct<B: Backend> {
    conv:     Conv2d<B>,
    bn:       BatchNorm<B>,
    activate: bool,
}

impl<B: Backend> ConvBnAct<B> {
    pub fn new(
        in_channels:  usize,
        out_channels: usize,
        kernel:       usize,
        stride:       usize,
        groups:       usize,
        activate:     bool,
        device:       &B::Device,
    ) -> Self {
        let pad  = kernel / 2;
        let conv = Conv2dConfig::new([in_channels, out_channels], [kernel, kernel])
            .with_stride([stride, stride])
            .with_padding(PaddingConfig2d::Explicit(pad, pad))
            .with_groups(groups)
            .with_bias(false)
            .init(device);
        let bn = BatchNormConfig::new(out_channels).init(device);
        Self { conv, bn, activate }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.bn.forward(self.conv.forward(x));
        if self.activate {
            x.clamp(0.0, 6.0)
        } else {
            x
        }
    }
}

#[derive(Module, Debug)]
pub struct InvertedResidual<B: Backend> {
    expand:       Option<ConvBnAct<B>>,
    depthwise:    ConvBnAct<B>,
    project:      ConvBnAct<B>,
    use_residual: bool,
}

impl<B: Backend> InvertedResidual<B> {
    pub fn new(
        in_channels:  usize,
        out_channels: usize,
        stride:       usize,
        expansion:    usize,
        device:       &B::Device,
    ) -> Self {
        let hidden = in_channels * expansion;
        let expand = (expansion != 1)
            .then(|| ConvBnAct::new(in_channels, hidden, 1, 1, 1, true, device));
        Self {
            expand,
            depthwise:    ConvBnAct::new(hidden, hidden, 3, stride, hidden, true, device),
            project:      ConvBnAct::new(hidden, out_channels, 1, 1, 1, false, device),
            use_residual: stride == 1 && in_channels == out_channels,
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let mut out = x.clone();
        if let Some(expand) = &self.expand {
            out = expand.forward(out);
        }
        let out = self.project.forward(self.depthwise.forward(out));
        if self.use_residual {
            out + x
        } else {
            out
        }
    }
}

// ─── MobileNet ────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct MobileNet<B: Backend> {
    stem:       ConvBnAct<B>,
    blocks:     Vec<InvertedResidual<B>>,
    head:       ConvBnAct<B>,
    pool:       AdaptiveAvgPool2d,
    dropout:    Dropout,
    classifier: Linear<B>,
}

impl<B: Backend> MobileNet<B> {
    /// images: [batch, 3, H, W] → logits: [batch, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = self.stem.forward(images);
        for block in &self.blocks {
            x = block.forward(x);
        }
        let x = self.pool.forward(self.head.forward(x));

        // [B, C, 1, 1] → [B, C]
        let [batch, channels, _, _] = x.dims();
        let x = x.reshape([batch, channels]);
        self.classifier.forward(self.dropout.forward(x))
    }
}

impl<B: Backend> ImageModel<B> for MobileNet<B> {
    fn contract(&self) -> AdapterKind {
        AdapterKind::DirectTensor
    }

    fn forward_native(&self, input: ModelInput<B>) -> HarnessResult<ModelOutput<B>> {
        Ok(ModelOutput::Logits(self.forward(input.into_pixels())))
    }
}
