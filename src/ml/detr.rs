// ============================================================
// Layer 5 — DETR (processor-mediated model)
// ============================================================
// A compact detection transformer. Takes the processor's
// pixel_values + pixel_mask and returns per-query class logits
// and boxes:
//
//   pixel_values [B, 3, H, W]
//       │  conv backbone (stride 2 per stage)
//       ▼
//   features [B, d_model, h, w] ─▶ flatten ─▶ memory [B, h·w, d_model]
//       │  + learned positional embeddings
//       │  encoder blocks (self-attention, padded cells masked)
//       ▼
//   object queries [B, Q, d_model]
//       │  decoder blocks (self-attention over queries,
//       │                  cross-attention into memory)
//       ▼
//   class head → logits [B, Q, num_classes]
//   box head   → boxes  [B, Q, 4]   (cx, cy, w, h in 0..1)
//
// pixel_mask is average-pooled down to the feature grid; a cell
// that is mostly padding is hidden from attention.
//
// Reference: Carion et al. (2020) End-to-End Object Detection
//            with Transformers
//            Vaswani et al. (2017) Attention Is All You Need

use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        conv::{Conv2d, Conv2dConfig},
        pool::{AvgPool2d, AvgPool2dConfig},
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::{gelu, relu, sigmoid},
};

use crate::domain::error::{HarnessError, HarnessResult};
use crate::domain::label::NUM_CLASSES;
use crate::domain::traits::AdapterKind;
use crate::ml::adapter::{ImageModel, ModelInput, ModelOutput};
use crate::ml::mobilenet::ConvBnAct;
use crate::ml::processor::ProcessedInput;

#[derive(Config, Debug)]
pub struct DetrConfig {
    #[config(default = "NUM_CLASSES")]
    pub num_classes: usize,

    #[config(default = 100)]
    pub num_queries: usize,

    #[config(default = 256)]
    pub d_model: usize,

    #[config(default = 8)]
    pub num_heads: usize,

    #[config(default = 6)]
    pub encoder_layers: usize,

    #[config(default = 6)]
    pub decoder_layers: usize,

    #[config(default = 2048)]
    pub d_ff: usize,

    #[config(default = 0.1)]
    pub dropout: f64,

    /// Output channels of each stride-2 backbone stage
    #[config(default = "vec![32, 64, 128, 256]")]
    pub backbone_channels: Vec<usize>,

    /// Largest feature grid (h·w) the positional table covers
    #[config(default = 1024)]
    pub max_positions: usize,
}

impl DetrConfig {
    /// A minimal variant for quick CPU runs.
    pub fn tiny() -> Self {
        Self::new()
            .with_num_queries(4)
            .with_d_model(16)
            .with_num_heads(2)
            .with_encoder_layers(1)
            .with_decoder_layers(1)
            .with_d_ff(32)
            .with_backbone_channels(vec![8, 16])
            .with_max_positions(1024)
    }

    /// Total downsampling factor of the backbone.
    pub fn stride(&self) -> usize {
        1 << self.backbone_channels.len()
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Detr<B> {
        let mut backbone = Vec::new();
        let mut in_channels = 3;
        for &out_channels in &self.backbone_channels {
            backbone.push(ConvBnAct::new(in_channels, out_channels, 3, 2, 1, true, device));
            in_channels = out_channels;
        }
        let input_proj = Conv2dConfig::new([in_channels, self.d_model], [1, 1]).init(device);

        let stride = self.stride();
        let mask_pool = AvgPool2dConfig::new([stride, stride])
            .with_strides([stride, stride])
            .init();

        let encoder = (0..self.encoder_layers)
            .map(|_| self.build_encoder_block(device))
            .collect();
        let decoder = (0..self.decoder_layers)
            .map(|_| self.build_decoder_block(device))
            .collect();

        let model = Detr {
            backbone,
            input_proj,
            mask_pool,
            position_embedding: EmbeddingConfig::new(self.max_positions, self.d_model).init(device),
            query_embedding:    EmbeddingConfig::new(self.num_queries, self.d_model).init(device),
            encoder,
            decoder,
            final_norm: LayerNormConfig::new(self.d_model).init(device),
            class_head: LinearConfig::new(self.d_model, self.num_classes).init(device),
            box_hidden: LinearConfig::new(self.d_model, self.d_model).init(device),
            box_head:   LinearConfig::new(self.d_model, 4).init(device),
            dropout:    DropoutConfig::new(self.dropout).init(),
            num_queries:   self.num_queries,
            max_positions: self.max_positions,
        };
        tracing::info!("DETR built: {} parameters", model.num_params());
        model
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        EncoderBlock {
            self_attn:   self.build_attention(device),
            ffn_linear1: LinearConfig::new(self.d_model, self.d_ff).init(device),
            ffn_linear2: LinearConfig::new(self.d_ff, self.d_model).init(device),
            norm1:       LayerNormConfig::new(self.d_model).init(device),
            norm2:       LayerNormConfig::new(self.d_model).init(device),
            dropout:     DropoutConfig::new(self.dropout).init(),
        }
    }

    fn build_decoder_block<B: Backend>(&self, device: &B::Device) -> DecoderBlock<B> {
        DecoderBlock {
            self_attn:   self.build_attention(device),
            cross_attn:  self.build_attention(device),
            ffn_linear1: LinearConfig::new(self.d_model, self.d_ff).init(device),
            ffn_linear2: LinearConfig::new(self.d_ff, self.d_model).init(device),
            norm1:       LayerNormConfig::new(self.d_model).init(device),
            norm2:       LayerNormConfig::new(self.d_model).init(device),
            norm3:       LayerNormConfig::new(self.d_model).init(device),
            dropout:     DropoutConfig::new(self.dropout).init(),
        }
    }

    fn build_attention<B: Backend>(&self, device: &B::Device) -> MultiHeadAttention<B> {
        MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
            .with_dropout(self.dropout)
            .init(device)
    }
}

// ─── Encoder / decoder blocks ─────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    /// padding: [batch, tokens], true where the token must be ignored
    pub fn forward(&self, x: Tensor<B, 3>, padding: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let attn = self
            .self_attn
            .forward(MhaInput::self_attn(x.clone()).mask_pad(padding))
            .context;
        let x = self.norm1.forward(x + self.dropout.forward(attn));
        let ffn = self.ffn_linear2.forward(gelu(self.ffn_linear1.forward(x.clone())));
        self.norm2.forward(x + self.dropout.forward(ffn))
    }
}

#[derive(Module, Debug)]
pub struct DecoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub cross_attn:  MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub norm3:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> DecoderBlock<B> {
    pub fn forward(
        &self,
        queries: Tensor<B, 3>,
        memory:  Tensor<B, 3>,
        padding: Tensor<B, 2, Bool>,
    ) -> Tensor<B, 3> {
        let attn = self.self_attn.forward(MhaInput::self_attn(queries.clone())).context;
        let x = self.norm1.forward(queries + self.dropout.forward(attn));

        let cross = self
            .cross_attn
            .forward(MhaInput::new(x.clone(), memory.clone(), memory).mask_pad(padding))
            .context;
        let x = self.norm2.forward(x + self.dropout.forward(cross));

        let ffn = self.ffn_linear2.forward(relu(self.ffn_linear1.forward(x.clone())));
        self.norm3.forward(x + self.dropout.forward(ffn))
    }
}

// ─── Detr ─────────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct Detr<B: Backend> {
    backbone:           Vec<ConvBnAct<B>>,
    input_proj:         Conv2d<B>,
    mask_pool:          AvgPool2d,
    position_embedding: Embedding<B>,
    query_embedding:    Embedding<B>,
    encoder:            Vec<EncoderBlock<B>>,
    decoder:            Vec<DecoderBlock<B>>,
    final_norm:         LayerNorm<B>,
    class_head:         Linear<B>,
    box_hidden:         Linear<B>,
    box_head:           Linear<B>,
    dropout:            Dropout,
    num_queries:        usize,
    max_positions:      usize,
}

impl<B: Backend> Detr<B> {
    /// → (logits [B, Q, num_classes], boxes [B, Q, 4])
    pub fn forward(&self, input: ProcessedInput<B>) -> HarnessResult<(Tensor<B, 3>, Tensor<B, 3>)> {
        let ProcessedInput { pixel_values, pixel_mask } = input;

        let mut features = pixel_values;
        for stage in &self.backbone {
            features = stage.forward(features);
        }
        let features = self.input_proj.forward(features);
        let [batch, d_model, height, width] = features.dims();
        let tokens = height * width;
        if tokens > self.max_positions {
            return Err(HarnessError::ShapeMismatch {
                context:  "DETR feature grid".into(),
                expected: vec![self.max_positions],
                found:    vec![height, width],
            });
        }

        let padding = self.feature_padding(pixel_mask, [height, width])?;
        let device  = features.device();

        // [B, d, h, w] → [B, h·w, d]
        let memory = features.reshape([batch, d_model, tokens]).swap_dims(1, 2);
        let positions = Tensor::<B, 1, Int>::arange(0..tokens as i64, &device)
            .unsqueeze::<2>()
            .expand([batch, tokens]);
        let mut memory = self
            .dropout
            .forward(memory + self.position_embedding.forward(positions));
        for layer in &self.encoder {
            memory = layer.forward(memory, padding.clone());
        }

        let query_ids = Tensor::<B, 1, Int>::arange(0..self.num_queries as i64, &device)
            .unsqueeze::<2>()
            .expand([batch, self.num_queries]);
        let mut hidden = self.query_embedding.forward(query_ids);
        for layer in &self.decoder {
            hidden = layer.forward(hidden, memory.clone(), padding.clone());
        }
        let hidden = self.final_norm.forward(hidden);

        let logits = self.class_head.forward(hidden.clone());
        let boxes  = sigmoid(self.box_head.forward(relu(self.box_hidden.forward(hidden))));
        Ok((logits, boxes))
    }

    /// Pool the pixel mask onto the feature grid.
    /// → [batch, h·w], true where the cell is mostly padding
    fn feature_padding(
        &self,
        pixel_mask: Tensor<B, 3>,
        grid:       [usize; 2],
    ) -> HarnessResult<Tensor<B, 2, Bool>> {
        let [batch, height, width] = pixel_mask.dims();
        let pooled = self
            .mask_pool
            .forward(pixel_mask.reshape([batch, 1, height, width]));
        let [_, _, mask_h, mask_w] = pooled.dims();
        if [mask_h, mask_w] != grid {
            return Err(HarnessError::ShapeMismatch {
                context:  "DETR pixel mask".into(),
                expected: grid.to_vec(),
                found:    vec![mask_h, mask_w],
            });
        }
        Ok(pooled.reshape([batch, mask_h * mask_w]).lower_elem(0.5))
    }
}

impl<B: Backend> ImageModel<B> for Detr<B> {
    fn contract(&self) -> AdapterKind {
        AdapterKind::ProcessorMediated
    }

    fn forward_native(&self, input: ModelInput<B>) -> HarnessResult<ModelOutput<B>> {
        let (logits, boxes) = self.forward(input.into_processed())?;
        Ok(ModelOutput::Detections { logits, boxes })
    }
}
