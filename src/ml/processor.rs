// ============================================================
// Layer 5 — Image Processor (processor-mediated input)
// ============================================================
// Turns a batch of pixel tensors into the dict-like input a
// detection transformer expects:
//
//   images [B, 3, H, W]
//       │  optional rescale (×1/255)
//       │  optional per-channel normalisation
//       │  zero-pad H, W up to a multiple of size_divisor
//       ▼
//   pixel_values [B, 3, H', W'] + pixel_mask [B, H', W']
//
// pixel_mask is 1.0 on real pixels and 0.0 on padding, so the
// model can ignore padded positions in attention.
//
// No resizing happens here; the dataset transform already
// fixed every image at the same side length.

use burn::{prelude::*, tensor::TensorData};

use crate::data::transform::{IMAGENET_MEAN, IMAGENET_STD};

#[derive(Config, Debug)]
pub struct ImageProcessorConfig {
    /// Multiply by 1/255 first (inputs are raw 0..255 values)
    #[config(default = false)]
    pub do_rescale: bool,

    #[config(default = true)]
    pub do_normalize: bool,

    #[config(default = "IMAGENET_MEAN")]
    pub image_mean: [f32; 3],

    #[config(default = "IMAGENET_STD")]
    pub image_std: [f32; 3],

    /// Height and width are padded up to a multiple of this (1 = never pad)
    #[config(default = 32)]
    pub size_divisor: usize,
}

impl ImageProcessorConfig {
    /// Hands pixels over untouched apart from the mask.
    /// Used when the dataset transform already normalised them.
    pub fn passthrough() -> Self {
        Self::new().with_do_normalize(false).with_size_divisor(1)
    }

    pub fn init(&self) -> ImageProcessor {
        ImageProcessor { config: self.clone() }
    }
}

/// Output of the processor, consumed by processor-mediated models.
#[derive(Debug, Clone)]
pub struct ProcessedInput<B: Backend> {
    /// [batch, 3, height, width]
    pub pixel_values: Tensor<B, 4>,
    /// [batch, height, width], 1.0 = real pixel
    pub pixel_mask: Tensor<B, 3>,
}

impl<B: Backend> ProcessedInput<B> {
    /// Wrap pixels that need no processing: full mask, no padding.
    pub fn unmasked(pixel_values: Tensor<B, 4>) -> Self {
        let [batch, _, height, width] = pixel_values.dims();
        let pixel_mask = Tensor::ones([batch, height, width], &pixel_values.device());
        Self { pixel_values, pixel_mask }
    }

    pub fn batch_size(&self) -> usize {
        self.pixel_values.dims()[0]
    }
}

#[derive(Debug, Clone)]
pub struct ImageProcessor {
    config: ImageProcessorConfig,
}

impl ImageProcessor {
    pub fn process<B: Backend>(&self, images: Tensor<B, 4>) -> ProcessedInput<B> {
        let [batch, channels, height, width] = images.dims();
        let device = images.device();
        let mut pixels = images;

        if self.config.do_rescale {
            pixels = pixels.div_scalar(255.0);
        }

        if self.config.do_normalize {
            // [1, 3, 1, 1] broadcasts over batch and spatial dims
            let mean = Tensor::<B, 4>::from_floats(
                TensorData::new(self.config.image_mean.to_vec(), [1, 3, 1, 1]),
                &device,
            );
            let std = Tensor::<B, 4>::from_floats(
                TensorData::new(self.config.image_std.to_vec(), [1, 3, 1, 1]),
                &device,
            );
            pixels = (pixels - mean) / std;
        }

        let padded_h = round_up(height, self.config.size_divisor);
        let padded_w = round_up(width, self.config.size_divisor);

        let mut mask = Tensor::<B, 3>::ones([batch, height, width], &device);
        if padded_h != height || padded_w != width {
            pixels = Tensor::zeros([batch, channels, padded_h, padded_w], &device)
                .slice_assign([0..batch, 0..channels, 0..height, 0..width], pixels);
            mask = Tensor::zeros([batch, padded_h, padded_w], &device)
                .slice_assign([0..batch, 0..height, 0..width], mask);
        }

        ProcessedInput { pixel_values: pixels, pixel_mask: mask }
    }
}

fn round_up(value: usize, divisor: usize) -> usize {
    if divisor <= 1 {
        value
    } else {
        value.div_ceil(divisor) * divisor
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_round_up() {
        assert_eq!(round_up(128, 32), 128);
        assert_eq!(round_up(100, 32), 128);
        assert_eq!(round_up(7, 1), 7);
        assert_eq!(round_up(7, 0), 7);
    }

    #[test]
    fn test_passthrough_keeps_pixels_and_marks_everything_valid() {
        let device = Default::default();
        let images = Tensor::<TestBackend, 4>::full([2, 3, 8, 8], 0.5, &device);

        let out = ImageProcessorConfig::passthrough().init().process(images);

        assert_eq!(out.pixel_values.dims(), [2, 3, 8, 8]);
        assert_eq!(out.pixel_mask.dims(), [2, 8, 8]);
        assert!((out.pixel_values.mean().into_scalar() - 0.5).abs() < 1e-6);
        assert!((out.pixel_mask.min().into_scalar() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalisation_uses_channel_statistics() {
        let device = Default::default();
        let images = Tensor::<TestBackend, 4>::full([1, 3, 4, 4], 0.485, &device);

        let out = ImageProcessorConfig::new()
            .with_size_divisor(1)
            .init()
            .process(images);

        // Channel 0 sits exactly on its mean
        let red = out.pixel_values.slice([0..1, 0..1]).abs().max().into_scalar();
        assert!(red < 1e-5);
    }

    #[test]
    fn test_padding_extends_pixels_and_mask() {
        let device = Default::default();
        let images = Tensor::<TestBackend, 4>::ones([1, 3, 5, 6], &device);

        let out = ImageProcessorConfig::passthrough()
            .with_size_divisor(4)
            .init()
            .process(images);

        assert_eq!(out.pixel_values.dims(), [1, 3, 8, 8]);
        assert_eq!(out.pixel_mask.dims(), [1, 8, 8]);

        // 5 × 6 real pixels out of 8 × 8
        let valid = out.pixel_mask.sum().into_scalar();
        assert!((valid - 30.0).abs() < 1e-6);
        let padded = out.pixel_values.slice([0..1, 0..3, 5..8]).abs().max().into_scalar();
        assert!(padded < 1e-6);
    }

    #[test]
    fn test_rescale_divides_by_255() {
        let device = Default::default();
        let images = Tensor::<TestBackend, 4>::full([1, 3, 2, 2], 255.0, &device);

        let out = ImageProcessorConfig::passthrough()
            .with_do_rescale(true)
            .init()
            .process(images);

        assert!((out.pixel_values.max().into_scalar() - 1.0).abs() < 1e-6);
    }
}
