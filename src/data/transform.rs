// ============================================================
// Layer 4 — Image Transform Pipeline
// ============================================================
// Turns a decoded image into the flat CHW float buffer the
// batcher expects.
//
// Steps (applied in order):
//   1. Convert to 8-bit RGB (drops alpha, expands greyscale)
//   2. Resize to size × size with a bilinear (triangle) filter
//   3. Scale every channel to [0, 1]
//   4. Optionally normalise: (x - mean[c]) / std[c]
//
// The two model families want different input distributions:
//   classification() → steps 1-4 (ImageNet statistics)
//   detection()      → steps 1-3 (the DETR processor
//                      normalises later, on the tensor)
// Both are the same pipeline with a different switch.
//
// Reference: image crate documentation (imageops::FilterType)

use image::{imageops::FilterType, DynamicImage, ImageReader};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::error::{HarnessError, HarnessResult};
use crate::domain::sample::{CHANNELS, IMAGE_SIZE};

/// Per-channel ImageNet mean (RGB).
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// Per-channel ImageNet standard deviation (RGB).
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Channel statistics for step 4.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Normalization {
    pub mean: [f32; 3],
    pub std:  [f32; 3],
}

impl Normalization {
    pub fn imagenet() -> Self {
        Self { mean: IMAGENET_MEAN, std: IMAGENET_STD }
    }
}

/// A configurable preprocessing pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageTransform {
    /// Output side length (square)
    pub size: usize,

    /// None → leave pixels in [0, 1]
    pub normalize: Option<Normalization>,
}

impl ImageTransform {
    /// Resize + to-tensor + ImageNet normalisation.
    pub fn classification() -> Self {
        Self { size: IMAGE_SIZE, normalize: Some(Normalization::imagenet()) }
    }

    /// Resize + to-tensor only.
    pub fn detection() -> Self {
        Self { size: IMAGE_SIZE, normalize: None }
    }

    #[cfg(test)]
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Decode the file at `path` and run the pipeline on it.
    pub fn load(&self, path: &Path) -> HarnessResult<Vec<f32>> {
        let image = ImageReader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|e| HarnessError::missing_file(path, e))?
            .decode()
            .map_err(|e| HarnessError::missing_file(path, e))?;
        Ok(self.apply(&image))
    }

    /// Run the pipeline on an already decoded image.
    pub fn apply(&self, image: &DynamicImage) -> Vec<f32> {
        let side = self.size as u32;
        let rgb  = image
            .resize_exact(side, side, FilterType::Triangle)
            .to_rgb8();

        let plane = self.size * self.size;
        let mut out = vec![0.0f32; CHANNELS * plane];

        // HWC (interleaved) → CHW (planar)
        for (x, y, pixel) in rgb.enumerate_pixels() {
            let offset = y as usize * self.size + x as usize;
            for c in 0..CHANNELS {
                let value = pixel[c] as f32 / 255.0;
                out[c * plane + offset] = match &self.normalize {
                    Some(n) => (value - n.mean[c]) / n.std[c],
                    None    => value,
                };
            }
        }

        out
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn solid(w: u32, h: u32, rgb: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb(rgb)))
    }

    #[test]
    fn test_detection_output_is_scaled_chw() {
        let t   = ImageTransform::detection().with_size(8);
        let out = t.apply(&solid(20, 10, [255, 0, 51]));

        assert_eq!(out.len(), 3 * 8 * 8);
        // Channel planes are contiguous
        assert!(out[..64].iter().all(|&v| (v - 1.0).abs() < 1e-6));
        assert!(out[64..128].iter().all(|&v| v.abs() < 1e-6));
        assert!(out[128..].iter().all(|&v| (v - 0.2).abs() < 1e-6));
    }

    #[test]
    fn test_classification_output_is_normalised() {
        let t   = ImageTransform::classification().with_size(4);
        let out = t.apply(&solid(4, 4, [0, 0, 0]));
        let expected_r = -IMAGENET_MEAN[0] / IMAGENET_STD[0];
        assert!((out[0] - expected_r).abs() < 1e-5);
    }

    #[test]
    fn test_default_size_is_128() {
        assert_eq!(ImageTransform::classification().size, 128);
        assert_eq!(ImageTransform::detection().size, 128);
        assert!(ImageTransform::detection().normalize.is_none());
    }

    #[test]
    fn test_load_missing_file_is_missing_file_error() {
        let err = ImageTransform::detection()
            .load(Path::new("/definitely/not/here.jpg"))
            .unwrap_err();
        assert!(matches!(err, HarnessError::MissingFile { .. }));
    }
}
