// ============================================================
// Layer 3 — PetSample Domain Type
// ============================================================
// One preprocessed dataset item: a CHW float image and its label.
// The image is kept as a flat Vec<f32> so this layer stays free
// of framework tensor types; the batcher (Layer 4) stacks many
// samples into one [B, C, H, W] tensor.

use crate::domain::label::PetLabel;

/// Channels after preprocessing (RGB).
pub const CHANNELS: usize = 3;

/// Height and width after preprocessing.
pub const IMAGE_SIZE: usize = 128;

#[derive(Debug, Clone, PartialEq)]
pub struct PetSample {
    /// Flattened CHW pixels, length CHANNELS × size × size
    pub pixels: Vec<f32>,

    /// Side length of the square image
    pub size: usize,

    pub label: PetLabel,
}

impl PetSample {
    pub fn new(pixels: Vec<f32>, size: usize, label: PetLabel) -> Self {
        Self { pixels, size, label }
    }

    /// Shape of the image as [C, H, W].
    pub fn shape(&self) -> [usize; 3] {
        [CHANNELS, self.size, self.size]
    }

    /// True when the pixel buffer matches the declared shape.
    pub fn is_well_formed(&self) -> bool {
        self.pixels.len() == CHANNELS * self.size * self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_and_well_formed() {
        let s = PetSample::new(vec![0.0; CHANNELS * 4 * 4], 4, PetLabel::Cat);
        assert_eq!(s.shape(), [3, 4, 4]);
        assert!(s.is_well_formed());

        let bad = PetSample::new(vec![0.0; 5], 4, PetLabel::Dog);
        assert!(!bad.is_well_formed());
    }
}
