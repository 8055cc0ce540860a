// Test-only helpers: tiny JPEG folders and in-memory sample sources.

use image::{Rgb, RgbImage};
use std::cell::Cell;
use std::path::Path;

use crate::domain::error::{HarnessError, HarnessResult};
use crate::domain::label::PetLabel;
use crate::domain::sample::{PetSample, CHANNELS};
use crate::domain::traits::SampleSource;

/// Write a small solid-colour JPEG.
pub fn write_jpeg(path: &Path, rgb: [u8; 3]) {
    RgbImage::from_pixel(16, 16, Rgb(rgb))
        .save(path)
        .expect("write jpeg fixture");
}

/// Write `cats` files named cat_<i>.jpg and `dogs` files named dog_<i>.jpg.
/// Cats are dark, dogs are bright, so a model can actually separate them.
pub fn write_pet_folder(dir: &Path, cats: usize, dogs: usize) {
    for i in 0..cats {
        write_jpeg(&dir.join(format!("cat_{i}.jpg")), [20, 20, 20]);
    }
    for i in 0..dogs {
        write_jpeg(&dir.join(format!("dog_{i}.jpg")), [235, 235, 235]);
    }
}

/// In-memory samples of a fixed side length; no decoding involved.
pub struct MemorySource {
    samples: Vec<PetSample>,
}

impl MemorySource {
    pub fn new(samples: Vec<PetSample>) -> Self {
        Self { samples }
    }

    /// `n` samples alternating Cat/Dog with constant pixel values.
    pub fn alternating(n: usize, size: usize) -> Self {
        let samples = (0..n)
            .map(|i| {
                let (label, value) = if i % 2 == 0 {
                    (PetLabel::Cat, 0.1)
                } else {
                    (PetLabel::Dog, 0.9)
                };
                PetSample::new(vec![value; CHANNELS * size * size], size, label)
            })
            .collect();
        Self { samples }
    }
}

impl SampleSource for MemorySource {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn fetch(&self, index: usize) -> HarnessResult<PetSample> {
        self.samples
            .get(index)
            .cloned()
            .ok_or_else(|| HarnessError::missing_file("memory", format!("index {index}")))
    }
}

/// Counts every `fetch` on the wrapped source.
pub struct CountingSource<S> {
    inner:   S,
    fetches: Cell<usize>,
}

impl<S: SampleSource> CountingSource<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, fetches: Cell::new(0) }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.get()
    }
}

impl<S: SampleSource> SampleSource for CountingSource<S> {
    fn len(&self) -> usize {
        self.inner.len()
    }

    fn fetch(&self, index: usize) -> HarnessResult<PetSample> {
        self.fetches.set(self.fetches.get() + 1);
        self.inner.fetch(index)
    }
}

/// Reports `len` samples but fails to load any of them.
pub struct UnreadableSource {
    pub len: usize,
}

impl SampleSource for UnreadableSource {
    fn len(&self) -> usize {
        self.len
    }

    fn fetch(&self, index: usize) -> HarnessResult<PetSample> {
        Err(HarnessError::missing_file(format!("img_{index}.jpg"), "deleted mid-run"))
    }
}
