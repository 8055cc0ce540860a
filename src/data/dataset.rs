// ============================================================
// Layer 4 — Pet Image Dataset (Dataset Adapter)
// ============================================================
// Indexes a flat directory of pet photos and decodes them on
// demand.
//
// Construction (`open`):
//   1. Read the directory (non-recursive)
//   2. Keep files whose extension is jpg / jpeg (any case)
//   3. Sort by file name so index i means the same file on
//      every run and every machine
//   4. Fail with EmptyDataset if nothing was kept
//
// Retrieval (`fetch`):
//   decode → transform pipeline → (pixels, label)
//
// Unlike a best-effort loader, a file that cannot be opened is
// an error for the caller, never silently skipped.
//
// Reference: Burn Book §4 (Datasets)
//            Rust Book §9 (Error Handling)

use burn::data::dataset::Dataset;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::data::transform::ImageTransform;
use crate::domain::error::{HarnessError, HarnessResult};
use crate::domain::label::PetLabel;
use crate::domain::sample::PetSample;
use crate::domain::traits::SampleSource;

/// Extensions (lower-case) accepted as dataset images.
pub const IMAGE_EXTENSIONS: [&str; 2] = ["jpg", "jpeg"];

#[derive(Debug, Clone)]
pub struct PetImageDataset {
    dir:       PathBuf,
    files:     Vec<PathBuf>,
    transform: ImageTransform,
}

impl PetImageDataset {
    /// Index every eligible image under `dir`.
    pub fn open(dir: impl AsRef<Path>, transform: ImageTransform) -> HarnessResult<Self> {
        let dir = dir.as_ref().to_path_buf();

        let entries = fs::read_dir(&dir)
            .map_err(|e| HarnessError::missing_file(&dir, e))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| HarnessError::missing_file(&dir, e))?.path();
            if path.is_file() && has_image_extension(&path) {
                files.push(path);
            }
        }

        if files.is_empty() {
            return Err(HarnessError::EmptyDataset { dir });
        }

        // Sort by file name, not full path, so the order only
        // depends on what is in the folder
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        tracing::info!("Indexed {} images in '{}'", files.len(), dir.display());
        Ok(Self { dir, files, transform })
    }

    #[cfg(test)]
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Label of the file at `index`, without decoding the image.
    pub fn label_of(&self, index: usize) -> Option<PetLabel> {
        self.files.get(index).map(|p| PetLabel::from_path(p))
    }

    /// (cats, dogs) counts derived from the file names.
    pub fn class_counts(&self) -> (usize, usize) {
        let cats = (0..self.files.len())
            .filter(|&i| self.label_of(i) == Some(PetLabel::Cat))
            .count();
        (cats, self.files.len() - cats)
    }
}

impl SampleSource for PetImageDataset {
    fn len(&self) -> usize {
        self.files.len()
    }

    fn fetch(&self, index: usize) -> HarnessResult<PetSample> {
        let path = self.files.get(index).ok_or_else(|| {
            HarnessError::missing_file(
                &self.dir,
                format!("index {index} out of range for {} files", self.files.len()),
            )
        })?;

        let pixels = self.transform.load(path)?;
        let label  = PetLabel::from_path(path);
        tracing::trace!("Loaded '{}' as {}", path.display(), label);

        Ok(PetSample::new(pixels, self.transform.size, label))
    }
}

/// Lets Burn's own data tooling read the same folder.
/// Unreadable files show up as `None` here; use `fetch` for the error.
impl Dataset<PetSample> for PetImageDataset {
    fn get(&self, index: usize) -> Option<PetSample> {
        self.fetch(index).ok()
    }

    fn len(&self) -> usize {
        self.files.len()
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::{write_jpeg, write_pet_folder};

    #[test]
    fn test_open_sorts_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        write_jpeg(&dir.path().join("dog_2.jpg"), [10, 10, 10]);
        write_jpeg(&dir.path().join("cat_1.jpg"), [10, 10, 10]);
        write_jpeg(&dir.path().join("dog_1.JPEG"), [10, 10, 10]);
        fs::write(dir.path().join("notes.txt"), "not an image").unwrap();

        let ds = PetImageDataset::open(dir.path(), ImageTransform::detection()).unwrap();
        let names: Vec<_> = ds
            .files()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["cat_1.jpg", "dog_1.JPEG", "dog_2.jpg"]);
        assert_eq!(ds.class_counts(), (1, 2));
    }

    #[test]
    fn test_empty_directory_is_empty_dataset_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("readme.md"), "# nothing here").unwrap();

        let err = PetImageDataset::open(dir.path(), ImageTransform::detection()).unwrap_err();
        assert!(matches!(err, HarnessError::EmptyDataset { .. }));
    }

    #[test]
    fn test_missing_directory_is_missing_file_error() {
        let err = PetImageDataset::open("/no/such/pet/folder", ImageTransform::detection())
            .unwrap_err();
        assert!(matches!(err, HarnessError::MissingFile { .. }));
    }

    #[test]
    fn test_fetch_returns_preprocessed_sample_with_label() {
        let dir = tempfile::tempdir().unwrap();
        write_pet_folder(dir.path(), 1, 1);

        let ds = PetImageDataset::open(dir.path(), ImageTransform::detection()).unwrap();
        let cat = ds.fetch(0).unwrap();

        assert_eq!(cat.label, PetLabel::Cat);
        assert_eq!(cat.shape(), [3, 128, 128]);
        assert!(cat.is_well_formed());
        assert!(cat.pixels.iter().all(|v| (0.0..=1.0).contains(v)));
        assert_eq!(ds.fetch(1).unwrap().label, PetLabel::Dog);
    }

    #[test]
    fn test_labels_are_stable_across_reloads() {
        let dir = tempfile::tempdir().unwrap();
        write_pet_folder(dir.path(), 2, 3);

        let a = PetImageDataset::open(dir.path(), ImageTransform::detection()).unwrap();
        let b = PetImageDataset::open(dir.path(), ImageTransform::classification()).unwrap();
        for i in 0..SampleSource::len(&a) {
            assert_eq!(a.label_of(i), b.label_of(i));
        }
    }

    #[test]
    fn test_unreadable_file_is_missing_file_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cat_broken.jpg"), b"definitely not a jpeg").unwrap();

        let ds  = PetImageDataset::open(dir.path(), ImageTransform::detection()).unwrap();
        let err = ds.fetch(0).unwrap_err();
        assert!(matches!(err, HarnessError::MissingFile { .. }));
        assert!(Dataset::get(&ds, 0).is_none());
    }

    #[test]
    fn test_out_of_range_fetch_is_error() {
        let dir = tempfile::tempdir().unwrap();
        write_pet_folder(dir.path(), 1, 0);

        let ds = PetImageDataset::open(dir.path(), ImageTransform::detection()).unwrap();
        assert!(ds.fetch(5).is_err());
    }
}
