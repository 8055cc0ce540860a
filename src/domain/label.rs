// ============================================================
// Layer 3 — Pet Label Domain Type
// ============================================================
// Binary label for the pet images. The dataset carries no
// annotation file; the label comes from the file name:
//
//   "cat_001.jpg"   → Cat (class 0)
//   "dog_001.jpg"   → Dog (class 1)
//   "anything.jpg"  → Dog (class 1)
//
// Matching is a plain, case-sensitive substring check on the
// file name only (never the parent directories), so the same
// file always maps to the same label.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Substring that marks an image as a cat.
pub const CAT_MARKER: &str = "cat";

/// Number of classes every model head must produce.
pub const NUM_CLASSES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PetLabel {
    Cat,
    Dog,
}

impl PetLabel {
    /// Derive the label from a file name.
    pub fn from_file_name(file_name: &str) -> Self {
        if file_name.contains(CAT_MARKER) {
            PetLabel::Cat
        } else {
            PetLabel::Dog
        }
    }

    /// Derive the label from a path, looking only at its final component.
    /// Names that are not valid UTF-8 are matched lossily.
    pub fn from_path(path: &Path) -> Self {
        match path.file_name() {
            Some(name) => Self::from_file_name(&name.to_string_lossy()),
            None       => PetLabel::Dog,
        }
    }

    /// Class index used as the cross-entropy target.
    pub fn class_index(self) -> usize {
        match self {
            PetLabel::Cat => 0,
            PetLabel::Dog => 1,
        }
    }

    /// Map an argmax class index back to a label.
    /// Anything other than 1 reads as Cat, so the result is always one of the two.
    pub fn from_class_index(index: usize) -> Self {
        if index == 1 {
            PetLabel::Dog
        } else {
            PetLabel::Cat
        }
    }
}

impl fmt::Display for PetLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PetLabel::Cat => write!(f, "Cat"),
            PetLabel::Dog => write!(f, "Dog"),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_cat_marker_maps_to_zero() {
        assert_eq!(PetLabel::from_file_name("cat_01.jpg"), PetLabel::Cat);
        assert_eq!(PetLabel::from_file_name("my_cat.jpg").class_index(), 0);
    }

    #[test]
    fn test_everything_else_maps_to_one() {
        assert_eq!(PetLabel::from_file_name("dog_01.jpg"), PetLabel::Dog);
        assert_eq!(PetLabel::from_file_name("beagle_7.jpg").class_index(), 1);
        // Case-sensitive: "Cat" is not the marker
        assert_eq!(PetLabel::from_file_name("Cat_01.jpg"), PetLabel::Dog);
    }

    #[test]
    fn test_label_is_idempotent() {
        for name in ["cat_3.jpg", "dog_3.jpg", "bobcat.jpg", ""] {
            assert_eq!(PetLabel::from_file_name(name), PetLabel::from_file_name(name));
        }
    }

    #[test]
    fn test_only_file_name_is_inspected() {
        let path = PathBuf::from("/data/cats_and_dogs/dog_9.jpg");
        assert_eq!(PetLabel::from_path(&path), PetLabel::Dog);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_cat_name_stays_a_cat() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let path = Path::new("/data").join(OsStr::from_bytes(b"cat_\xff.jpg"));
        assert_eq!(PetLabel::from_path(&path), PetLabel::Cat);
        let path = Path::new("/data").join(OsStr::from_bytes(b"dog_\xff.jpg"));
        assert_eq!(PetLabel::from_path(&path), PetLabel::Dog);
    }

    #[test]
    fn test_class_index_round_trip_and_display() {
        for label in [PetLabel::Cat, PetLabel::Dog] {
            assert_eq!(PetLabel::from_class_index(label.class_index()), label);
        }
        assert_eq!(PetLabel::from_class_index(7), PetLabel::Cat);
        assert_eq!(PetLabel::Cat.to_string(), "Cat");
        assert_eq!(PetLabel::Dog.to_string(), "Dog");
    }
}
