// ============================================================
// Layer 3 — Harness Error Taxonomy
// ============================================================
// Every failure the harness can surface, with enough context
// (path, model name, epoch, stage) for a one-line message.
//
// Propagation:
//   - MissingFile / EmptyDataset / AdapterMismatch surface at
//     once to whoever called the harness
//   - TrainingFailure aborts only the run in progress
//   - Persistence is fatal to the run being recorded

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::traits::AdapterKind;

pub type HarnessResult<T> = std::result::Result<T, HarnessError>;

#[derive(Error, Debug)]
pub enum HarnessError {
    /// A dataset file (or the dataset directory) could not be opened or decoded
    #[error("cannot read dataset file '{path}': {reason}")]
    MissingFile { path: PathBuf, reason: String },

    /// The dataset directory holds no eligible image files
    #[error("no eligible image files found in '{dir}'")]
    EmptyDataset { dir: PathBuf },

    /// A model was wired to the wrong adapter variant
    #[error("adapter mismatch for {model}: adapter expects {expected}, model provides {found}")]
    AdapterMismatch {
        model:    String,
        expected: AdapterKind,
        found:    AdapterKind,
    },

    /// A tensor did not have the shape the adapter contract requires
    #[error("shape mismatch in {context}: expected {expected:?}, got {found:?}")]
    ShapeMismatch {
        context:  String,
        expected: Vec<usize>,
        found:    Vec<usize>,
    },

    /// A forward/backward step failed; the run is abandoned
    #[error("training failed for {model} at epoch {epoch}: {reason}")]
    TrainingFailure {
        model:  String,
        epoch:  usize,
        reason: String,
    },

    /// An artifact (checkpoint, log, config, plot) could not be written or read
    #[error("cannot persist '{path}': {reason}")]
    Persistence { path: PathBuf, reason: String },

    /// The comparison chart could not be rendered
    #[error("cannot render plot '{path}': {reason}")]
    Plot { path: PathBuf, reason: String },

    /// A configuration value is out of range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl HarnessError {
    pub fn missing_file(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        HarnessError::MissingFile {
            path:   path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn persistence(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        HarnessError::Persistence {
            path:   path.into(),
            reason: reason.to_string(),
        }
    }

    /// Wrap a step error so it names the model and the epoch it happened in.
    pub fn training_failure(model: impl Into<String>, epoch: usize, reason: impl ToString) -> Self {
        HarnessError::TrainingFailure {
            model:  model.into(),
            epoch,
            reason: reason.to_string(),
        }
    }

    pub fn is_training_failure(&self) -> bool {
        matches!(self, HarnessError::TrainingFailure { .. })
    }
}
