// ============================================================
// Layer 3 — Core Traits and Tags
// ============================================================
// Abstractions the other layers program against:
//
//   SampleSource — anything that can hand out labelled samples
//                  by index (the image folder, or an in-memory
//                  set in tests)
//   AdapterKind  — which input/output contract a model uses
//   ModelName    — the two model families the harness compares
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::HarnessResult;
use crate::domain::sample::PetSample;

// ─── SampleSource ─────────────────────────────────────────────────────────────
/// Random-access source of preprocessed samples.
///
/// Implementations:
///   - PetImageDataset → decodes images from a directory
///   - (tests) in-memory vectors of synthetic samples
pub trait SampleSource {
    /// Number of samples available.
    fn len(&self) -> usize;

    /// Load the sample at `index`.
    fn fetch(&self, index: usize) -> HarnessResult<PetSample>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ─── AdapterKind ──────────────────────────────────────────────────────────────
/// The two input/output contracts a model can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdapterKind {
    /// Pixels in, (B, 2) logits out
    DirectTensor,
    /// Processor output in, (B, queries, classes) logits out
    ProcessorMediated,
}

impl AdapterKind {
    /// Adam learning rate used when the run config does not override it.
    /// Fine-tuning the transformer needs the smaller step.
    pub fn default_learning_rate(self) -> f64 {
        match self {
            AdapterKind::DirectTensor      => 1e-3,
            AdapterKind::ProcessorMediated => 1e-4,
        }
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterKind::DirectTensor      => write!(f, "direct-tensor"),
            AdapterKind::ProcessorMediated => write!(f, "processor-mediated"),
        }
    }
}

// ─── ModelName ────────────────────────────────────────────────────────────────
/// The model families known to the harness.
/// The display form is used in artifact names ("MobileNet_log.txt").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelName {
    MobileNet,
    Detr,
}

impl ModelName {
    pub fn adapter_kind(self) -> AdapterKind {
        match self {
            ModelName::MobileNet => AdapterKind::DirectTensor,
            ModelName::Detr      => AdapterKind::ProcessorMediated,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModelName::MobileNet => "MobileNet",
            ModelName::Detr      => "DETR",
        }
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mobilenet" => Ok(ModelName::MobileNet),
            "detr"      => Ok(ModelName::Detr),
            other       => Err(format!("unknown model '{other}' (expected mobilenet or detr)")),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_learning_rates_per_kind() {
        assert_eq!(AdapterKind::DirectTensor.default_learning_rate(), 1e-3);
        assert_eq!(AdapterKind::ProcessorMediated.default_learning_rate(), 1e-4);
    }

    #[test]
    fn test_model_name_parsing() {
        assert_eq!("MobileNet".parse::<ModelName>(), Ok(ModelName::MobileNet));
        assert_eq!("detr".parse::<ModelName>(), Ok(ModelName::Detr));
        assert!("resnet".parse::<ModelName>().is_err());
    }

    #[test]
    fn test_model_name_kinds() {
        assert_eq!(ModelName::MobileNet.adapter_kind(), AdapterKind::DirectTensor);
        assert_eq!(ModelName::Detr.adapter_kind(), AdapterKind::ProcessorMediated);
        assert_eq!(ModelName::Detr.to_string(), "DETR");
    }
}
