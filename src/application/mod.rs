// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates the other layers to accomplish one
// goal per use case:
//
//   compare  — train both models on the same data, persist each
//              run, draw the comparison chart
//   train    — train and persist a single model
//   evaluate — classify one batch with a saved model
//   inspect  — smoke-test the dataset loader
//   predict  — classify a single image file
//
// Rules for this layer:
//   - No ML math or model code here
//   - No direct file writing (that's Layer 6)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

use serde::{Deserialize, Serialize};

use crate::ml::detr::DetrConfig;
use crate::ml::mobilenet::MobileNetConfig;

// The two-model comparison workflow
pub mod compare_use_case;

// Single-model training
pub mod train_use_case;

// One-batch evaluation of a saved model
pub mod evaluate_use_case;

// Dataset loader smoke test
pub mod inspect_use_case;

// Single-image prediction
pub mod predict_use_case;

/// Which architecture variants to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModelScale {
    /// MobileNetV2 and DETR at their usual sizes
    #[default]
    Full,
    /// Small variants for quick CPU runs
    Compact,
}

impl ModelScale {
    pub fn mobilenet(self) -> MobileNetConfig {
        match self {
            ModelScale::Full    => MobileNetConfig::new(),
            ModelScale::Compact => MobileNetConfig::tiny(),
        }
    }

    pub fn detr(self) -> DetrConfig {
        match self {
            ModelScale::Full    => DetrConfig::new(),
            ModelScale::Compact => DetrConfig::tiny(),
        }
    }
}
