// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from a folder of .jpg files to device-resident
// tensor batches.
//
// The pipeline flows in this order:
//
//   data/images/*.jpg
//       │
//       ▼
//   PetImageDataset   → indexes the folder, labels from file names
//       │
//       ▼
//   ImageTransform    → resize 128×128, scale, optional normalise
//       │
//       ▼
//   BatchSource       → fresh shuffle per pass, cut into batches
//       │
//       ▼
//   PetBatcher        → stacks samples into [B, 3, 128, 128]
//       │
//       ▼
//   Training loop / inference
//
// Each module is responsible for exactly one step.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Preprocessing pipeline (resize, to-tensor, normalise)
pub mod transform;

/// Directory-backed dataset with filename-derived labels
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Shuffled, restartable batch production
pub mod batch_source;

#[cfg(test)]
pub mod fixtures;
