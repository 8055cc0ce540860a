// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Models, the adapter that gives them one calling convention,
// the training loop and the inference entry points.
//
//   processor.rs  — ImageProcessor: normalise + pad + pixel mask
//                   for processor-mediated models
//
//   adapter.rs    — ImageModel trait, ModelInput / ModelOutput,
//                   and ModelAdapter: images in, (B, 2) logits out
//
//   mobilenet.rs  — MobileNetV2-style CNN (direct tensor contract)
//
//   detr.rs       — Detection transformer (processor-mediated)
//                   • conv backbone
//                   • learned positional embeddings
//                   • encoder / decoder attention blocks
//                   • class and box heads per object query
//
//   factory.rs    — Builds either model from its config, with
//                   optional external weights, already wrapped
//                   in the right adapter
//
//   trainer.rs    — The training loop state machine
//                   forward → loss → backward → Adam step
//
//   inferencer.rs — load_model / preprocess / predict for a
//                   single image
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Pixel normalisation, padding and masks
pub mod processor;

/// Uniform forward() over both model contracts
pub mod adapter;

/// MobileNetV2-style classifier
pub mod mobilenet;

/// DETR-style detection transformer
pub mod detr;

/// Model construction per model name
pub mod factory;

/// Training loop with per-epoch metrics
pub mod trainer;

/// Single-image inference
pub mod inferencer;

#[cfg(test)]
pub mod test_models;
