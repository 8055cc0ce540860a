// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs, enums and traits that define what the
// harness talks about: samples and their labels, per-epoch
// metrics, run results, and the error taxonomy.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Cat/Dog labels and the filename convention that derives them
pub mod label;

// A preprocessed image with its label
pub mod sample;

// Per-epoch metrics and the result of one training run
pub mod metrics;

// The harness error taxonomy
pub mod error;

// Core abstractions (traits) that other layers implement
pub mod traits;
