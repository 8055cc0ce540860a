// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Every file the harness writes goes through this layer:
//
//   checkpoint.rs — Model weights and architecture configs
//                   Burn's NamedMpkGzFileRecorder at full
//                   precision for weights, burn Config JSON
//                   for the architecture.
//
//   metrics.rs    — The per-run text log and metrics CSV,
//                   persisted together with the checkpoint
//                   once a run completes.
//
//   plot.rs       — The two-panel comparison PNG (plotters).
//
// Training and the model adapters never touch the disk; they
// hand finished results to this layer instead.
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Run log and metrics CSV writer
pub mod metrics;

/// Loss / accuracy comparison chart
pub mod plot;
