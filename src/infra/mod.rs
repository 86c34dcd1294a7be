// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Handles the concerns that outlive a single call:
//
//   artifact.rs — Saving and loading the trained models
//                 Uses Burn's full-precision NamedMpkGz recorder to serialise
//                 network parameters to disk, next to a JSON
//                 payload that lets inference rebuild the
//                 network (and, for dx, map outputs back to
//                 class names).
//
//   metrics.rs  — Training metrics logging
//                 Writes epoch-level metrics (loss, accuracy)
//                 to a CSV file per task for later analysis.
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model artifact saving and loading
pub mod artifact;

/// Training metrics CSV logger
pub mod metrics;
