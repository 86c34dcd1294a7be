// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs, traits, and errors that define the core
// concepts of the challenge:
//
//   record.rs   — headers, images, reference and digitized signals
//   features.rs — the two-scalar feature vector
//   traits.rs   — RecordSource (external collaborators) and
//                 Persistable (artifact save/load)
//   error.rs    — the failure taxonomy surfaced to callers
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits

/// Record headers, images, and signals
pub mod record;

/// The per-record feature vector
pub mod features;

/// Core abstractions that other layers implement
pub mod traits;

/// Challenge error taxonomy
pub mod error;
