// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn framework specific code lives here. Other layers
// only see the backend aliases and the loaded model types.
//
//   digitizer.rs  — attention-stack network mapping the feature
//                   row (1 × 2) to a (12 × 1000) signal in [0, 1]
//
//   classifier.rs — small feed-forward dx network producing one
//                   probability per class
//
//   forest.rs     — one-vs-rest random forests (smartcore), the
//                   tree-ensemble dx alternative
//
//   trainer.rs    — the shared fit loop: Adam, shuffled batches,
//                   optional trailing validation, per-epoch metrics
//
//   inferencer.rs — loaded models and their run policies:
//                   seeded-noise digitization, max-probability
//                   dx selection with ties
//
// Backends:
//   default        → NdArray (CPU)
//   feature "wgpu" → Wgpu (GPU)
// Training always wraps the chosen backend in Autodiff.
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)

/// Attention-stack digitization network
pub mod digitizer;

/// Feed-forward dx classification network
pub mod classifier;

/// One-vs-rest random forest dx classifier
pub mod forest;

/// Shared training loop
pub mod trainer;

/// Loaded models and inference post-processing
pub mod inferencer;

#[cfg(not(feature = "wgpu"))]
pub type InferBackend = burn::backend::NdArray;

#[cfg(feature = "wgpu")]
pub type InferBackend = burn::backend::Wgpu;

pub type TrainBackend = burn::backend::Autodiff<InferBackend>;

/// Device used for both training and inference.
pub fn default_device() -> <InferBackend as burn::tensor::backend::Backend>::Device {
    Default::default()
}
