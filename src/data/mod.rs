// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between a challenge folder on disk and the tensor
// batches the networks train on:
//
//   challenge folder
//       │
//       ▼
//   WfdbSource        → headers, images, reference signals
//       │
//       ▼
//   extract           → feature vectors, label tensors, classes
//       │
//       ▼
//   FitDataset        → implements Burn's Dataset trait
//       │
//       ▼
//   split_train_val   → trailing validation hold-out
//       │
//       ▼
//   FitBatcher        → stacks samples into tensor batches
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// WFDB header text parsing and rendering
pub mod header;

/// Reads (and writes) records in a challenge folder
pub mod loader;

/// Feature vectors, label tensors, and class encodings
pub mod extract;

/// Implements Burn's Dataset trait for training samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Splits samples into train/validation sets
pub mod splitter;
