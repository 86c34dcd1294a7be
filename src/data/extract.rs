// ============================================================
// Layer 4 — Feature and Label Extraction
// ============================================================
// Turns records into the numbers the networks consume:
//
//   extract_features → [Σ mean, Σ std] over the record's images
//   extract_labels   → reference signal, lead-major (L × S)
//   class_set        → sorted union of every dx label seen
//   multi_hot        → indicator vector over a class set
//
// No resampling and no check against the header-declared
// dimensions happens here; shape policy belongs to the caller.

use anyhow::Result;
use std::collections::BTreeSet;
use std::path::Path;

use crate::domain::features::FeatureVector;
use crate::domain::record::ReferenceSignal;
use crate::domain::traits::RecordSource;

/// Load the record's images and summarise them.
pub fn extract_features(source: &dyn RecordSource, record: &Path) -> Result<FeatureVector> {
    let images = source.load_images(record)?;
    Ok(FeatureVector::from_images(&images))
}

/// Ground-truth signal of the record, one row per lead.
pub fn extract_labels(source: &dyn RecordSource, record: &Path) -> Result<ReferenceSignal> {
    source.load_signal(record)
}

/// Sorted, de-duplicated union of all label sets.
pub fn class_set(dxs: &[Vec<String>]) -> Vec<String> {
    dxs.iter()
        .flatten()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// 1.0 for every class present in `dx`, 0.0 elsewhere. A record with
/// several labels gets several ones.
pub fn multi_hot(dx: &[String], classes: &[String]) -> Vec<f32> {
    classes
        .iter()
        .map(|c| if dx.contains(c) { 1.0 } else { 0.0 })
        .collect()
}
