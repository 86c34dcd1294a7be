// ============================================================
// Layer 5 — Inferencer
// ============================================================
// The two loaded models and what "running" each of them means.
//
// Digitization, placeholder policy:
//   The network is rebuilt from its artifact, but its output is
//   NOT returned. Instead a pseudo-random signal is drawn from a
//   generator seeded by round(mean(features)) and sized from the
//   record's header (num_samples × num_signals). The network's own
//   output is fixed at 12 × 1000 regardless of the header, so the
//   two shapes may differ; the header wins.
//
//   The seed-mean variant seeds with round(stored_mean + mean(features)).
//
// Dx:
//   The network gives a softmax over the classes for the record's
//   feature row; the forest gives a 0/1 vote per class. Either way
//   every class sharing the maximum score is returned. NaN entries
//   never win; an all-NaN output yields an empty label list.

use anyhow::Result;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::Path;

use crate::data::{extract::extract_features, loader::header_path};
use crate::domain::error::ChallengeError;
use crate::domain::features::FeatureVector;
use crate::domain::record::DigitizedSignal;
use crate::domain::traits::RecordSource;
use crate::ml::classifier::{DxClassifier, DxClassifierConfig};
use crate::ml::digitizer::{DigitizerConfig, DigitizerNetwork};
use crate::ml::forest::DxForest;
use crate::ml::{default_device, InferBackend};

/// Half-open range of the placeholder signal values.
pub const SIGNAL_LOW: f64 = -1000.0;
pub const SIGNAL_HIGH: f64 = 1000.0;

// ─── DigitizationModel ────────────────────────────────────────────────────────
/// A loaded digitization artifact.
#[derive(Debug)]
pub enum DigitizationModel {
    /// Attention-stack network plus the topology it was built from
    Network {
        config:  DigitizerConfig,
        network: DigitizerNetwork<InferBackend>,
    },
    /// Baseline: the mean of every training feature value
    SeedMean {
        mean: f64,
    },
}

impl DigitizationModel {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Network { .. }  => "network",
            Self::SeedMean { .. } => "seed-mean",
        }
    }

    /// Digitize one record. The result has the header's
    /// (num_samples, num_signals) shape.
    pub fn run(&self, source: &dyn RecordSource, record: &Path) -> Result<DigitizedSignal> {
        let features = extract_features(source, record)?;
        let header   = source.load_header(record)?;

        let seed_value = self.seed_value(&features);
        tracing::debug!(
            "Digitizing '{}' with {} model: seed value {:.3}, shape ({}, {})",
            record.display(),
            self.kind_name(),
            seed_value,
            header.num_samples,
            header.num_signals,
        );

        seeded_signal(seed_value, header.num_samples, header.num_signals).ok_or_else(|| {
            ChallengeError::Header {
                path:   header_path(record),
                reason: format!(
                    "{} samples × {} signals does not fit in memory",
                    header.num_samples, header.num_signals
                ),
            }
            .into()
        })
    }

    fn seed_value(&self, features: &FeatureVector) -> f64 {
        match self {
            Self::Network { .. }    => features.mean(),
            Self::SeedMean { mean } => mean + features.mean(),
        }
    }
}

/// Round half to even, then reinterpret as a 64-bit seed
/// (negative values wrap).
pub fn seed_from(value: f64) -> u64 {
    value.round_ties_even() as i64 as u64
}

/// Uniform noise in [-1000, 1000), truncated toward zero into i16.
/// `None` when the shape overflows `usize`.
pub fn seeded_signal(seed_value: f64, num_samples: usize, num_signals: usize) -> Option<DigitizedSignal> {
    let len = num_samples.checked_mul(num_signals)?;
    let mut rng = ChaCha8Rng::seed_from_u64(seed_from(seed_value));
    let values = (0..len)
        .map(|_| rng.gen_range(SIGNAL_LOW..SIGNAL_HIGH) as i16)
        .collect();
    Some(DigitizedSignal::new(num_samples, num_signals, values))
}

// ─── DxModel ──────────────────────────────────────────────────────────────────
/// What scores the classes of a dx model.
#[derive(Debug)]
pub enum DxPredictor {
    /// Feed-forward network plus the topology it was built from
    Network {
        config:  DxClassifierConfig,
        network: DxClassifier<InferBackend>,
    },
    /// One-vs-rest random forests
    RandomForest(DxForest),
}

impl DxPredictor {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Network { .. }  => "network",
            Self::RandomForest(_) => "random-forest",
        }
    }

    /// One score per class, in class order.
    pub fn scores(&self, features: &FeatureVector) -> Result<Vec<f32>> {
        match self {
            Self::Network { network, .. } => network.predict(features.to_f32(), &default_device()),
            Self::RandomForest(forest)    => forest.predict(features),
        }
    }
}

/// A loaded dx artifact: the predictor and the class list that maps
/// its output indices back to label names.
#[derive(Debug)]
pub struct DxModel {
    pub predictor: DxPredictor,
    pub classes:   Vec<String>,
}

impl DxModel {
    /// Classify one record. `signal` is accepted for interface
    /// symmetry; the prediction only uses the image features.
    pub fn run(
        &self,
        source:  &dyn RecordSource,
        record:  &Path,
        _signal: Option<&DigitizedSignal>,
    ) -> Result<Vec<String>> {
        let features = extract_features(source, record)?;
        let scores   = self.predictor.scores(&features)?;

        tracing::debug!(
            "Dx {} scores for '{}': {:?}",
            self.predictor.kind_name(),
            record.display(),
            scores
        );
        Ok(select_labels(&scores, &self.classes))
    }
}

/// Every class whose probability equals the maximum, in class order.
pub fn select_labels(probabilities: &[f32], classes: &[String]) -> Vec<String> {
    let max = probabilities
        .iter()
        .copied()
        .filter(|p| !p.is_nan())
        .reduce(f32::max);

    let Some(max) = max else {
        return Vec::new();
    };

    probabilities
        .iter()
        .zip(classes)
        .filter(|(p, _)| **p == max)
        .map(|(_, c)| c.clone())
        .collect()
}
