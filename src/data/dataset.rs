use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::domain::features::{FeatureVector, FEATURE_WIDTH};

/// One training example: a feature row and a flattened target.
///
/// The target layout is fixed by the task: lead-major
/// `leads × samples` for digitization, a multi-hot class vector
/// for dx. The batcher reshapes it accordingly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitSample {
    pub features: [f32; FEATURE_WIDTH],
    pub target:   Vec<f32>,
}

impl FitSample {
    pub fn new(features: &FeatureVector, target: Vec<f32>) -> Self {
        Self { features: features.to_f32(), target }
    }
}

pub struct FitDataset {
    samples: Vec<FitSample>,
}

impl FitDataset {
    pub fn new(samples: Vec<FitSample>) -> Self { Self { samples } }
}

impl Dataset<FitSample> for FitDataset {
    fn get(&self, index: usize) -> Option<FitSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
