// ============================================================
// Layer 4 — Fit Batcher
// ============================================================
// Implements Burn's Batcher trait to stack FitSamples into the
// tensors both networks train on.
//
// Shapes follow the (1, width) row convention used everywhere:
//
//   inputs:  [batch, 1, 2]
//   targets: [batch, rows, cols]
//              digitization → rows = leads (12), cols = samples (1000)
//              dx           → rows = 1,          cols = classes
//
// Targets are already flattened in row-major order, so stacking
// is a plain concatenation followed by a reshape.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::FitSample;
use crate::domain::features::FEATURE_WIDTH;

/// A batch of samples ready for the forward pass.
#[derive(Debug, Clone)]
pub struct FitBatch<B: Backend> {
    /// Feature rows, shape [batch_size, 1, 2]
    pub inputs: Tensor<B, 3>,

    /// Targets, shape [batch_size, rows, cols]
    pub targets: Tensor<B, 3>,
}

/// Holds the target device and the per-sample target shape.
#[derive(Clone, Debug)]
pub struct FitBatcher<B: Backend> {
    pub device:       B::Device,
    pub target_shape: [usize; 2],
}

impl<B: Backend> FitBatcher<B> {
    pub fn new(device: B::Device, target_shape: [usize; 2]) -> Self {
        Self { device, target_shape }
    }
}

impl<B: Backend> Batcher<FitSample, FitBatch<B>> for FitBatcher<B> {
    fn batch(&self, items: Vec<FitSample>) -> FitBatch<B> {
        let batch_size = items.len();
        let [rows, cols] = self.target_shape;

        let input_flat: Vec<f32> = items
            .iter()
            .flat_map(|s| s.features.iter().copied())
            .collect();

        let target_flat: Vec<f32> = items
            .iter()
            .flat_map(|s| s.target.iter().copied())
            .collect();

        let inputs = Tensor::<B, 3>::from_data(
            TensorData::new(input_flat, [batch_size, 1, FEATURE_WIDTH]),
            &self.device,
        );

        let targets = Tensor::<B, 3>::from_data(
            TensorData::new(target_flat, [batch_size, rows, cols]),
            &self.device,
        );

        FitBatch { inputs, targets }
    }
}
