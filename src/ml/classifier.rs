use anyhow::{anyhow, Result};
use burn::{
    nn::{Dropout, DropoutConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation::{log_softmax, relu, softmax},
};

use crate::domain::features::FEATURE_WIDTH;
use crate::ml::trainer::Objective;

/// dense(64, relu) → dropout → dense(64, relu) → dropout → dense(C, softmax)
#[derive(Config, Debug)]
pub struct DxClassifierConfig {
    /// Size of the class label set fixed at training time
    pub num_classes: usize,
    #[config(default = 2)]
    pub input_width: usize,
    #[config(default = 64)]
    pub hidden:      usize,
    #[config(default = 0.5)]
    pub dropout:     f64,
}

impl DxClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> DxClassifier<B> {
        DxClassifier {
            hidden1: LinearConfig::new(self.input_width, self.hidden).init(device),
            hidden2: LinearConfig::new(self.hidden, self.hidden).init(device),
            output:  LinearConfig::new(self.hidden, self.num_classes).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }
}

#[derive(Module, Debug)]
pub struct DxClassifier<B: Backend> {
    pub hidden1: Linear<B>,
    pub hidden2: Linear<B>,
    pub output:  Linear<B>,
    pub dropout: Dropout,
}

impl<B: Backend> DxClassifier<B> {
    /// inputs: [batch, 1, 2] → logits [batch, 1, classes]
    pub fn forward(&self, inputs: Tensor<B, 3>) -> Tensor<B, 3> {
        let x = self.dropout.forward(relu(self.hidden1.forward(inputs)));
        let x = self.dropout.forward(relu(self.hidden2.forward(x)));
        self.output.forward(x)
    }

    /// Softmax over the class axis.
    pub fn probabilities(&self, inputs: Tensor<B, 3>) -> Tensor<B, 3> {
        softmax(self.forward(inputs), 2)
    }

    /// Class probabilities for a single feature row.
    pub fn predict(&self, features: [f32; FEATURE_WIDTH], device: &B::Device) -> Result<Vec<f32>> {
        let inputs = Tensor::<B, 3>::from_data(
            TensorData::new(features.to_vec(), [1, 1, FEATURE_WIDTH]),
            device,
        );
        self.probabilities(inputs)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("Cannot read dx probabilities: {e:?}"))
    }
}

impl<B: Backend> Objective<B> for DxClassifier<B> {
    /// Categorical cross-entropy against (possibly multi-hot) targets:
    /// −Σ_c y_c · log p_c, averaged over the batch.
    fn loss(&self, inputs: Tensor<B, 3>, targets: Tensor<B, 3>) -> Tensor<B, 1> {
        let log_probs = log_softmax(self.forward(inputs), 2);
        (targets * log_probs).sum_dim(2).mean().neg()
    }

    /// Argmax of the prediction equals argmax of the target.
    fn correct(&self, inputs: Tensor<B, 3>, targets: Tensor<B, 3>) -> Option<usize> {
        let predicted = self.forward(inputs).argmax(2);
        let expected  = targets.argmax(2);
        let hits: i64 = predicted.equal(expected).int().sum().into_scalar().elem::<i64>();
        Some(hits as usize)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::InferBackend;
    use burn::module::Param;

    #[test]
    fn test_probabilities_sum_to_one() {
        let device = Default::default();
        let model: DxClassifier<InferBackend> = DxClassifierConfig::new(3).init(&device);

        let probs = model.predict([100.0, 20.0], &device).unwrap();
        assert_eq!(probs.len(), 3);
        let total: f32 = probs.iter().sum();
        assert!((total - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_logits_shape() {
        let device = Default::default();
        let model: DxClassifier<InferBackend> = DxClassifierConfig::new(5).init(&device);
        let inputs = Tensor::<InferBackend, 3>::zeros([4, 1, 2], &device);
        assert_eq!(model.forward(inputs).dims(), [4, 1, 5]);
    }

    #[test]
    fn test_loss_is_positive() {
        let device = Default::default();
        let model: DxClassifier<InferBackend> = DxClassifierConfig::new(2).init(&device);
        let inputs  = Tensor::<InferBackend, 3>::ones([2, 1, 2], &device);
        let targets = Tensor::<InferBackend, 3>::from_data(
            TensorData::new(vec![1.0f32, 0.0, 0.0, 1.0], [2, 1, 2]),
            &device,
        );

        let loss = model.loss(inputs, targets).into_scalar();
        assert!(loss > 0.0 && loss.is_finite());
    }

    #[test]
    fn test_correct_counts_argmax_matches() {
        let device = Default::default();
        let mut model: DxClassifier<InferBackend> = DxClassifierConfig::new(2).init(&device);
        // zero weights leave only the bias: every row predicts class 1
        model.output.weight = Param::from_tensor(Tensor::zeros([64, 2], &device));
        model.output.bias = Some(Param::from_tensor(Tensor::from_data(
            TensorData::new(vec![0.0f32, 1.0], [2]),
            &device,
        )));

        let inputs = Tensor::<InferBackend, 3>::zeros([3, 1, 2], &device);
        let targets = Tensor::<InferBackend, 3>::from_data(
            TensorData::new(vec![1.0f32, 0.0, 0.0, 1.0, 1.0, 0.0], [3, 1, 2]),
            &device,
        );

        assert_eq!(model.correct(inputs, targets), Some(1));
    }
}
