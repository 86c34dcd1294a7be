use burn::{
    nn::{
        loss::{MseLoss, Reduction},
        Dropout, DropoutConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::{relu, sigmoid, softmax},
};

use crate::domain::features::FEATURE_WIDTH;
use crate::ml::trainer::Objective;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally. Do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct DigitizerConfig {
    /// Width of one feature row
    #[config(default = 2)]
    pub input_width:       usize,
    /// Rows per input; every record contributes exactly one
    #[config(default = 1)]
    pub input_rows:        usize,
    /// Projection size of each attention head
    #[config(default = 256)]
    pub head_size:         usize,
    #[config(default = 4)]
    pub num_heads:         usize,
    #[config(default = 4)]
    pub num_blocks:        usize,
    #[config(default = "vec![128, 64]")]
    pub mlp_units:         Vec<usize>,
    #[config(default = 0.1)]
    pub mlp_dropout:       f64,
    #[config(default = 0.1)]
    pub attention_dropout: f64,
    #[config(default = 1e-6)]
    pub norm_epsilon:      f64,
    /// Fixed output shape, independent of any record header
    #[config(default = 12)]
    pub num_leads:         usize,
    #[config(default = 1000)]
    pub num_samples:       usize,
}

impl DigitizerConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> DigitizerNetwork<B> {
        let blocks: Vec<AttentionBlock<B>> = (0..self.num_blocks)
            .map(|_| self.build_block(device))
            .collect();

        let mut mlp   = Vec::with_capacity(self.mlp_units.len());
        let mut width = self.input_rows * self.input_width;
        for &units in &self.mlp_units {
            mlp.push(LinearConfig::new(width, units).init(device));
            width = units;
        }

        DigitizerNetwork {
            blocks,
            mlp,
            dropout:     DropoutConfig::new(self.mlp_dropout).init(),
            head:        LinearConfig::new(width, self.num_leads * self.num_samples).init(device),
            num_leads:   self.num_leads,
            num_samples: self.num_samples,
        }
    }

    /// `[num_leads, num_samples]`, the per-record target shape.
    pub fn output_shape(&self) -> [usize; 2] {
        [self.num_leads, self.num_samples]
    }

    fn build_block<B: Backend>(&self, device: &B::Device) -> AttentionBlock<B> {
        let d_model = self.input_width;
        let d_inner = self.num_heads * self.head_size;
        let attention = SelfAttention {
            query:     LinearConfig::new(d_model, d_inner).init(device),
            key:       LinearConfig::new(d_model, d_inner).init(device),
            value:     LinearConfig::new(d_model, d_inner).init(device),
            output:    LinearConfig::new(d_inner, d_model).init(device),
            dropout:   DropoutConfig::new(self.attention_dropout).init(),
            num_heads: self.num_heads,
            head_size: self.head_size,
        };
        AttentionBlock {
            attention,
            attention_norm: LayerNormConfig::new(d_model).with_epsilon(self.norm_epsilon).init(device),
            projection:     LinearConfig::new(d_model, d_model).init(device),
            output_norm:    LayerNormConfig::new(d_model).with_epsilon(self.norm_epsilon).init(device),
        }
    }
}

// ─── SelfAttention ────────────────────────────────────────────────────────────
// Burn's MultiHeadAttention ties the head size to d_model / heads.
// Here the model width is 2 while each head projects to 256, so
// the projections are spelled out.
#[derive(Module, Debug)]
pub struct SelfAttention<B: Backend> {
    pub query:     Linear<B>,
    pub key:       Linear<B>,
    pub value:     Linear<B>,
    pub output:    Linear<B>,
    pub dropout:   Dropout,
    pub num_heads: usize,
    pub head_size: usize,
}

impl<B: Backend> SelfAttention<B> {
    /// x: [batch, rows, d_model] → [batch, rows, d_model]
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch, rows, _] = x.dims();
        let heads = |t: Tensor<B, 3>| {
            t.reshape([batch, rows, self.num_heads, self.head_size])
                .swap_dims(1, 2) // [batch, heads, rows, head_size]
        };

        let q = heads(self.query.forward(x.clone()));
        let k = heads(self.key.forward(x.clone()));
        let v = heads(self.value.forward(x));

        let scores  = q.matmul(k.swap_dims(2, 3)).div_scalar((self.head_size as f64).sqrt());
        let weights = self.dropout.forward(softmax(scores, 3));
        let context = weights
            .matmul(v)
            .swap_dims(1, 2)
            .reshape([batch, rows, self.num_heads * self.head_size]);

        self.output.forward(context)
    }
}

// ─── AttentionBlock ───────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct AttentionBlock<B: Backend> {
    pub attention:      SelfAttention<B>,
    pub attention_norm: LayerNorm<B>,
    pub projection:     Linear<B>,
    pub output_norm:    LayerNorm<B>,
}

impl<B: Backend> AttentionBlock<B> {
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let attended  = self.attention.forward(x.clone());
        let normed    = self.attention_norm.forward(attended.clone() + x);
        // The projection is added to the raw attention output,
        // not to the normalised residual.
        let projected = self.projection.forward(normed);
        self.output_norm.forward(attended + projected)
    }
}

// ─── DigitizerNetwork ─────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct DigitizerNetwork<B: Backend> {
    pub blocks:      Vec<AttentionBlock<B>>,
    pub mlp:         Vec<Linear<B>>,
    pub dropout:     Dropout,
    pub head:        Linear<B>,
    pub num_leads:   usize,
    pub num_samples: usize,
}

impl<B: Backend> DigitizerNetwork<B> {
    /// inputs: [batch, rows, 2] → [batch, num_leads, num_samples], values in (0, 1)
    pub fn forward(&self, inputs: Tensor<B, 3>) -> Tensor<B, 3> {
        let mut x = inputs;
        for block in &self.blocks {
            x = block.forward(x);
        }

        let [batch, rows, width] = x.dims();
        let mut h: Tensor<B, 2> = x.reshape([batch, rows * width]);
        for layer in &self.mlp {
            h = self.dropout.forward(relu(layer.forward(h)));
        }

        sigmoid(self.head.forward(h)).reshape([batch, self.num_leads, self.num_samples])
    }

    /// Single-record convenience: one feature row in, one signal out.
    pub fn forward_features(&self, features: [f32; FEATURE_WIDTH], device: &B::Device) -> Tensor<B, 3> {
        let inputs = Tensor::<B, 3>::from_data(
            TensorData::new(features.to_vec(), [1, 1, FEATURE_WIDTH]),
            device,
        );
        self.forward(inputs)
    }
}

impl<B: Backend> Objective<B> for DigitizerNetwork<B> {
    /// Mean squared error over every lead and sample.
    fn loss(&self, inputs: Tensor<B, 3>, targets: Tensor<B, 3>) -> Tensor<B, 1> {
        let predicted = self.forward(inputs);
        MseLoss::new().forward(predicted, targets, Reduction::Mean)
    }
}
