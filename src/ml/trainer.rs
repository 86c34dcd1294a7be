// ============================================================
// Layer 5 — Training Loop
// ============================================================
// One fit loop serves both networks. A network plugs in by
// implementing `Objective` (its loss, and optionally how many
// samples of a batch it classifies correctly).
//
// Key Burn insight:
//   - Training uses TrainBackend (Autodiff<InferBackend>)
//   - model.valid() returns the model on InferBackend
//   - the validation batcher must also use InferBackend
//
// Per epoch:
//   train phase  → forward, loss, backward, Adam step
//   valid phase  → loss (+ accuracy) on the held-out tail, if any
//   log          → tracing + optional metrics CSV row
//
// No early stopping and no checkpointing: training runs every
// epoch to completion and the final weights are returned.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::data::{
    batcher::FitBatcher,
    dataset::{FitDataset, FitSample},
    splitter::split_train_val,
};
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::{default_device, InferBackend, TrainBackend};

/// What the fit loop needs from a network.
pub trait Objective<B: Backend> {
    /// Mean loss over the batch, shape [1].
    fn loss(&self, inputs: Tensor<B, 3>, targets: Tensor<B, 3>) -> Tensor<B, 1>;

    /// Samples of the batch predicted correctly, for tasks where that
    /// means something.
    fn correct(&self, _inputs: Tensor<B, 3>, _targets: Tensor<B, 3>) -> Option<usize> {
        None
    }
}

// ─── FitConfig ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitConfig {
    pub epochs:              usize,
    pub batch_size:          usize,
    pub learning_rate:       f64,
    /// Trailing fraction held out for validation; 0.0 disables it
    pub validation_fraction: f64,
    /// Seed for the per-epoch shuffle of the training set
    pub seed:                u64,
}

impl FitConfig {
    /// MSE regression of the signal: no validation, lr 1e-4.
    pub fn digitization() -> Self {
        Self {
            epochs:              20,
            batch_size:          32,
            learning_rate:       1e-4,
            validation_fraction: 0.0,
            seed:                42,
        }
    }

    /// Cross-entropy classification: 20% validation, Adam's default lr.
    pub fn dx() -> Self {
        Self {
            epochs:              20,
            batch_size:          32,
            learning_rate:       1e-3,
            validation_fraction: 0.2,
            seed:                42,
        }
    }
}

// ─── Context for logging ──────────────────────────────────────────────────────
/// Where progress goes: the task name tags log lines and metric rows.
pub struct FitReporter<'a> {
    pub task:    &'a str,
    pub verbose: bool,
    pub metrics: Option<&'a MetricsLogger>,
}

/// Train `model` on `samples` and return the trained network on the
/// inference backend.
pub fn fit<M>(
    model:        M,
    cfg:          &FitConfig,
    target_shape: [usize; 2],
    samples:      Vec<FitSample>,
    reporter:     &FitReporter<'_>,
) -> Result<M::InnerModule>
where
    M: AutodiffModule<TrainBackend> + Objective<TrainBackend>,
    M::InnerModule: Objective<InferBackend>,
{
    let device = default_device();
    let mut model = model;

    let (train_samples, val_samples) = split_train_val(samples, cfg.validation_fraction);
    let has_validation = !val_samples.is_empty();

    // ── Adam optimiser ────────────────────────────────────────────────────────
    let mut optim = AdamConfig::new().init::<TrainBackend, M>();

    // ── Training data loader (AutodiffBackend) ────────────────────────────────
    let train_batcher = FitBatcher::<TrainBackend>::new(device.clone(), target_shape);
    let train_loader  = DataLoaderBuilder::new(train_batcher)
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(FitDataset::new(train_samples));

    // ── Validation data loader (InnerBackend, no autodiff) ─────────────────────
    let val_batcher = FitBatcher::<InferBackend>::new(device.clone(), target_shape);
    let val_loader  = DataLoaderBuilder::new(val_batcher)
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(FitDataset::new(val_samples));

    for epoch in 1..=cfg.epochs {

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;

        for batch in train_loader.iter() {
            let loss = model.loss(batch.inputs, batch.targets);

            train_loss_sum += loss.clone().into_scalar().elem::<f64>();
            train_batches  += 1;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.learning_rate, model, grads);
        }

        let train_loss = mean_or_nan(train_loss_sum, train_batches);

        // ── Validation phase ──────────────────────────────────────────────────
        let (val_loss, val_accuracy) = if has_validation {
            let model_valid = model.valid();

            let mut val_loss_sum = 0.0f64;
            let mut val_batches  = 0usize;
            let mut correct      = None::<usize>;
            let mut total        = 0usize;

            for batch in val_loader.iter() {
                total += batch.inputs.dims()[0];
                if let Some(hits) = model_valid.correct(batch.inputs.clone(), batch.targets.clone()) {
                    *correct.get_or_insert(0) += hits;
                }
                val_loss_sum += model_valid
                    .loss(batch.inputs, batch.targets)
                    .into_scalar()
                    .elem::<f64>();
                val_batches  += 1;
            }

            let accuracy = correct.map(|c| c as f64 / total.max(1) as f64);
            (Some(mean_or_nan(val_loss_sum, val_batches)), accuracy)
        } else {
            (None, None)
        };

        let row = EpochMetrics::new(epoch, train_loss, val_loss, val_accuracy);
        report_epoch(reporter, cfg.epochs, &row);
        if let Some(metrics) = reporter.metrics {
            metrics.log(&row)?;
        }
    }

    tracing::debug!("{} training complete", reporter.task);
    Ok(model.valid())
}

fn mean_or_nan(sum: f64, count: usize) -> f64 {
    if count > 0 { sum / count as f64 } else { f64::NAN }
}

fn report_epoch(reporter: &FitReporter<'_>, epochs: usize, m: &EpochMetrics) {
    let mut line = format!(
        "[{}] Epoch {:>3}/{} | loss={:.4}",
        reporter.task, m.epoch, epochs, m.train_loss
    );
    if let Some(v) = m.val_loss {
        line.push_str(&format!(" | val_loss={v:.4}"));
    }
    if let Some(a) = m.val_accuracy {
        line.push_str(&format!(" | val_acc={:.1}%", a * 100.0));
    }

    if reporter.verbose {
        tracing::info!("{line}");
    } else {
        tracing::debug!("{line}");
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::features::FeatureVector;
    use crate::ml::classifier::DxClassifierConfig;
    use crate::ml::digitizer::DigitizerConfig;

    fn quiet() -> FitReporter<'static> {
        FitReporter { task: "test", verbose: false, metrics: None }
    }

    fn short(mut cfg: FitConfig) -> FitConfig {
        cfg.epochs = 2;
        cfg.batch_size = 4;
        cfg
    }

    #[test]
    fn test_default_fit_settings() {
        let d = FitConfig::digitization();
        assert_eq!((d.epochs, d.batch_size, d.learning_rate), (20, 32, 1e-4));
        assert_eq!(d.validation_fraction, 0.0);

        let x = FitConfig::dx();
        assert_eq!((x.epochs, x.batch_size), (20, 32));
        assert_eq!(x.validation_fraction, 0.2);
    }

    #[test]
    fn test_fit_dx_returns_inference_model() {
        let device = default_device();
        let samples: Vec<FitSample> = (0..10)
            .map(|i| {
                let f = FeatureVector::new(i as f64 * 10.0, 1.0);
                let target = if i % 2 == 0 { vec![1.0, 0.0] } else { vec![0.0, 1.0] };
                FitSample::new(&f, target)
            })
            .collect();

        let model = DxClassifierConfig::new(2).init::<TrainBackend>(&device);
        let trained = fit(model, &short(FitConfig::dx()), [1, 2], samples, &quiet()).unwrap();

        let probs = trained.predict([50.0, 1.0], &device).unwrap();
        assert_eq!(probs.len(), 2);
    }

    #[test]
    fn test_fit_digitizer_writes_metrics() {
        let tmp = tempfile::tempdir().unwrap();
        let metrics = MetricsLogger::new(tmp.path(), "digitization").unwrap();
        let reporter = FitReporter { task: "digitization", verbose: true, metrics: Some(&metrics) };

        let cfg = DigitizerConfig::new()
            .with_head_size(4)
            .with_num_heads(2)
            .with_num_blocks(1)
            .with_mlp_units(vec![8])
            .with_num_leads(2)
            .with_num_samples(3);
        let device = default_device();
        let samples = vec![
            FitSample::new(&FeatureVector::new(1.0, 0.0), vec![0.5; 6]),
            FitSample::new(&FeatureVector::new(2.0, 0.0), vec![0.25; 6]),
        ];

        let trained = fit(
            cfg.init::<TrainBackend>(&device),
            &short(FitConfig::digitization()),
            cfg.output_shape(),
            samples,
            &reporter,
        )
        .unwrap();

        assert_eq!(trained.forward_features([1.0, 0.0], &device).dims(), [1, 2, 3]);
        let csv = std::fs::read_to_string(metrics.csv_path()).unwrap();
        // header + one row per epoch
        assert_eq!(csv.lines().count(), 3);
    }
}
