// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates both training pipelines.
//
// Digitization:
//   Step 1: Find records                 (Layer 4 - data)
//   Step 2: Extract features + labels    (Layer 4 - data)
//   Step 3: Fit the chosen digitizer     (Layer 5 - ml)
//   Step 4: Save the artifact            (Layer 6 - infra)
//
// Dx:
//   Step 1: Find records                 (Layer 4 - data)
//   Step 2: Keep labelled records only,
//           extract their features       (Layer 4 - data)
//   Step 3: Fix the class set, encode    (Layer 4 - data)
//   Step 4: Fit the network or forests   (Layer 5 - ml)
//   Step 5: Save model + class list      (Layer 6 - infra)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::application::narrate;
use crate::data::{
    dataset::FitSample,
    extract::{class_set, extract_features, extract_labels, multi_hot},
    loader::WfdbSource,
};
use crate::domain::{
    error::ChallengeError,
    features::FeatureVector,
    traits::{Persistable, RecordSource},
};
use crate::infra::metrics::MetricsLogger;
use crate::ml::{
    classifier::DxClassifierConfig,
    default_device,
    digitizer::DigitizerConfig,
    forest::{DxForest, DxForestConfig},
    inferencer::{DigitizationModel, DxModel, DxPredictor},
    trainer::{fit, FitConfig, FitReporter},
    TrainBackend,
};

/// Which digitization model a training run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigitizerKind {
    /// Attention stack + MLP regressor
    #[default]
    Network,
    /// Mean of all training feature values
    SeedMean,
}

/// Which dx model a training run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DxKind {
    /// Feed-forward softmax network
    #[default]
    Network,
    /// One-vs-rest random forests
    RandomForest,
}

/// Which models a training run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Digitization,
    Dx,
    Both,
}

// ─── Training Configuration ──────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub digitizer_kind:   DigitizerKind,
    pub digitizer:        DigitizerConfig,
    pub digitization_fit: FitConfig,
    pub dx_kind:          DxKind,
    pub dx_fit:           FitConfig,
    pub dx_forest:        DxForestConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            digitizer_kind:   DigitizerKind::default(),
            digitizer:        DigitizerConfig::new(),
            digitization_fit: FitConfig::digitization(),
            dx_kind:          DxKind::default(),
            dx_fit:           FitConfig::dx(),
            dx_forest:        DxForestConfig::default(),
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Train the models `task` asks for on the records of `data_folder`.
    pub fn execute(
        &self,
        source:       &dyn RecordSource,
        task:         Task,
        data_folder:  &Path,
        model_folder: &Path,
        verbose:      bool,
    ) -> Result<()> {
        if matches!(task, Task::Digitization | Task::Both) {
            self.train_digitization(source, data_folder, model_folder, verbose)?;
        }
        if matches!(task, Task::Dx | Task::Both) {
            self.train_dx(source, data_folder, model_folder, verbose)?;
        }
        Ok(())
    }

    /// Train, save and return the digitization model.
    pub fn train_digitization(
        &self,
        source:       &dyn RecordSource,
        data_folder:  &Path,
        model_folder: &Path,
        verbose:      bool,
    ) -> Result<DigitizationModel> {
        let cfg = &self.config;

        // ── Step 1: Find the records ─────────────────────────────────────────
        narrate!(verbose, "Finding the Challenge data...");
        let records = find_records(source, data_folder)?;

        // ── Step 2: Extract features (and labels for the network) ────────────
        narrate!(verbose, "Training the digitization model...");
        narrate!(verbose, "Extracting features and labels from the data...");

        let expected = {
            let [leads, samples] = cfg.digitizer.output_shape();
            (leads, samples)
        };
        let needs_labels = cfg.digitizer_kind == DigitizerKind::Network;

        let mut features_seen = Vec::with_capacity(records.len());
        let mut samples       = Vec::with_capacity(records.len());
        for (i, relative) in records.iter().enumerate() {
            narrate_progress(verbose, i, records.len(), relative);
            let record   = data_folder.join(relative);
            let features = extract_features(source, &record)?;

            let target = if needs_labels {
                let labels = extract_labels(source, &record)?;
                if labels.shape() != expected {
                    return Err(ChallengeError::LabelShape {
                        record:   relative.display().to_string(),
                        expected,
                        actual:   labels.shape(),
                    }
                    .into());
                }
                labels.values().to_vec()
            } else {
                Vec::new()
            };
            samples.push(FitSample::new(&features, target));
            features_seen.push(features);
        }

        // ── Step 3: Fit ──────────────────────────────────────────────────────
        let model = match cfg.digitizer_kind {
            DigitizerKind::Network => {
                narrate!(verbose, "Fitting the attention network on {} records...", samples.len());
                let metrics  = MetricsLogger::new(model_folder, "digitization")?;
                let reporter = FitReporter { task: "digitization", verbose, metrics: Some(&metrics) };

                let network = fit(
                    cfg.digitizer.init::<TrainBackend>(&default_device()),
                    &cfg.digitization_fit,
                    cfg.digitizer.output_shape(),
                    samples,
                    &reporter,
                )?;
                DigitizationModel::Network { config: cfg.digitizer.clone(), network }
            }
            DigitizerKind::SeedMean => {
                let mean = feature_mean(&features_seen);
                narrate!(verbose, "Mean training feature value: {mean:.4}");
                DigitizationModel::SeedMean { mean }
            }
        };

        // ── Step 4: Save ─────────────────────────────────────────────────────
        model.save(model_folder)?;
        narrate!(verbose, "Done. Saved the digitization model to '{}'.", model_folder.display());
        Ok(model)
    }

    /// Train, save and return the dx model.
    pub fn train_dx(
        &self,
        source:       &dyn RecordSource,
        data_folder:  &Path,
        model_folder: &Path,
        verbose:      bool,
    ) -> Result<DxModel> {
        // ── Step 1: Find the records ─────────────────────────────────────────
        narrate!(verbose, "Finding the Challenge data...");
        let records = find_records(source, data_folder)?;

        // ── Step 2: Labelled records only ────────────────────────────────────
        narrate!(verbose, "Training the dx classification model...");
        narrate!(verbose, "Extracting features and labels from the data...");

        let mut features = Vec::new();
        let mut dxs      = Vec::new();
        for (i, relative) in records.iter().enumerate() {
            narrate_progress(verbose, i, records.len(), relative);
            let record = data_folder.join(relative);
            let dx     = source.load_dx(&record)?;
            if dx.is_empty() {
                tracing::debug!("Skipping unlabelled record '{}'", relative.display());
                continue;
            }
            features.push(extract_features(source, &record)?);
            dxs.push(dx);
        }

        if dxs.is_empty() {
            return Err(ChallengeError::NoLabels { folder: data_folder.to_path_buf() }.into());
        }

        // ── Step 3: Class set + multi-hot targets ────────────────────────────
        let classes = class_set(&dxs);
        narrate!(verbose, "{} labelled records, {} classes: {:?}", dxs.len(), classes.len(), classes);

        let targets: Vec<Vec<f32>> = dxs.iter().map(|dx| multi_hot(dx, &classes)).collect();

        // ── Step 4: Fit ──────────────────────────────────────────────────────
        let predictor = match self.config.dx_kind {
            DxKind::Network => {
                let samples: Vec<FitSample> = features
                    .iter()
                    .zip(targets)
                    .map(|(f, target)| FitSample::new(f, target))
                    .collect();

                let config   = DxClassifierConfig::new(classes.len());
                let metrics  = MetricsLogger::new(model_folder, "dx")?;
                let reporter = FitReporter { task: "dx", verbose, metrics: Some(&metrics) };

                let network = fit(
                    config.init::<TrainBackend>(&default_device()),
                    &self.config.dx_fit,
                    [1, classes.len()],
                    samples,
                    &reporter,
                )?;
                DxPredictor::Network { config, network }
            }
            DxKind::RandomForest => {
                narrate!(
                    verbose,
                    "Fitting {} one-vs-rest forests of {} trees...",
                    classes.len(),
                    self.config.dx_forest.n_trees
                );
                DxPredictor::RandomForest(DxForest::fit(&self.config.dx_forest, &features, &targets)?)
            }
        };

        // ── Step 5: Save ─────────────────────────────────────────────────────
        let model = DxModel { predictor, classes };
        model.save(model_folder)?;
        narrate!(verbose, "Done. Saved the dx model to '{}'.", model_folder.display());
        Ok(model)
    }
}

// ─── Entry points ─────────────────────────────────────────────────────────────

/// Train the digitization model on a challenge folder with the default
/// configuration and write it to `model_folder`.
pub fn train_digitization_model(data_folder: &Path, model_folder: &Path, verbose: bool) -> Result<()> {
    TrainUseCase::new(TrainConfig::default())
        .train_digitization(&WfdbSource::new(), data_folder, model_folder, verbose)
        .map(|_| ())
}

/// Train the dx model on a challenge folder with the default
/// configuration and write it to `model_folder`.
pub fn train_dx_model(data_folder: &Path, model_folder: &Path, verbose: bool) -> Result<()> {
    TrainUseCase::new(TrainConfig::default())
        .train_dx(&WfdbSource::new(), data_folder, model_folder, verbose)
        .map(|_| ())
}

fn find_records(source: &dyn RecordSource, data_folder: &Path) -> Result<Vec<PathBuf>> {
    let records = source.find_records(data_folder)?;
    if records.is_empty() {
        return Err(ChallengeError::NoData { folder: data_folder.to_path_buf() }.into());
    }
    Ok(records)
}

fn narrate_progress(verbose: bool, index: usize, total: usize, record: &Path) {
    let width = total.to_string().len();
    narrate!(verbose, "- {:>width$}/{}: {}...", index + 1, total, record.display(), width = width);
}

/// Mean over every feature value of every sample.
fn feature_mean(features: &[FeatureVector]) -> f64 {
    let values: Vec<f64> = features.iter().flat_map(|f| f.as_array()).collect();
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{FakeRecord, FakeSource};

    fn quick() -> TrainConfig {
        let mut cfg = TrainConfig::default();
        cfg.digitizer = DigitizerConfig::new()
            .with_head_size(4)
            .with_num_heads(2)
            .with_num_blocks(1)
            .with_mlp_units(vec![8])
            .with_num_leads(2)
            .with_num_samples(5);
        cfg.digitization_fit.epochs = 1;
        cfg.dx_fit.epochs = 1;
        cfg
    }

    fn folder() -> &'static Path {
        Path::new("data")
    }

    #[test]
    fn test_no_records_is_no_data_for_both_tasks() {
        let tmp = tempfile::tempdir().unwrap();
        let source = FakeSource::default();
        let use_case = TrainUseCase::new(quick());

        for err in [
            use_case.train_digitization(&source, folder(), tmp.path(), false).unwrap_err(),
            use_case.train_dx(&source, folder(), tmp.path(), false).map(|_| ()).unwrap_err(),
        ] {
            assert!(matches!(
                err.downcast_ref::<ChallengeError>(),
                Some(ChallengeError::NoData { .. })
            ));
        }
    }

    #[test]
    fn test_missing_folder_on_disk_is_no_data() {
        let tmp = tempfile::tempdir().unwrap();
        let err = train_dx_model(&tmp.path().join("missing"), tmp.path(), false).unwrap_err();
        assert!(err.to_string().starts_with("No data was provided"));
    }

    #[test]
    fn test_unlabelled_records_only_is_no_labels() {
        let tmp = tempfile::tempdir().unwrap();
        let source = FakeSource::default()
            .with("a", FakeRecord::constant(10.0, 2, 5))
            .with("b", FakeRecord::constant(20.0, 2, 5));

        let err = TrainUseCase::new(quick())
            .train_dx(&source, folder(), tmp.path(), false)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ChallengeError>(),
            Some(ChallengeError::NoLabels { .. })
        ));
    }

    #[test]
    fn test_dx_skips_unlabelled_and_sorts_classes() {
        let tmp = tempfile::tempdir().unwrap();
        let source = FakeSource::default()
            .with("a", FakeRecord::constant(10.0, 2, 5).labelled(&["STTC"]))
            .with("b", FakeRecord::constant(20.0, 2, 5))
            .with("c", FakeRecord::constant(30.0, 2, 5).labelled(&["NORM", "MI"]));

        let model = TrainUseCase::new(quick())
            .train_dx(&source, folder(), tmp.path(), true)
            .unwrap();

        assert_eq!(model.classes, vec!["MI", "NORM", "STTC"]);
        assert!(tmp.path().join("dx_model.json").exists());
        assert!(tmp.path().join("dx_metrics.csv").exists());
        // the unlabelled record never had its images read
        assert_eq!(source.image_loads(), 2);
    }

    #[test]
    fn test_network_rejects_mismatched_label_shape() {
        let tmp = tempfile::tempdir().unwrap();
        let source = FakeSource::default().with("a", FakeRecord::constant(10.0, 3, 5));

        let err = TrainUseCase::new(quick())
            .train_digitization(&source, folder(), tmp.path(), false)
            .unwrap_err();
        match err.downcast_ref::<ChallengeError>() {
            Some(ChallengeError::LabelShape { expected, actual, .. }) => {
                assert_eq!(*expected, (2, 5));
                assert_eq!(*actual, (3, 5));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_seed_mean_ignores_labels() {
        let tmp = tempfile::tempdir().unwrap();
        // label shapes disagree with the network; the baseline never reads them
        let source = FakeSource::default()
            .with("a", FakeRecord::constant(10.0, 3, 7))
            .with("b", FakeRecord::constant(30.0, 1, 1));

        let mut cfg = quick();
        cfg.digitizer_kind = DigitizerKind::SeedMean;
        let model = TrainUseCase::new(cfg)
            .train_digitization(&source, folder(), tmp.path(), false)
            .unwrap();

        // features are [v, 0] for a constant image: mean of {10, 0, 30, 0}
        match model {
            DigitizationModel::SeedMean { mean } => assert_eq!(mean, 10.0),
            other => panic!("unexpected variant {}", other.kind_name()),
        }
        assert_eq!(source.signal_loads(), 0);
    }

    #[test]
    fn test_network_digitizer_trains_and_saves() {
        let tmp = tempfile::tempdir().unwrap();
        let source = FakeSource::default()
            .with("a", FakeRecord::constant(10.0, 2, 5))
            .with("b", FakeRecord::constant(20.0, 2, 5));

        let use_case = TrainUseCase::new(quick());
        use_case
            .execute(&source, Task::Digitization, folder(), tmp.path(), false)
            .unwrap();

        assert!(tmp.path().join("digitization_model.json").exists());
        assert!(tmp.path().join("digitization_model.mpk.gz").exists());
        assert!(!tmp.path().join("dx_model.json").exists());
    }

    #[test]
    fn test_forest_dx_trains_without_metrics_or_weights() {
        let tmp = tempfile::tempdir().unwrap();
        let source = FakeSource::default()
            .with("a", FakeRecord::constant(10.0, 2, 5).labelled(&["NORM"]))
            .with("b", FakeRecord::constant(12.0, 2, 5).labelled(&["NORM"]))
            .with("c", FakeRecord::constant(200.0, 2, 5).labelled(&["MI"]))
            .with("d", FakeRecord::constant(210.0, 2, 5).labelled(&["MI"]));

        let mut cfg = quick();
        cfg.dx_kind = DxKind::RandomForest;
        let model = TrainUseCase::new(cfg)
            .train_dx(&source, folder(), tmp.path(), false)
            .unwrap();

        assert_eq!(model.classes, vec!["MI", "NORM"]);
        assert_eq!(model.predictor.kind_name(), "random-forest");
        assert!(tmp.path().join("dx_model.json").exists());
        assert!(!tmp.path().join("dx_model.mpk.gz").exists());
        assert!(!tmp.path().join("dx_metrics.csv").exists());
    }

    #[test]
    fn test_digitizer_kind_serialises_snake_case() {
        let json = serde_json::to_string(&DigitizerKind::SeedMean).unwrap();
        assert_eq!(json, "\"seed_mean\"");
        let json = serde_json::to_string(&DxKind::RandomForest).unwrap();
        assert_eq!(json, "\"random_forest\"");
    }
}
