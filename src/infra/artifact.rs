// ============================================================
// Layer 6 — Artifact Store
// ============================================================
// Persists the two trained models so inference can run later,
// possibly in another process.
//
// What gets saved:
//
//   models/
//     digitization_model.json    ← topology (or baseline mean)
//     digitization_model.mpk.gz  ← weights (network variant only)
//     dx_model.json              ← topology (or forests) + class list
//     dx_model.mpk.gz            ← weights (network variant only)
//
// The JSON payloads:
//   {"kind": "network",       "model": {<DigitizerConfig>}}
//   {"kind": "seed_mean",     "mean": 131.2}
//   {"kind": "network",       "model": {<DxClassifierConfig>}, "classes": ["MI", "NORM"]}
//   {"kind": "random_forest", "forest": {<DxForest>},          "classes": ["MI", "NORM"]}
//
// Why save the topology separately?
//   Burn's recorders store parameters only. To load them,
//   the exact architecture must be rebuilt first, from the JSON.
//   The dx class list cannot be recovered from the network at all,
//   so it travels in the same payload. The forests are plain serde
//   data and live entirely inside the JSON.
//
// Burn's NamedMpkGzFileRecorder with FullPrecisionSettings:
//   - Serialises model parameters to MessagePack format
//   - Compresses with gzip for smaller file size
//   - Keeps f32 weights as f32, so a reload reproduces outputs exactly
//   - Type-safe: loading fails if architecture doesn't match
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::traits::Persistable;
use crate::ml::classifier::DxClassifierConfig;
use crate::ml::digitizer::DigitizerConfig;
use crate::ml::forest::DxForest;
use crate::ml::inferencer::{DigitizationModel, DxModel, DxPredictor};
use crate::ml::{default_device, InferBackend};

type WeightsRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

pub const DIGITIZATION_MODEL: &str = "digitization_model";
pub const DX_MODEL: &str = "dx_model";

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum DigitizationPayload {
    Network { model: DigitizerConfig },
    SeedMean { mean: f64 },
}

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum DxPayload {
    Network { model: DxClassifierConfig, classes: Vec<String> },
    RandomForest { forest: DxForest, classes: Vec<String> },
}

/// Write side of `DxPayload`; the forests are large and not `Clone`.
#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum DxPayloadRef<'a> {
    Network { model: &'a DxClassifierConfig, classes: &'a [String] },
    RandomForest { forest: &'a DxForest, classes: &'a [String] },
}

/// Reads and writes named artifacts inside one model folder.
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the JSON payload for `name`.
    pub fn payload_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create model folder '{}'", self.dir.display()))
    }

    fn write_payload<T: Serialize>(&self, name: &str, payload: &T) -> Result<()> {
        let path = self.payload_path(name);
        let json = serde_json::to_string_pretty(payload)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write artifact '{}'", path.display()))?;
        tracing::debug!("Saved artifact payload '{}'", path.display());
        Ok(())
    }

    fn read_payload<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.payload_path(name);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read artifact '{}'. Have you trained the model first?",
                path.display()
            )
        })?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed artifact '{}'", path.display()))
    }

    /// Save module weights to `{dir}/{name}.mpk.gz`.
    fn write_weights<B: Backend, M: Module<B>>(&self, name: &str, model: &M) -> Result<()> {
        // the recorder adds the extension
        let path = self.dir.join(name);
        WeightsRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save weights to '{}'", path.display()))?;
        Ok(())
    }

    /// Load weights saved by `write_weights` into a freshly built `model`
    /// with the same architecture.
    fn read_weights<B: Backend, M: Module<B>>(
        &self,
        name:   &str,
        model:  M,
        device: &B::Device,
    ) -> Result<M> {
        let path = self.dir.join(name);
        let record = WeightsRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load weights '{}'", path.display()))?;
        Ok(model.load_record(record))
    }
}

// ─── DigitizationModel ────────────────────────────────────────────────────────
impl Persistable for DigitizationModel {
    fn save(&self, model_folder: &Path) -> Result<()> {
        let store = ArtifactStore::new(model_folder);
        store.ensure_dir()?;

        match self {
            Self::Network { config, network } => {
                store.write_payload(
                    DIGITIZATION_MODEL,
                    &DigitizationPayload::Network { model: config.clone() },
                )?;
                store.write_weights::<InferBackend, _>(DIGITIZATION_MODEL, network)?;
            }
            Self::SeedMean { mean } => {
                store.write_payload(DIGITIZATION_MODEL, &DigitizationPayload::SeedMean { mean: *mean })?;
            }
        }
        Ok(())
    }

    fn load(model_folder: &Path) -> Result<Self> {
        let store = ArtifactStore::new(model_folder);

        match store.read_payload::<DigitizationPayload>(DIGITIZATION_MODEL)? {
            DigitizationPayload::Network { model: config } => {
                let device  = default_device();
                let network = config.init::<InferBackend>(&device);
                let network = store.read_weights(DIGITIZATION_MODEL, network, &device)?;
                Ok(Self::Network { config, network })
            }
            DigitizationPayload::SeedMean { mean } => Ok(Self::SeedMean { mean }),
        }
    }
}

// ─── DxModel ──────────────────────────────────────────────────────────────────
impl Persistable for DxModel {
    fn save(&self, model_folder: &Path) -> Result<()> {
        let store = ArtifactStore::new(model_folder);
        store.ensure_dir()?;
        let classes = self.classes.as_slice();

        match &self.predictor {
            DxPredictor::Network { config, network } => {
                store.write_payload(DX_MODEL, &DxPayloadRef::Network { model: config, classes })?;
                store.write_weights::<InferBackend, _>(DX_MODEL, network)
            }
            DxPredictor::RandomForest(forest) => {
                store.write_payload(DX_MODEL, &DxPayloadRef::RandomForest { forest, classes })
            }
        }
    }

    fn load(model_folder: &Path) -> Result<Self> {
        let store = ArtifactStore::new(model_folder);

        match store.read_payload::<DxPayload>(DX_MODEL)? {
            DxPayload::Network { model: config, classes } => {
                let device  = default_device();
                let network = config.init::<InferBackend>(&device);
                let network = store.read_weights(DX_MODEL, network, &device)?;
                Ok(Self { predictor: DxPredictor::Network { config, network }, classes })
            }
            DxPayload::RandomForest { forest, classes } => {
                if forest.num_classes() != classes.len() {
                    anyhow::bail!(
                        "Malformed artifact '{}': {} forests for {} classes",
                        store.payload_path(DX_MODEL).display(),
                        forest.num_classes(),
                        classes.len()
                    );
                }
                Ok(Self { predictor: DxPredictor::RandomForest(forest), classes })
            }
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::features::FeatureVector;
    use crate::ml::forest::DxForestConfig;

    fn tiny_digitizer() -> DigitizerConfig {
        DigitizerConfig::new()
            .with_head_size(4)
            .with_num_heads(2)
            .with_num_blocks(1)
            .with_mlp_units(vec![8])
            .with_num_leads(2)
            .with_num_samples(6)
    }

    #[test]
    fn test_digitization_network_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let device = default_device();
        let config = tiny_digitizer();
        let network = config.init::<InferBackend>(&device);
        let before = network.forward_features([3.0, 1.0], &device).into_data().to_vec::<f32>().unwrap();

        DigitizationModel::Network { config, network }.save(tmp.path()).unwrap();
        assert!(tmp.path().join("digitization_model.json").exists());

        let loaded = DigitizationModel::load(tmp.path()).unwrap();
        let DigitizationModel::Network { network, .. } = loaded else {
            panic!("expected the network variant");
        };
        let out = network.forward_features([3.0, 1.0], &device);
        assert_eq!(out.dims(), [1, 2, 6]);

        // full-precision weights reproduce the outputs exactly
        let after = out.into_data().to_vec::<f32>().unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_seed_mean_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        DigitizationModel::SeedMean { mean: 131.25 }.save(tmp.path()).unwrap();

        let json = fs::read_to_string(tmp.path().join("digitization_model.json")).unwrap();
        assert!(json.contains("\"kind\": \"seed_mean\""));

        match DigitizationModel::load(tmp.path()).unwrap() {
            DigitizationModel::SeedMean { mean } => assert_eq!(mean, 131.25),
            other => panic!("unexpected variant {}", other.kind_name()),
        }
    }

    #[test]
    fn test_dx_round_trip_keeps_class_order() {
        let tmp = tempfile::tempdir().unwrap();
        let device = default_device();
        let classes: Vec<String> = ["STTC", "MI", "NORM"].iter().map(|s| s.to_string()).collect();
        let config = DxClassifierConfig::new(classes.len());
        let network = config.init::<InferBackend>(&device);

        let model = DxModel { predictor: DxPredictor::Network { config, network }, classes: classes.clone() };
        model.save(tmp.path()).unwrap();
        let json = fs::read_to_string(tmp.path().join("dx_model.json")).unwrap();
        assert!(json.contains("\"kind\": \"network\""));

        let loaded = DxModel::load(tmp.path()).unwrap();
        assert_eq!(loaded.classes, classes);
        assert_eq!(loaded.predictor.scores(&FeatureVector::new(1.0, 2.0)).unwrap().len(), 3);
    }

    #[test]
    fn test_dx_forest_round_trip_without_weights() {
        let tmp = tempfile::tempdir().unwrap();
        let features: Vec<FeatureVector> =
            (0..12).map(|i| FeatureVector::new(if i % 2 == 0 { 5.0 } else { 90.0 }, 1.0)).collect();
        let targets: Vec<Vec<f32>> =
            (0..12).map(|i| if i % 2 == 0 { vec![1.0, 0.0] } else { vec![0.0, 1.0] }).collect();
        let forest = DxForest::fit(&DxForestConfig::default(), &features, &targets).unwrap();
        let expected = forest.predict(&FeatureVector::new(90.0, 1.0)).unwrap();

        let classes = vec!["MI".to_string(), "NORM".to_string()];
        DxModel { predictor: DxPredictor::RandomForest(forest), classes: classes.clone() }
            .save(tmp.path())
            .unwrap();

        let json = fs::read_to_string(tmp.path().join("dx_model.json")).unwrap();
        assert!(json.contains("\"kind\": \"random_forest\""));
        assert!(!tmp.path().join("dx_model.mpk.gz").exists());

        let loaded = DxModel::load(tmp.path()).unwrap();
        assert_eq!(loaded.classes, classes);
        assert_eq!(loaded.predictor.kind_name(), "random-forest");
        assert_eq!(loaded.predictor.scores(&FeatureVector::new(90.0, 1.0)).unwrap(), expected);
    }

    #[test]
    fn test_missing_artifact_names_the_file() {
        let tmp = tempfile::tempdir().unwrap();
        let err = DxModel::load(tmp.path()).unwrap_err();
        assert!(format!("{err:#}").contains("dx_model.json"));
    }
}
