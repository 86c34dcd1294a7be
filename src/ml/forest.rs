// ============================================================
// Layer 5 — Random Forest Dx Classifier
// ============================================================
// The tree-ensemble alternative to the dx network.
//
// One forest per class (one-vs-rest), each fitted on the same
// feature rows with a 0/1 target for "record carries this class".
// A class that every training record has, or that none has, keeps
// that constant answer instead of a forest.
//
// Prediction returns 0.0 / 1.0 per class in class order, so the
// usual tie rule applies: when no class fires, all of them tie.
//
// smartcore has no leaf-count cap; depth is the closest limit and
// is left unbounded by default.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use smartcore::{
    ensemble::random_forest_classifier::{
        RandomForestClassifier, RandomForestClassifierParameters,
    },
    linalg::basic::matrix::DenseMatrix,
};
use std::fmt;

use crate::domain::features::FeatureVector;

type Forest = RandomForestClassifier<f64, i32, DenseMatrix<f64>, Vec<i32>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DxForestConfig {
    pub n_trees:   u16,
    pub seed:      u64,
    pub max_depth: Option<u16>,
}

impl Default for DxForestConfig {
    fn default() -> Self {
        Self { n_trees: 12, seed: 56, max_depth: None }
    }
}

impl DxForestConfig {
    fn parameters(&self) -> RandomForestClassifierParameters {
        let params = RandomForestClassifierParameters::default()
            .with_n_trees(self.n_trees)
            .with_seed(self.seed);
        match self.max_depth {
            Some(depth) => params.with_max_depth(depth),
            None        => params,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ClassForest {
    Constant { present: bool },
    Trees { forest: Forest },
}

/// One-vs-rest random forests over the two image features.
#[derive(Serialize, Deserialize)]
pub struct DxForest {
    config:    DxForestConfig,
    per_class: Vec<ClassForest>,
}

impl fmt::Debug for DxForest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DxForest")
            .field("config", &self.config)
            .field("classes", &self.per_class.len())
            .finish()
    }
}

impl DxForest {
    /// Fit one forest per target column. `targets[i]` is the multi-hot
    /// row of `features[i]`.
    pub fn fit(config: &DxForestConfig, features: &[FeatureVector], targets: &[Vec<f32>]) -> Result<Self> {
        if features.is_empty() || features.len() != targets.len() {
            return Err(anyhow!(
                "Cannot fit a forest on {} feature rows and {} targets",
                features.len(),
                targets.len()
            ));
        }

        let num_classes = targets[0].len();
        let x = to_matrix(features);

        let mut per_class = Vec::with_capacity(num_classes);
        for c in 0..num_classes {
            let y: Vec<i32> = targets.iter().map(|t| i32::from(t[c] > 0.5)).collect();

            let first = y[0];
            if y.iter().all(|&v| v == first) {
                per_class.push(ClassForest::Constant { present: first == 1 });
                continue;
            }

            let forest = Forest::fit(&x, &y, config.parameters())
                .map_err(|e| anyhow!("Random forest fit failed for class {c}: {e}"))?;
            per_class.push(ClassForest::Trees { forest });
        }

        tracing::debug!("Fitted {} one-vs-rest forests of {} trees", per_class.len(), config.n_trees);
        Ok(Self { config: config.clone(), per_class })
    }

    pub fn num_classes(&self) -> usize {
        self.per_class.len()
    }

    /// 0.0 / 1.0 per class, in class order.
    pub fn predict(&self, features: &FeatureVector) -> Result<Vec<f32>> {
        let x = to_matrix(std::slice::from_ref(features));

        self.per_class
            .iter()
            .enumerate()
            .map(|(c, class)| match class {
                ClassForest::Constant { present } => Ok(if *present { 1.0 } else { 0.0 }),
                ClassForest::Trees { forest } => {
                    let predicted = forest
                        .predict(&x)
                        .map_err(|e| anyhow!("Random forest prediction failed for class {c}: {e}"))?;
                    Ok(if predicted.first() == Some(&1) { 1.0 } else { 0.0 })
                }
            })
            .collect()
    }
}

fn to_matrix(features: &[FeatureVector]) -> DenseMatrix<f64> {
    let rows: Vec<Vec<f64>> = features.iter().map(|f| f.as_array().to_vec()).collect();
    DenseMatrix::from_2d_vec(&rows)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (Vec<FeatureVector>, Vec<Vec<f32>>) {
        let mut features = Vec::new();
        let mut targets  = Vec::new();
        for i in 0..20 {
            let low = i % 2 == 0;
            let v   = if low { 10.0 + i as f64 * 0.1 } else { 200.0 + i as f64 * 0.1 };
            features.push(FeatureVector::new(v, 1.0));
            // class 0 on low rows, class 1 on high rows, class 2 everywhere
            targets.push(if low { vec![1.0, 0.0, 1.0] } else { vec![0.0, 1.0, 1.0] });
        }
        (features, targets)
    }

    #[test]
    fn test_forest_separates_classes() {
        let (features, targets) = separable();
        let forest = DxForest::fit(&DxForestConfig::default(), &features, &targets).unwrap();
        assert_eq!(forest.num_classes(), 3);

        let low = forest.predict(&FeatureVector::new(11.0, 1.0)).unwrap();
        assert_eq!(low, vec![1.0, 0.0, 1.0]);
        let high = forest.predict(&FeatureVector::new(201.0, 1.0)).unwrap();
        assert_eq!(high, vec![0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_constant_class_skips_the_forest() {
        let (features, _) = separable();
        let targets = vec![vec![0.0, 1.0]; features.len()];
        let forest = DxForest::fit(&DxForestConfig::default(), &features, &targets).unwrap();

        assert!(matches!(forest.per_class[0], ClassForest::Constant { present: false }));
        assert!(matches!(forest.per_class[1], ClassForest::Constant { present: true }));
        assert_eq!(forest.predict(&FeatureVector::new(0.0, 0.0)).unwrap(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_empty_training_set_is_rejected() {
        assert!(DxForest::fit(&DxForestConfig::default(), &[], &[]).is_err());
    }

    #[test]
    fn test_forest_survives_json() {
        let (features, targets) = separable();
        let forest = DxForest::fit(&DxForestConfig::default(), &features, &targets).unwrap();

        let json = serde_json::to_string(&forest).unwrap();
        let back: DxForest = serde_json::from_str(&json).unwrap();
        let row = FeatureVector::new(201.0, 1.0);
        assert_eq!(back.predict(&row).unwrap(), forest.predict(&row).unwrap());
    }
}
