//! Trained model artifacts.
//!
//! Everything is plain JSON under one directory so the training side and
//! this pipeline only share a file contract, not a runtime. The scaler and
//! encoders are load-bearing for every target and must be present; each
//! model file is optional and its absence just skips that target.

use std::fs;
use std::path::Path;

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::features::{check_parity, Encoders, FeatureMatrix, FittedScaler};
use super::PredictionError;
use crate::config::artifacts as paths;

pub const EQUITY_TARGET: &str = "equity";

/// Linear regressor for one numeric target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionModel {
    pub target: String,
    pub feature_names: Vec<String>,
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl RegressionModel {
    /// One prediction per matrix row. The matrix columns must match the
    /// columns the model was trained on.
    pub fn predict(&self, features: &FeatureMatrix) -> Result<DVector<f64>, PredictionError> {
        check_parity(&features.columns, &self.feature_names)?;
        let coef = DVector::from_column_slice(&self.coefficients);
        Ok(&features.matrix * coef + DVector::from_element(features.matrix.nrows(), self.intercept))
    }
}

/// Linear multiclass scorer: one intercept and weight row per class,
/// prediction is the argmax score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityClassifier {
    pub target: String,
    pub feature_names: Vec<String>,
    pub intercepts: Vec<f64>,
    pub weights: Vec<Vec<f64>>,
}

impl EquityClassifier {
    /// Class index per matrix row.
    pub fn predict(&self, features: &FeatureMatrix) -> Result<Vec<usize>, PredictionError> {
        check_parity(&features.columns, &self.feature_names)?;
        let mut picks = Vec::with_capacity(features.matrix.nrows());
        for row in features.matrix.row_iter() {
            let mut best = 0;
            let mut best_score = f64::NEG_INFINITY;
            for (k, (intercept, weights)) in
                self.intercepts.iter().zip(&self.weights).enumerate()
            {
                let score: f64 = intercept
                    + row.iter().zip(weights).map(|(x, w)| x * w).sum::<f64>();
                if score > best_score {
                    best_score = score;
                    best = k;
                }
            }
            picks.push(best);
        }
        Ok(picks)
    }
}

/// Everything loadable from the artifact directory.
#[derive(Debug)]
pub struct ModelArtifacts {
    pub scaler: FittedScaler,
    pub encoders: Encoders,
    pub tuition: Option<RegressionModel>,
    pub enrollment: Option<RegressionModel>,
    pub grad_rate: Option<RegressionModel>,
    pub equity: Option<(EquityClassifier, Vec<String>)>,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, PredictionError> {
    let raw = fs::read_to_string(path).map_err(|e| PredictionError::Artifact {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&raw).map_err(|e| PredictionError::Artifact {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Like [`read_json`] but a missing file is `None` instead of an error.
/// A file that exists but fails to parse is still fatal: a corrupt model
/// should stop the run, not silently skip a target.
fn read_optional_json<T: serde::de::DeserializeOwned>(
    path: &Path,
) -> Result<Option<T>, PredictionError> {
    if !path.exists() {
        return Ok(None);
    }
    read_json(path).map(Some)
}

/// Loads the artifact directory.
pub fn load_artifacts(dir: &Path) -> Result<ModelArtifacts, PredictionError> {
    let scaler: FittedScaler = read_json(&paths::scaler_path(dir))?;
    let encoders: Encoders = read_json(&paths::encoders_path(dir))?;

    let load_model = |target: &str| -> Result<Option<RegressionModel>, PredictionError> {
        let model = read_optional_json(&paths::model_path(dir, target))?;
        if model.is_none() {
            warn!(target, "model artifact missing, target will be skipped");
        }
        Ok(model)
    };
    let tuition = load_model("tuition")?;
    let enrollment = load_model("enrollment")?;
    let grad_rate = load_model("grad_rate")?;

    let equity = match read_optional_json::<EquityClassifier>(&paths::model_path(dir, EQUITY_TARGET))? {
        Some(classifier) => {
            match read_optional_json::<Vec<String>>(&paths::equity_labels_path(dir))? {
                Some(labels) => Some((classifier, labels)),
                None => {
                    warn!("equity model present but labels file missing, equity will be skipped");
                    None
                }
            }
        }
        None => {
            warn!(target = EQUITY_TARGET, "model artifact missing, target will be skipped");
            None
        }
    };

    debug!(dir = %dir.display(), "loaded model artifacts");
    Ok(ModelArtifacts {
        scaler,
        encoders,
        tuition,
        enrollment,
        grad_rate,
        equity,
    })
}

/// Writes one artifact as pretty JSON. Used by the training side and by
/// tests that stage a directory.
pub fn save_artifact<T: Serialize>(path: &Path, value: &T) -> Result<(), PredictionError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| PredictionError::Artifact {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::artifacts as paths;

    fn scaler(columns: &[&str]) -> FittedScaler {
        FittedScaler {
            feature_names: columns.iter().map(|s| s.to_string()).collect(),
            means: vec![0.0; columns.len()],
            stds: vec![1.0; columns.len()],
        }
    }

    fn features(columns: &[&str], rows: &[&[f64]]) -> FeatureMatrix {
        FeatureMatrix {
            columns: columns.iter().map(|s| s.to_string()).collect(),
            matrix: nalgebra::DMatrix::from_fn(rows.len(), columns.len(), |r, c| rows[r][c]),
        }
    }

    #[test]
    fn regression_predicts_linear_combination() {
        let model = RegressionModel {
            target: "tuition".to_string(),
            feature_names: vec!["a".to_string(), "b".to_string()],
            intercept: 10.0,
            coefficients: vec![2.0, -1.0],
        };
        let out = model
            .predict(&features(&["a", "b"], &[&[3.0, 4.0], &[0.0, 0.0]]))
            .expect("predict");
        assert_eq!(out[0], 10.0 + 6.0 - 4.0);
        assert_eq!(out[1], 10.0);
    }

    #[test]
    fn regression_rejects_misaligned_columns() {
        let model = RegressionModel {
            target: "tuition".to_string(),
            feature_names: vec!["a".to_string(), "b".to_string()],
            intercept: 0.0,
            coefficients: vec![1.0, 1.0],
        };
        let err = model
            .predict(&features(&["b", "a"], &[&[1.0, 2.0]]))
            .unwrap_err();
        assert!(matches!(err, PredictionError::FeatureParity(_)));
    }

    #[test]
    fn classifier_picks_argmax_class() {
        let model = EquityClassifier {
            target: "equity".to_string(),
            feature_names: vec!["x".to_string()],
            intercepts: vec![0.0, 1.0, -5.0],
            weights: vec![vec![1.0], vec![0.0], vec![10.0]],
        };
        let picks = model
            .predict(&features(&["x"], &[&[0.0], &[2.0]]))
            .expect("predict");
        // x=0: scores [0, 1, -5] -> class 1; x=2: scores [2, 1, 15] -> class 2
        assert_eq!(picks, vec![1, 2]);
    }

    fn stage_dir() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().to_path_buf();
        save_artifact(&paths::scaler_path(&path), &scaler(&["a"])).unwrap();
        let encoders: Encoders = Encoders::new();
        save_artifact(&paths::encoders_path(&path), &encoders).unwrap();
        (dir, path)
    }

    #[test]
    fn missing_model_files_become_none() {
        let (_dir, path) = stage_dir();
        let artifacts = load_artifacts(&path).expect("load");
        assert!(artifacts.tuition.is_none());
        assert!(artifacts.enrollment.is_none());
        assert!(artifacts.grad_rate.is_none());
        assert!(artifacts.equity.is_none());
    }

    #[test]
    fn missing_scaler_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_artifacts(dir.path()).unwrap_err();
        assert!(matches!(err, PredictionError::Artifact { .. }));
    }

    #[test]
    fn corrupt_model_file_is_fatal() {
        let (_dir, path) = stage_dir();
        fs::write(paths::model_path(&path, "tuition"), "{ not json").unwrap();
        let err = load_artifacts(&path).unwrap_err();
        assert!(matches!(err, PredictionError::Artifact { .. }));
    }

    #[test]
    fn present_models_round_trip() {
        let (_dir, path) = stage_dir();
        let model = RegressionModel {
            target: "tuition".to_string(),
            feature_names: vec!["a".to_string()],
            intercept: 1.0,
            coefficients: vec![0.5],
        };
        save_artifact(&paths::model_path(&path, "tuition"), &model).unwrap();
        let artifacts = load_artifacts(&path).expect("load");
        let loaded = artifacts.tuition.expect("tuition model");
        assert_eq!(loaded.intercept, 1.0);
        assert_eq!(loaded.coefficients, vec![0.5]);
    }

    #[test]
    fn equity_without_labels_is_skipped() {
        let (_dir, path) = stage_dir();
        let model = EquityClassifier {
            target: "equity".to_string(),
            feature_names: vec!["a".to_string()],
            intercepts: vec![0.0],
            weights: vec![vec![1.0]],
        };
        save_artifact(&paths::model_path(&path, EQUITY_TARGET), &model).unwrap();
        let artifacts = load_artifacts(&path).expect("load");
        assert!(artifacts.equity.is_none());

        save_artifact(
            &paths::equity_labels_path(&path),
            &vec!["Low".to_string(), "Medium".to_string(), "High".to_string()],
        )
        .unwrap();
        let artifacts = load_artifacts(&path).expect("load");
        assert!(artifacts.equity.is_some());
    }
}
