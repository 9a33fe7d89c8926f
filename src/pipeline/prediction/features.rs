//! Feature engineering shared by training and inference.
//!
//! Both sides must call the same code path: the column set, the column
//! order, and every derived value come from one [`FeatureConfig`]. At
//! inference the produced columns are checked against the fitted scaler's
//! column list and any mismatch is a hard error, never a reorder.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::PredictionError;
use crate::models::{BillParameters, InstitutionRecord};

/// Bucket for categorical values never seen during training.
pub const UNKNOWN_CLASS: &str = "Unknown";

/// Per-category ordinal codes, fitted at training time.
pub type Encoders = BTreeMap<String, BTreeMap<String, usize>>;

/// Declarative description of the feature set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub version: u32,
    pub numeric_columns: Vec<String>,
    /// Pairwise products, emitted as `{a}_x_{b}`.
    pub interactions: Vec<(String, String)>,
    pub binary_flags: Vec<String>,
    pub categorical_columns: Vec<String>,
}

impl FeatureConfig {
    pub fn v1() -> Self {
        let cols = |names: &[&str]| names.iter().map(|s| s.to_string()).collect();
        Self {
            version: 1,
            numeric_columns: cols(&[
                "enrollment",
                "pct_low_income",
                "pct_minority",
                "baseline_tuition",
                "baseline_grad_rate",
                "funding_change_pct",
                "min_wage_change",
                "childcare_subsidy",
                "tuition_cap_pct",
            ]),
            interactions: vec![
                ("funding_change_pct".to_string(), "pct_low_income".to_string()),
                ("baseline_tuition".to_string(), "pct_minority".to_string()),
                ("min_wage_change".to_string(), "childcare_subsidy".to_string()),
                ("enrollment".to_string(), "pct_low_income".to_string()),
            ],
            binary_flags: cols(&[
                "high_risk_institution",
                "minority_serving",
                "small_enrollment",
            ]),
            categorical_columns: cols(&["state", "institution_type"]),
        }
    }

    /// Full output column list, in emission order.
    pub fn column_names(&self) -> Vec<String> {
        let mut names = self.numeric_columns.clone();
        names.extend(
            self.interactions
                .iter()
                .map(|(a, b)| format!("{a}_x_{b}")),
        );
        names.extend(self.binary_flags.iter().cloned());
        names.extend(
            self.categorical_columns
                .iter()
                .map(|c| format!("{c}_encoded")),
        );
        names
    }
}

/// Column means and standard deviations fitted on the training frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedScaler {
    pub feature_names: Vec<String>,
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
}

/// A named, row-per-institution feature matrix.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    pub columns: Vec<String>,
    pub matrix: DMatrix<f64>,
}

fn numeric_value(name: &str, inst: &InstitutionRecord, bill: &BillParameters) -> f64 {
    match name {
        "enrollment" => inst.enrollment,
        "pct_low_income" => inst.pct_low_income,
        "pct_minority" => inst.pct_minority,
        "baseline_tuition" => inst.baseline_tuition,
        "baseline_grad_rate" => inst.baseline_grad_rate,
        "funding_change_pct" => bill.funding_change_pct.unwrap_or(0.0),
        "min_wage_change" => bill.min_wage_change.unwrap_or(0.0),
        "childcare_subsidy" => bill.childcare_subsidy.unwrap_or(0.0),
        "tuition_cap_pct" => bill.tuition_cap_pct.unwrap_or(0.0),
        other => {
            warn!(column = other, "unknown numeric feature column, emitting 0");
            0.0
        }
    }
}

fn flag_value(name: &str, inst: &InstitutionRecord) -> f64 {
    let set = match name {
        "high_risk_institution" => inst.pct_low_income > 50.0 && inst.baseline_grad_rate < 50.0,
        "minority_serving" => inst.pct_minority > 50.0,
        "small_enrollment" => inst.enrollment < 2000.0,
        other => {
            warn!(column = other, "unknown binary flag, emitting 0");
            false
        }
    };
    if set {
        1.0
    } else {
        0.0
    }
}

fn categorical_value(name: &str, inst: &InstitutionRecord) -> String {
    match name {
        "state" => inst
            .state
            .clone()
            .unwrap_or_else(|| UNKNOWN_CLASS.to_string()),
        "institution_type" => inst
            .institution_type
            .map(|t| t.as_str().to_string())
            .unwrap_or_else(|| UNKNOWN_CLASS.to_string()),
        _ => UNKNOWN_CLASS.to_string(),
    }
}

fn encode(col: &str, class: &str, encoders: &Encoders) -> f64 {
    let Some(codes) = encoders.get(col) else {
        warn!(column = col, "no fitted encoder for column, emitting 0");
        return 0.0;
    };
    if let Some(&code) = codes.get(class) {
        return code as f64;
    }
    match codes.get(UNKNOWN_CLASS) {
        Some(&code) => {
            warn!(column = col, class, "unseen class mapped to Unknown bucket");
            code as f64
        }
        None => {
            warn!(column = col, class, "unseen class with no Unknown bucket, emitting 0");
            0.0
        }
    }
}

/// Fits ordinal encoders over the roster. The `Unknown` bucket is always
/// present so inference has somewhere to put unseen classes.
pub fn fit_encoders(insts: &[InstitutionRecord], config: &FeatureConfig) -> Encoders {
    let mut encoders = Encoders::new();
    for col in &config.categorical_columns {
        let classes: BTreeSet<String> = insts
            .iter()
            .map(|inst| categorical_value(col, inst))
            .chain(std::iter::once(UNKNOWN_CLASS.to_string()))
            .collect();
        let codes = classes
            .into_iter()
            .enumerate()
            .map(|(i, class)| (class, i))
            .collect();
        encoders.insert(col.clone(), codes);
    }
    encoders
}

/// Builds the unscaled feature matrix in the config's column order.
pub fn build_raw_features(
    insts: &[InstitutionRecord],
    bill: &BillParameters,
    config: &FeatureConfig,
    encoders: &Encoders,
) -> FeatureMatrix {
    let columns = config.column_names();
    let mut matrix = DMatrix::zeros(insts.len(), columns.len());

    for (row, inst) in insts.iter().enumerate() {
        let mut col = 0;
        for name in &config.numeric_columns {
            matrix[(row, col)] = numeric_value(name, inst, bill);
            col += 1;
        }
        for (a, b) in &config.interactions {
            matrix[(row, col)] = numeric_value(a, inst, bill) * numeric_value(b, inst, bill);
            col += 1;
        }
        for name in &config.binary_flags {
            matrix[(row, col)] = flag_value(name, inst);
            col += 1;
        }
        for name in &config.categorical_columns {
            matrix[(row, col)] = encode(name, &categorical_value(name, inst), encoders);
            col += 1;
        }
    }
    FeatureMatrix { columns, matrix }
}

/// Fits column means and standard deviations. Stds below 1e-12 are floored
/// to 1.0 so constant columns pass through unscaled instead of exploding.
pub fn fit_scaler(features: &FeatureMatrix) -> FittedScaler {
    let rows = features.matrix.nrows().max(1) as f64;
    let mut means = Vec::with_capacity(features.columns.len());
    let mut stds = Vec::with_capacity(features.columns.len());
    for col in features.matrix.column_iter() {
        let mean = col.sum() / rows;
        let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / rows;
        let std = var.sqrt();
        means.push(mean);
        stds.push(if std < 1e-12 { 1.0 } else { std });
    }
    FittedScaler {
        feature_names: features.columns.clone(),
        means,
        stds,
    }
}

fn apply_scaler(features: &mut FeatureMatrix, scaler: &FittedScaler) {
    for (col_idx, mut col) in features.matrix.column_iter_mut().enumerate() {
        for v in col.iter_mut() {
            *v = (*v - scaler.means[col_idx]) / scaler.stds[col_idx];
        }
    }
}

/// Inference-time transform: builds features and scales them with the
/// fitted scaler. Errors when the produced columns differ from the columns
/// the scaler was fitted on, in names or in order.
pub fn transform(
    insts: &[InstitutionRecord],
    bill: &BillParameters,
    config: &FeatureConfig,
    scaler: &FittedScaler,
    encoders: &Encoders,
) -> Result<FeatureMatrix, PredictionError> {
    let mut features = build_raw_features(insts, bill, config, encoders);
    check_parity(&features.columns, &scaler.feature_names)?;
    apply_scaler(&mut features, scaler);
    Ok(features)
}

/// Compares two column lists positionally and reports the first divergence.
pub fn check_parity(produced: &[String], expected: &[String]) -> Result<(), PredictionError> {
    if produced == expected {
        return Ok(());
    }
    let detail = produced
        .iter()
        .zip(expected.iter())
        .enumerate()
        .find(|(_, (p, e))| p != e)
        .map(|(i, (p, e))| format!("column {i}: produced {p:?}, expected {e:?}"))
        .unwrap_or_else(|| {
            format!(
                "produced {} columns, expected {}",
                produced.len(),
                expected.len()
            )
        });
    Err(PredictionError::FeatureParity(detail))
}

/// Training-side convenience: fit encoders and scaler, return the scaled
/// frame alongside both.
pub fn fit_transform(
    insts: &[InstitutionRecord],
    bill: &BillParameters,
    config: &FeatureConfig,
) -> (FeatureMatrix, FittedScaler, Encoders) {
    let encoders = fit_encoders(insts, config);
    let mut features = build_raw_features(insts, bill, config, &encoders);
    let scaler = fit_scaler(&features);
    apply_scaler(&mut features, &scaler);
    (features, scaler, encoders)
}
