//! Applies the loaded models to a feature matrix.

use tracing::{info, warn};

use super::artifacts::ModelArtifacts;
use super::features::FeatureMatrix;
use super::PredictionError;
use crate::models::{EquityRisk, InstitutionImpact, InstitutionRecord};

/// Runs every available model target over the institutions.
///
/// Targets are independent: a missing model leaves its field `None` on
/// every impact and the rest still populate. Derived metrics are filled in
/// afterwards by the metrics pass.
pub fn run_predictions(
    insts: &[InstitutionRecord],
    features: &FeatureMatrix,
    artifacts: &ModelArtifacts,
) -> Result<Vec<InstitutionImpact>, PredictionError> {
    let tuition = artifacts
        .tuition
        .as_ref()
        .map(|m| m.predict(features))
        .transpose()?;
    let enrollment = artifacts
        .enrollment
        .as_ref()
        .map(|m| m.predict(features))
        .transpose()?;
    let grad_rate = artifacts
        .grad_rate
        .as_ref()
        .map(|m| m.predict(features))
        .transpose()?;
    let equity = artifacts
        .equity
        .as_ref()
        .map(|(model, labels)| Ok::<_, PredictionError>((model.predict(features)?, labels)))
        .transpose()?;

    let impacts = insts
        .iter()
        .enumerate()
        .map(|(row, inst)| InstitutionImpact {
            institution_id: inst.institution_id.clone(),
            name: inst.name.clone(),
            institution_type: inst.institution_type,
            state: inst.state.clone(),
            enrollment: inst.enrollment,
            pct_low_income: inst.pct_low_income,
            pct_minority: inst.pct_minority,
            baseline_tuition: inst.baseline_tuition,
            tuition_change_pct: tuition.as_ref().map(|v| v[row]),
            enrollment_change_pct: enrollment.as_ref().map(|v| v[row]),
            grad_rate_change: grad_rate.as_ref().map(|v| v[row]),
            equity_risk: equity
                .as_ref()
                .and_then(|(picks, labels)| class_label(picks[row], labels)),
            tuition_change_dollars: None,
            students_affected: None,
            hours_to_cover_gap: None,
        })
        .collect();

    info!(
        institutions = insts.len(),
        tuition = artifacts.tuition.is_some(),
        enrollment = artifacts.enrollment.is_some(),
        grad_rate = artifacts.grad_rate.is_some(),
        equity = artifacts.equity.is_some(),
        "ran model targets"
    );
    Ok(impacts)
}

fn class_label(index: usize, labels: &[String]) -> Option<EquityRisk> {
    let Some(label) = labels.get(index) else {
        warn!(index, "equity class index out of label range");
        return None;
    };
    let risk = EquityRisk::from_label(label);
    if risk.is_none() {
        warn!(label, "unrecognized equity label");
    }
    risk
}
