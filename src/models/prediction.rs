use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bill::InstitutionType;

/// Ordinal bucket summarizing combined demographic and financial-stress risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EquityRisk {
    Low,
    Medium,
    High,
}

impl EquityRisk {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Low" => Some(Self::Low),
            "Medium" => Some(Self::Medium),
            "High" => Some(Self::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl fmt::Display for EquityRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-institution model outputs plus derived metrics.
///
/// Each prediction field is `None` when that target's model artifact was
/// unavailable; the other targets still populate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstitutionImpact {
    pub institution_id: String,
    pub name: String,
    pub institution_type: Option<InstitutionType>,
    pub state: Option<String>,
    pub enrollment: f64,
    pub pct_low_income: f64,
    pub pct_minority: f64,
    pub baseline_tuition: f64,

    pub tuition_change_pct: Option<f64>,
    pub enrollment_change_pct: Option<f64>,
    pub grad_rate_change: Option<f64>,
    pub equity_risk: Option<EquityRisk>,

    pub tuition_change_dollars: Option<f64>,
    pub students_affected: Option<f64>,
    pub hours_to_cover_gap: Option<f64>,
}

/// One entry of the most-affected list in [`ImpactSummary`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopAffected {
    pub institution_id: String,
    pub name: String,
    pub tuition_change_dollars: f64,
}

/// Population-level rollup of one prediction run. JSON-serializable and
/// regenerated per run; an empty roster yields a valid all-zero summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactSummary {
    pub total_colleges_affected: usize,
    pub total_students_impacted: u64,
    pub average_tuition_change_pct: f64,
    pub average_tuition_change_dollars: f64,
    pub average_enrollment_change_pct: f64,
    pub average_grad_rate_change: f64,
    /// Count per equity class label; empty when no equity model ran.
    pub equity_risk_breakdown: BTreeMap<String, usize>,
    pub high_risk_colleges: usize,
    pub minority_serving_affected: usize,
    pub low_income_serving_affected: usize,
    pub top_affected: Vec<TopAffected>,
    pub plain_language_summary: String,
    pub generated_at: DateTime<Utc>,
}

impl ImpactSummary {
    /// Valid summary for a run where filtering left no institutions.
    pub fn empty() -> Self {
        let mut summary = Self {
            total_colleges_affected: 0,
            total_students_impacted: 0,
            average_tuition_change_pct: 0.0,
            average_tuition_change_dollars: 0.0,
            average_enrollment_change_pct: 0.0,
            average_grad_rate_change: 0.0,
            equity_risk_breakdown: BTreeMap::new(),
            high_risk_colleges: 0,
            minority_serving_affected: 0,
            low_income_serving_affected: 0,
            top_affected: Vec::new(),
            plain_language_summary: String::new(),
            generated_at: Utc::now(),
        };
        summary.plain_language_summary = crate::pipeline::prediction::summary::template_summary(&summary);
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_summary_is_valid_and_nonempty_text() {
        let summary = ImpactSummary::empty();
        assert_eq!(summary.total_colleges_affected, 0);
        assert!(!summary.plain_language_summary.is_empty());
    }

    #[test]
    fn equity_risk_labels_round_trip() {
        for risk in [EquityRisk::Low, EquityRisk::Medium, EquityRisk::High] {
            assert_eq!(EquityRisk::from_label(risk.as_str()), Some(risk));
        }
        assert_eq!(EquityRisk::from_label("Severe"), None);
    }
}
