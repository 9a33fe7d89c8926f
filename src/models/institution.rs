use serde::{Deserialize, Serialize};

use super::bill::InstitutionType;

/// One row of the college roster.
///
/// The canonical table is owned by the roster collaborator; the pipeline
/// reads it once, fills documented defaults for missing fields, and never
/// writes back. Derived columns live on [`InstitutionImpact`], not here.
///
/// [`InstitutionImpact`]: super::prediction::InstitutionImpact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstitutionRecord {
    pub institution_id: String,
    pub name: String,
    /// `None` when the roster row carries no recognizable sector. Such rows
    /// never survive type filtering.
    pub institution_type: Option<InstitutionType>,
    pub state: Option<String>,
    pub enrollment: f64,
    pub pct_low_income: f64,
    pub pct_minority: f64,
    pub baseline_tuition: f64,
    pub baseline_grad_rate: f64,
    /// Yearly gap between cost of attendance and aid, when the roster has it.
    pub affordability_gap: Option<f64>,
}

impl InstitutionRecord {
    /// Minimal record with the documented field defaults. Handy in tests and
    /// for rosters that carry nothing beyond an identifier.
    pub fn with_defaults(institution_id: &str, name: &str) -> Self {
        Self {
            institution_id: institution_id.to_string(),
            name: name.to_string(),
            institution_type: None,
            state: None,
            enrollment: crate::config::defaults::ENROLLMENT,
            pct_low_income: crate::config::defaults::PCT_LOW_INCOME,
            pct_minority: crate::config::defaults::PCT_MINORITY,
            baseline_tuition: crate::config::defaults::BASELINE_TUITION,
            baseline_grad_rate: crate::config::defaults::BASELINE_GRAD_RATE,
            affordability_gap: None,
        }
    }
}
