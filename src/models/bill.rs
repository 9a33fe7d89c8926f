use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Institution sector a bill can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstitutionType {
    Public,
    Private,
    Community,
}

impl InstitutionType {
    /// All three sectors — the explicit default when a bill names none.
    pub fn all() -> BTreeSet<InstitutionType> {
        [Self::Public, Self::Private, Self::Community]
            .into_iter()
            .collect()
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Some(Self::Public),
            "private" => Some(Self::Private),
            "community" => Some(Self::Community),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::Community => "community",
        }
    }
}

impl fmt::Display for InstitutionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the parameter set was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    RuleBased,
    Llm,
}

/// Structured policy parameters extracted from one bill document.
///
/// Created once per document by the extraction orchestrator and treated as
/// immutable afterwards. `affected_types` is never empty: a bill that names
/// no sector affects all three (an explicit default, not a missing value).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillParameters {
    /// Percentage change to state funding, negative for cuts.
    pub funding_change_pct: Option<f64>,
    /// Dollar change to the minimum wage.
    pub min_wage_change: Option<f64>,
    /// Childcare subsidy amount in dollars.
    pub childcare_subsidy: Option<f64>,
    /// Tuition increase cap in percent.
    pub tuition_cap_pct: Option<f64>,
    pub affected_types: BTreeSet<InstitutionType>,
    /// 0–100 heuristic estimate of extraction completeness.
    pub confidence_score: f64,
    pub extraction_method: ExtractionMethod,
    /// First ~500 characters of the normalized text, kept for summaries.
    pub bill_text_sample: String,
}

impl BillParameters {
    /// The all-null parameter set used when a document is unreadable or empty.
    pub fn empty() -> Self {
        Self {
            funding_change_pct: None,
            min_wage_change: None,
            childcare_subsidy: None,
            tuition_cap_pct: None,
            affected_types: InstitutionType::all(),
            confidence_score: 0.0,
            extraction_method: ExtractionMethod::RuleBased,
            bill_text_sample: String::new(),
        }
    }

    pub fn affects(&self, ty: InstitutionType) -> bool {
        self.affected_types.contains(&ty)
    }
}
