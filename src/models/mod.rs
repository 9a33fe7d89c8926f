pub mod bill;
pub mod institution;
pub mod prediction;

pub use bill::{BillParameters, ExtractionMethod, InstitutionType};
pub use institution::InstitutionRecord;
pub use prediction::{EquityRisk, ImpactSummary, InstitutionImpact, TopAffected};
