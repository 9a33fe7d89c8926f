//! End-to-end prediction run: roster to impacts and summary.

use std::path::Path;

use tracing::{info, info_span};

use super::artifacts::load_artifacts;
use super::features::{transform, FeatureConfig};
use super::metrics::apply_derived_metrics;
use super::roster::{filter_institutions, load_roster};
use super::runner::run_predictions;
use super::summary::{aggregate_impact_summary, generate_plain_language_summary};
use super::PredictionError;
use crate::models::{BillParameters, ImpactSummary, InstitutionImpact};
use crate::pipeline::extraction::fallback::LlmClient;

/// Knobs for a single prediction run.
#[derive(Default)]
pub struct PredictOptions {
    /// Restrict the run to these states; empty means no restriction.
    pub affected_states: Vec<String>,
}

/// Runs the full prediction pipeline for one extracted bill.
///
/// A roster that filters down to nothing is a valid outcome: the run
/// returns no impacts and the all-zero summary instead of an error.
pub fn predict_bill_impact(
    roster_path: &Path,
    artifacts_dir: &Path,
    bill: &BillParameters,
    opts: &PredictOptions,
    llm: Option<&dyn LlmClient>,
) -> Result<(Vec<InstitutionImpact>, ImpactSummary), PredictionError> {
    let span = info_span!("predict_impact", roster = %roster_path.display());
    let _guard = span.enter();

    let roster = load_roster(roster_path)?;
    let states = if opts.affected_states.is_empty() {
        None
    } else {
        Some(opts.affected_states.as_slice())
    };
    let insts = filter_institutions(&roster, bill, states);
    info!(
        roster = roster.len(),
        in_scope = insts.len(),
        "filtered roster to bill scope"
    );
    if insts.is_empty() {
        return Ok((Vec::new(), ImpactSummary::empty()));
    }

    let artifacts = load_artifacts(artifacts_dir)?;
    let features = transform(
        &insts,
        bill,
        &FeatureConfig::v1(),
        &artifacts.scaler,
        &artifacts.encoders,
    )?;
    let mut impacts = run_predictions(&insts, &features, &artifacts)?;
    apply_derived_metrics(&mut impacts, &insts, bill);

    let mut summary = aggregate_impact_summary(&impacts);
    summary.plain_language_summary =
        generate_plain_language_summary(llm, &bill.bill_text_sample, &summary);
    Ok((impacts, summary))
}
