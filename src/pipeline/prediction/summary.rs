//! Population-level rollup of a prediction run.

use chrono::Utc;
use tracing::warn;

use crate::config;
use crate::models::{EquityRisk, ImpactSummary, InstitutionImpact, TopAffected};
use crate::pipeline::extraction::fallback::LlmClient;

/// Aggregates per-institution impacts into one summary.
///
/// Averages are taken over institutions where the metric is present, so a
/// skipped model target reports 0.0 rather than poisoning the mean. The
/// student total sums the derived `students_affected` headcount, so it is
/// 0 when the enrollment model did not run. The
/// plain-language text starts as the deterministic template; callers may
/// replace it via [`generate_plain_language_summary`].
pub fn aggregate_impact_summary(impacts: &[InstitutionImpact]) -> ImpactSummary {
    let mean_of = |values: &mut dyn Iterator<Item = f64>| {
        let collected: Vec<f64> = values.collect();
        if collected.is_empty() {
            0.0
        } else {
            collected.iter().sum::<f64>() / collected.len() as f64
        }
    };

    let mut breakdown = std::collections::BTreeMap::new();
    for risk in impacts.iter().filter_map(|i| i.equity_risk) {
        *breakdown.entry(risk.as_str().to_string()).or_insert(0) += 1;
    }

    let mut ranked: Vec<&InstitutionImpact> = impacts
        .iter()
        .filter(|i| i.tuition_change_dollars.is_some())
        .collect();
    ranked.sort_by(|a, b| {
        let da = a.tuition_change_dollars.unwrap_or(0.0).abs();
        let db = b.tuition_change_dollars.unwrap_or(0.0).abs();
        db.partial_cmp(&da).unwrap_or(std::cmp::Ordering::Equal)
    });
    let top_affected = ranked
        .into_iter()
        .take(config::TOP_AFFECTED_COUNT)
        .map(|i| TopAffected {
            institution_id: i.institution_id.clone(),
            name: i.name.clone(),
            tuition_change_dollars: i.tuition_change_dollars.unwrap_or(0.0),
        })
        .collect();

    let mut summary = ImpactSummary {
        total_colleges_affected: impacts.len(),
        total_students_impacted: impacts
            .iter()
            .filter_map(|i| i.students_affected)
            .map(|s| s.max(0.0))
            .sum::<f64>() as u64,
        average_tuition_change_pct: mean_of(
            &mut impacts.iter().filter_map(|i| i.tuition_change_pct),
        ),
        average_tuition_change_dollars: mean_of(
            &mut impacts.iter().filter_map(|i| i.tuition_change_dollars),
        ),
        average_enrollment_change_pct: mean_of(
            &mut impacts.iter().filter_map(|i| i.enrollment_change_pct),
        ),
        average_grad_rate_change: mean_of(
            &mut impacts.iter().filter_map(|i| i.grad_rate_change),
        ),
        equity_risk_breakdown: breakdown,
        high_risk_colleges: impacts
            .iter()
            .filter(|i| i.equity_risk == Some(EquityRisk::High))
            .count(),
        minority_serving_affected: impacts.iter().filter(|i| i.pct_minority > 50.0).count(),
        low_income_serving_affected: impacts.iter().filter(|i| i.pct_low_income > 50.0).count(),
        top_affected,
        plain_language_summary: String::new(),
        generated_at: Utc::now(),
    };
    summary.plain_language_summary = template_summary(&summary);
    summary
}

/// Deterministic fallback synopsis. Never empty, even for an empty run.
pub fn template_summary(summary: &ImpactSummary) -> String {
    let mut text = format!(
        "This bill affects {} colleges and {} students.",
        summary.total_colleges_affected, summary.total_students_impacted
    );
    if summary.average_tuition_change_dollars != 0.0 {
        text.push_str(&format!(
            " Average tuition changes by ${:.0} per year.",
            summary.average_tuition_change_dollars
        ));
    }
    if summary.high_risk_colleges > 0 {
        text.push_str(&format!(
            " {} institutions face high equity risk.",
            summary.high_risk_colleges
        ));
    }
    text
}

/// Produces the narrative synopsis, preferring the generative client when
/// one is available and falling back to the template on any failure.
pub fn generate_plain_language_summary(
    client: Option<&dyn LlmClient>,
    bill_text_sample: &str,
    summary: &ImpactSummary,
) -> String {
    let Some(client) = client else {
        return template_summary(summary);
    };
    let prompt = build_summary_prompt(bill_text_sample, summary);
    match client.complete(&prompt) {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => {
            warn!("summary generation returned empty text, using template");
            template_summary(summary)
        }
        Err(e) => {
            warn!(error = %e, "summary generation failed, using template");
            template_summary(summary)
        }
    }
}

fn build_summary_prompt(bill_text_sample: &str, summary: &ImpactSummary) -> String {
    format!(
        "Write a 2-3 sentence plain-language summary of this bill's predicted \
         impact on colleges, for a non-technical audience. No markdown.\n\n\
         Bill excerpt: {bill_text_sample}\n\n\
         Predicted impact: {} colleges affected, {} students, average tuition \
         change {:.1}% (${:.0}), average enrollment change {:.1}%, \
         {} high equity-risk institutions.",
        summary.total_colleges_affected,
        summary.total_students_impacted,
        summary.average_tuition_change_pct,
        summary.average_tuition_change_dollars,
        summary.average_enrollment_change_pct,
        summary.high_risk_colleges,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::fallback::MockLlmClient;

    fn impact(id: &str, dollars: Option<f64>) -> InstitutionImpact {
        InstitutionImpact {
            institution_id: id.to_string(),
            name: id.to_string(),
            institution_type: None,
            state: None,
            enrollment: 1000.0,
            pct_low_income: 30.0,
            pct_minority: 25.0,
            baseline_tuition: 8000.0,
            tuition_change_pct: dollars.map(|d| d / 80.0),
            enrollment_change_pct: None,
            grad_rate_change: None,
            equity_risk: None,
            tuition_change_dollars: dollars,
            students_affected: None,
            hours_to_cover_gap: None,
        }
    }

    #[test]
    fn averages_skip_missing_values() {
        let impacts = vec![impact("A", Some(100.0)), impact("B", None)];
        let summary = aggregate_impact_summary(&impacts);
        assert_eq!(summary.average_tuition_change_dollars, 100.0);
        assert_eq!(summary.total_colleges_affected, 2);
    }

    #[test]
    fn students_total_sums_derived_metric_not_enrollment() {
        let mut a = impact("A", None);
        a.students_affected = Some(100.0);
        let b = impact("B", None);
        let summary = aggregate_impact_summary(&[a, b]);
        // Enrollment is 1000 per institution; only the derived headcount
        // counts, and a missing enrollment model contributes nothing.
        assert_eq!(summary.total_students_impacted, 100);
    }

    #[test]
    fn all_missing_average_is_zero() {
        let impacts = vec![impact("A", None)];
        let summary = aggregate_impact_summary(&impacts);
        assert_eq!(summary.average_tuition_change_dollars, 0.0);
        assert_eq!(summary.average_enrollment_change_pct, 0.0);
    }

    #[test]
    fn top_affected_ranks_by_absolute_dollars() {
        let impacts = vec![
            impact("small", Some(50.0)),
            impact("cut", Some(-900.0)),
            impact("raise", Some(400.0)),
            impact("none", None),
        ];
        let summary = aggregate_impact_summary(&impacts);
        let ids: Vec<&str> = summary
            .top_affected
            .iter()
            .map(|t| t.institution_id.as_str())
            .collect();
        assert_eq!(ids, vec!["cut", "raise", "small"]);
    }

    #[test]
    fn top_affected_is_capped() {
        let impacts: Vec<InstitutionImpact> = (0..15)
            .map(|i| impact(&format!("C{i}"), Some(i as f64)))
            .collect();
        let summary = aggregate_impact_summary(&impacts);
        assert_eq!(summary.top_affected.len(), config::TOP_AFFECTED_COUNT);
    }

    #[test]
    fn equity_breakdown_counts_labels() {
        let mut a = impact("A", None);
        a.equity_risk = Some(EquityRisk::High);
        let mut b = impact("B", None);
        b.equity_risk = Some(EquityRisk::High);
        let mut c = impact("C", None);
        c.equity_risk = Some(EquityRisk::Low);
        let summary = aggregate_impact_summary(&[a, b, c]);
        assert_eq!(summary.equity_risk_breakdown["High"], 2);
        assert_eq!(summary.equity_risk_breakdown["Low"], 1);
        assert_eq!(summary.high_risk_colleges, 2);
    }

    #[test]
    fn demographic_counts_use_majority_thresholds() {
        let mut a = impact("A", None);
        a.pct_minority = 60.0;
        a.pct_low_income = 55.0;
        let b = impact("B", None);
        let summary = aggregate_impact_summary(&[a, b]);
        assert_eq!(summary.minority_serving_affected, 1);
        assert_eq!(summary.low_income_serving_affected, 1);
    }

    #[test]
    fn template_is_never_empty() {
        let summary = aggregate_impact_summary(&[]);
        assert!(!summary.plain_language_summary.is_empty());
        assert!(summary.plain_language_summary.contains("0 colleges"));
    }

    #[test]
    fn llm_summary_used_when_available() {
        let summary = aggregate_impact_summary(&[impact("A", Some(100.0))]);
        let client = MockLlmClient::replying("Tuition goes up a bit statewide.");
        let text = generate_plain_language_summary(Some(&client), "bill text", &summary);
        assert_eq!(text, "Tuition goes up a bit statewide.");
    }

    #[test]
    fn llm_failure_falls_back_to_template() {
        let summary = aggregate_impact_summary(&[impact("A", Some(100.0))]);
        let client = MockLlmClient::failing("rate limited");
        let text = generate_plain_language_summary(Some(&client), "bill text", &summary);
        assert_eq!(text, template_summary(&summary));
        assert!(!text.is_empty());
    }

    #[test]
    fn empty_llm_response_falls_back_to_template() {
        let summary = aggregate_impact_summary(&[]);
        let client = MockLlmClient::replying("   ");
        let text = generate_plain_language_summary(Some(&client), "", &summary);
        assert_eq!(text, template_summary(&summary));
    }
}
