//! Merging fallback output into a rule-based parameter set.

use tracing::debug;

use super::fallback::FallbackParameters;
use crate::config;
use crate::models::{BillParameters, ExtractionMethod};

/// Overlays a validated fallback response onto the rule-based result.
///
/// Field-by-field, a present fallback value wins and a null keeps the
/// rule-based value; the fallback can fill gaps but never erase. The merged
/// set carries the fixed fallback confidence and is marked as LLM-derived.
pub fn merge_parameters(rules: &BillParameters, fallback: &FallbackParameters) -> BillParameters {
    let mut merged = rules.clone();

    if fallback.funding_change_pct.is_some() {
        merged.funding_change_pct = fallback.funding_change_pct;
    }
    if fallback.min_wage_change.is_some() {
        merged.min_wage_change = fallback.min_wage_change;
    }
    if fallback.childcare_subsidy.is_some() {
        merged.childcare_subsidy = fallback.childcare_subsidy;
    }
    if fallback.tuition_cap_pct.is_some() {
        merged.tuition_cap_pct = fallback.tuition_cap_pct;
    }
    // llm_fallback_extraction already rejected responses with invalid
    // sector names, so Err is unreachable here. A missing or empty list
    // keeps the rule-based sectors (which already default to all three).
    if let Ok(Some(types)) = fallback.parsed_types() {
        if !types.is_empty() {
            merged.affected_types = types;
        }
    }

    merged.confidence_score = config::FALLBACK_CONFIDENCE;
    merged.extraction_method = ExtractionMethod::Llm;
    debug!(
        confidence = merged.confidence_score,
        "merged fallback parameters"
    );
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InstitutionType;

    fn rule_result() -> BillParameters {
        let mut params = BillParameters::empty();
        params.funding_change_pct = Some(-12.0);
        params.confidence_score = 30.0;
        params.bill_text_sample = "cuts state funding".to_string();
        params
    }

    fn fallback(json: &str) -> FallbackParameters {
        serde_json::from_str(json).expect("fallback json")
    }

    #[test]
    fn present_fallback_values_overwrite() {
        let merged = merge_parameters(
            &rule_result(),
            &fallback(
                r#"{"funding_change_pct": -15.0, "min_wage_change": 2.0,
                    "childcare_subsidy": null, "tuition_cap_pct": null,
                    "affected_types": null}"#,
            ),
        );
        assert_eq!(merged.funding_change_pct, Some(-15.0));
        assert_eq!(merged.min_wage_change, Some(2.0));
    }

    #[test]
    fn null_never_erases_a_rule_value() {
        let merged = merge_parameters(
            &rule_result(),
            &fallback(
                r#"{"funding_change_pct": null, "min_wage_change": null,
                    "childcare_subsidy": null, "tuition_cap_pct": null,
                    "affected_types": null}"#,
            ),
        );
        assert_eq!(merged.funding_change_pct, Some(-12.0));
    }

    #[test]
    fn merge_sets_confidence_and_method() {
        let merged = merge_parameters(
            &rule_result(),
            &fallback(
                r#"{"funding_change_pct": null, "min_wage_change": null,
                    "childcare_subsidy": null, "tuition_cap_pct": null,
                    "affected_types": null}"#,
            ),
        );
        assert_eq!(merged.confidence_score, config::FALLBACK_CONFIDENCE);
        assert_eq!(merged.extraction_method, ExtractionMethod::Llm);
        assert_eq!(merged.bill_text_sample, "cuts state funding");
    }

    #[test]
    fn fallback_types_replace_default_set() {
        let merged = merge_parameters(
            &rule_result(),
            &fallback(
                r#"{"funding_change_pct": null, "min_wage_change": null,
                    "childcare_subsidy": null, "tuition_cap_pct": null,
                    "affected_types": ["community"]}"#,
            ),
        );
        assert_eq!(merged.affected_types.len(), 1);
        assert!(merged.affects(InstitutionType::Community));
    }

    #[test]
    fn empty_types_list_keeps_rule_sectors() {
        let merged = merge_parameters(
            &rule_result(),
            &fallback(
                r#"{"funding_change_pct": null, "min_wage_change": null,
                    "childcare_subsidy": null, "tuition_cap_pct": null,
                    "affected_types": []}"#,
            ),
        );
        assert_eq!(merged.affected_types.len(), 3);
    }
}
