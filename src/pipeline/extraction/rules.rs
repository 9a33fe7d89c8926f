//! Rule-based extraction: first-match selection over the pattern matchers
//! plus the fixed-weight confidence score.

use std::collections::BTreeSet;

use crate::models::{BillParameters, ExtractionMethod, InstitutionType};

use super::patterns;

/// Per-field confidence weights. Summed over populated fields, capped at 100.
pub mod weights {
    pub const FUNDING: f64 = 30.0;
    pub const WAGE: f64 = 20.0;
    pub const SUBSIDY: f64 = 20.0;
    pub const TUITION_CAP: f64 = 10.0;
    pub const INSTITUTION_TYPES: f64 = 20.0;
}

/// Which of the five fields rule-based extraction populated.
///
/// `types_explicit` is true only for an actual sector keyword hit; the
/// all-three default earns no confidence.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldPresence {
    pub funding: bool,
    pub wage: bool,
    pub subsidy: bool,
    pub tuition_cap: bool,
    pub types_explicit: bool,
}

/// Fixed-weight confidence score in `[0, 100]`.
pub fn score_confidence(presence: &FieldPresence) -> f64 {
    let mut score = 0.0;
    if presence.funding {
        score += weights::FUNDING;
    }
    if presence.wage {
        score += weights::WAGE;
    }
    if presence.subsidy {
        score += weights::SUBSIDY;
    }
    if presence.tuition_cap {
        score += weights::TUITION_CAP;
    }
    if presence.types_explicit {
        score += weights::INSTITUTION_TYPES;
    }
    score.min(100.0)
}

/// Deterministic extraction over normalized text.
///
/// Every matcher returns matches in document order; this function applies
/// the "first match wins" policy and the all-three sector default.
pub fn rule_based_extraction(text: &str) -> BillParameters {
    let funding = patterns::find_funding_changes(text).into_iter().next();
    let wage = patterns::find_wage_changes(text).into_iter().next();
    let subsidy = patterns::find_childcare_subsidies(text).into_iter().next();
    let tuition_cap = patterns::find_tuition_caps(text).into_iter().next();

    let explicit_types = patterns::find_institution_types(text);
    let types_explicit = !explicit_types.is_empty();
    let affected_types: BTreeSet<InstitutionType> = if types_explicit {
        explicit_types
    } else {
        InstitutionType::all()
    };

    let presence = FieldPresence {
        funding: funding.is_some(),
        wage: wage.is_some(),
        subsidy: subsidy.is_some(),
        tuition_cap: tuition_cap.is_some(),
        types_explicit,
    };

    BillParameters {
        funding_change_pct: funding.map(|m| m.value),
        min_wage_change: wage.map(|m| m.value),
        childcare_subsidy: subsidy.map(|m| m.value),
        tuition_cap_pct: tuition_cap.map(|m| m.value),
        affected_types,
        confidence_score: score_confidence(&presence),
        extraction_method: ExtractionMethod::RuleBased,
        bill_text_sample: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_free_text_scores_zero_with_all_types() {
        let params = rule_based_extraction("Definitions. Severability. Effective date.");
        assert_eq!(params.confidence_score, 0.0);
        assert_eq!(params.affected_types, InstitutionType::all());
        assert!(params.funding_change_pct.is_none());
        assert!(params.min_wage_change.is_none());
    }

    #[test]
    fn funding_cut_scenario() {
        let params =
            rule_based_extraction("The bill cuts state funding by 12 percent for public universities.");
        assert_eq!(params.funding_change_pct, Some(-12.0));
        assert_eq!(
            params.affected_types,
            [InstitutionType::Public].into_iter().collect()
        );
        assert!(params.confidence_score >= 50.0);
    }

    #[test]
    fn first_match_wins_for_each_field() {
        let text = "The budget is reduced by 10%, and a later allocation is cut by 25%.";
        let params = rule_based_extraction(text);
        assert_eq!(params.funding_change_pct, Some(-10.0));
    }

    #[test]
    fn confidence_is_monotone_in_populated_fields() {
        let steps: Vec<Box<dyn Fn(&mut FieldPresence)>> = vec![
            Box::new(|p| p.funding = true),
            Box::new(|p| p.wage = true),
            Box::new(|p| p.subsidy = true),
            Box::new(|p| p.tuition_cap = true),
            Box::new(|p| p.types_explicit = true),
        ];
        let mut presence = FieldPresence::default();
        let mut last = score_confidence(&presence);
        for step in steps {
            step(&mut presence);
            let score = score_confidence(&presence);
            assert!(score >= last);
            last = score;
        }
        assert_eq!(last, 100.0);
    }

    #[test]
    fn all_fields_cap_at_one_hundred() {
        let presence = FieldPresence {
            funding: true,
            wage: true,
            subsidy: true,
            tuition_cap: true,
            types_explicit: true,
        };
        assert_eq!(score_confidence(&presence), 100.0);
    }

    #[test]
    fn full_bill_extracts_every_field() {
        let text = "This act increases state funding for community colleges by 6%, raises the \
                    minimum wage to $16.50, establishes a childcare subsidy of $3,000 per year, \
                    and imposes a tuition cap of 4% on annual increases.";
        let params = rule_based_extraction(text);
        assert_eq!(params.funding_change_pct, Some(6.0));
        assert_eq!(params.min_wage_change, Some(16.5));
        assert_eq!(params.childcare_subsidy, Some(3000.0));
        assert_eq!(params.tuition_cap_pct, Some(4.0));
        assert_eq!(params.confidence_score, 100.0);
    }

    #[test]
    fn keyword_without_value_contributes_nothing() {
        let params = rule_based_extraction("the state budget shall be reduced by an amount set later");
        assert!(params.funding_change_pct.is_none());
        // only the funding keyword was present, and it carried no value
        assert_eq!(params.confidence_score, 0.0);
    }
}
