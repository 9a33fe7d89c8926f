//! Derived affordability metrics, computed after the model pass.

use crate::config;
use crate::models::{BillParameters, InstitutionImpact, InstitutionRecord};

/// Wage used to translate cost into work hours. The bill's wage wins when
/// it sets one; the divisor is floored so a zero or negative wage cannot
/// blow up the division.
pub fn effective_hourly_wage(bill: &BillParameters) -> f64 {
    let wage = match bill.min_wage_change {
        Some(w) if w != 0.0 => w,
        _ => config::DEFAULT_HOURLY_WAGE,
    };
    wage.max(config::MIN_WAGE_DIVISOR)
}

/// Fills the derived metric fields on each impact in place.
///
/// `tuition_change_dollars` needs a tuition prediction and
/// `students_affected` an enrollment prediction; each stays `None` without
/// its model. `hours_to_cover_gap` is always computed: absent components
/// count as zero, so it degrades toward the bare affordability gap rather
/// than disappearing.
pub fn apply_derived_metrics(
    impacts: &mut [InstitutionImpact],
    insts: &[InstitutionRecord],
    bill: &BillParameters,
) {
    let wage = effective_hourly_wage(bill);
    for (impact, inst) in impacts.iter_mut().zip(insts) {
        impact.tuition_change_dollars = impact
            .tuition_change_pct
            .map(|pct| inst.baseline_tuition * pct / 100.0);
        impact.students_affected = impact
            .enrollment_change_pct
            .map(|pct| inst.enrollment * pct.abs() / 100.0);

        let gap = inst.affordability_gap.unwrap_or(0.0);
        let extra = impact.tuition_change_dollars.unwrap_or(0.0);
        impact.hours_to_cover_gap = Some((gap + extra) / wage);
    }
}
