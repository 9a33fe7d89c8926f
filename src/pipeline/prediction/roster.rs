//! College roster ingest and bill-scope filtering.
//!
//! Rosters come from several upstream exports with drifting header names,
//! so each field resolves against a candidate list once per file. Missing
//! columns fall back to documented defaults instead of failing the run.

use std::collections::HashMap;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, warn};

use super::PredictionError;
use crate::config::defaults;
use crate::models::{BillParameters, InstitutionRecord, InstitutionType};

/// Accepted spellings per field, in priority order.
const ID_COLUMNS: &[&str] = &["institution_id", "id"];
const NAME_COLUMNS: &[&str] = &["name", "institution_name"];
const TYPE_COLUMNS: &[&str] = &["institution_type", "type", "sector"];
const STATE_COLUMNS: &[&str] = &["state"];
const ENROLLMENT_COLUMNS: &[&str] = &["enrollment", "total_enrollment"];
const PCT_LOW_INCOME_COLUMNS: &[&str] = &["pct_low_income", "low_income_pct"];
const PCT_MINORITY_COLUMNS: &[&str] = &["pct_minority", "minority_pct"];
const TUITION_COLUMNS: &[&str] = &["baseline_tuition", "net_price"];
const GRAD_RATE_COLUMNS: &[&str] = &["baseline_grad_rate", "grad_rate"];
const GAP_COLUMNS: &[&str] = &["affordability_gap"];

/// Column indices resolved once per file from the header row.
struct ColumnMap {
    id: usize,
    name: Option<usize>,
    institution_type: Option<usize>,
    state: Option<usize>,
    enrollment: Option<usize>,
    pct_low_income: Option<usize>,
    pct_minority: Option<usize>,
    baseline_tuition: Option<usize>,
    baseline_grad_rate: Option<usize>,
    affordability_gap: Option<usize>,
}

impl ColumnMap {
    fn resolve(headers: &StringRecord) -> Result<Self, PredictionError> {
        let index: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (normalize_header_name(h), i))
            .collect();
        let find = |candidates: &[&str]| {
            candidates.iter().find_map(|c| index.get(*c).copied())
        };

        let id = find(ID_COLUMNS).ok_or_else(|| {
            PredictionError::Roster(format!(
                "no institution id column found (looked for {})",
                ID_COLUMNS.join(", ")
            ))
        })?;
        Ok(Self {
            id,
            name: find(NAME_COLUMNS),
            institution_type: find(TYPE_COLUMNS),
            state: find(STATE_COLUMNS),
            enrollment: find(ENROLLMENT_COLUMNS),
            pct_low_income: find(PCT_LOW_INCOME_COLUMNS),
            pct_minority: find(PCT_MINORITY_COLUMNS),
            baseline_tuition: find(TUITION_COLUMNS),
            baseline_grad_rate: find(GRAD_RATE_COLUMNS),
            affordability_gap: find(GAP_COLUMNS),
        })
    }
}

fn normalize_header_name(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_ascii_lowercase()
}

/// Loads the college roster from a CSV file.
///
/// Rows missing an institution id are skipped with a warning; absent or
/// unparseable numeric cells take the documented field default.
pub fn load_roster(path: &Path) -> Result<Vec<InstitutionRecord>, PredictionError> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)
        .map_err(|e| PredictionError::Roster(format!("{}: {e}", path.display())))?;

    let columns = ColumnMap::resolve(reader.headers().map_err(|e| {
        PredictionError::Roster(format!("unreadable header row: {e}"))
    })?)?;

    let mut roster = Vec::new();
    for (row_idx, record) in reader.records().enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                warn!(row = row_idx + 2, error = %e, "skipping malformed roster row");
                continue;
            }
        };
        match parse_row(&record, &columns) {
            Some(inst) => roster.push(inst),
            None => warn!(row = row_idx + 2, "skipping roster row without an id"),
        }
    }
    debug!(institutions = roster.len(), path = %path.display(), "loaded roster");
    Ok(roster)
}

fn parse_row(record: &StringRecord, columns: &ColumnMap) -> Option<InstitutionRecord> {
    let cell = |idx: Option<usize>| {
        idx.and_then(|i| record.get(i))
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };
    let numeric = |idx: Option<usize>, default: f64| {
        cell(idx).and_then(|s| s.parse::<f64>().ok()).unwrap_or(default)
    };

    let institution_id = cell(Some(columns.id))?.to_string();
    let name = cell(columns.name)
        .map(str::to_string)
        .unwrap_or_else(|| institution_id.clone());
    let institution_type = cell(columns.institution_type).and_then(InstitutionType::parse);
    let state = cell(columns.state).map(|s| s.to_ascii_uppercase());
    let affordability_gap = cell(columns.affordability_gap).and_then(|s| s.parse::<f64>().ok());

    Some(InstitutionRecord {
        institution_id,
        name,
        institution_type,
        state,
        enrollment: numeric(columns.enrollment, defaults::ENROLLMENT),
        pct_low_income: numeric(columns.pct_low_income, defaults::PCT_LOW_INCOME),
        pct_minority: numeric(columns.pct_minority, defaults::PCT_MINORITY),
        baseline_tuition: numeric(columns.baseline_tuition, defaults::BASELINE_TUITION),
        baseline_grad_rate: numeric(columns.baseline_grad_rate, defaults::BASELINE_GRAD_RATE),
        affordability_gap,
    })
}

/// Narrows the roster to institutions the bill reaches.
///
/// Pure and idempotent. Type filtering drops rows whose sector is unknown;
/// state filtering compares case-insensitively, and an empty state list
/// means no geographic restriction.
pub fn filter_institutions(
    roster: &[InstitutionRecord],
    params: &BillParameters,
    states: Option<&[String]>,
) -> Vec<InstitutionRecord> {
    let states: Option<Vec<String>> = states
        .filter(|s| !s.is_empty())
        .map(|s| s.iter().map(|st| st.to_ascii_uppercase()).collect());

    roster
        .iter()
        .filter(|inst| {
            inst.institution_type
                .is_some_and(|ty| params.affects(ty))
        })
        .filter(|inst| match (&states, &inst.state) {
            (None, _) => true,
            (Some(wanted), Some(state)) => wanted.contains(state),
            (Some(_), None) => false,
        })
        .cloned()
        .collect()
}
