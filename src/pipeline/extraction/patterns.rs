//! Pattern extractors over normalized bill text.
//!
//! Every matcher is a pure function returning an **ordered** list of typed
//! matches in document order. "First match wins" is a policy applied by the
//! caller ([`rules`]), never baked into a matcher.
//!
//! [`rules`]: super::rules

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::InstitutionType;

/// Characters scanned on each side of a keyword when looking for the
/// direction verb and numeric value that belong to it.
pub const CONTEXT_WINDOW_CHARS: usize = 100;

static MONEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\$([\d,]+(?:\.\d+)?)(?:\s*(million|billion|m|b)\b)?").unwrap()
});

static PERCENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:percentage points?|percent|%)").unwrap()
});

static FUNDING_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)funding|appropriations?|budget|allocations?").unwrap());

static NEGATIVE_VERB: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:cut|cuts|reduce|reduces|reduced|decrease|decreases|reduction)\b").unwrap());

static POSITIVE_VERB: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:increase|increases|increased|boost|boosts|raise|raises|add|adds)\b").unwrap());

static WAGE_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)minimum wage|min wage|\bwage\b").unwrap());

static CHILDCARE_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)childcare|child care|child-care").unwrap());

static SUBSIDY_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:subsidy|subsidies|grant|grants|assistance|support)\b").unwrap());

static TUITION_CAP_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)tuition cap|tuition limit|tuition increase limit").unwrap()
});

/// A `$`-amount in absolute dollars with its byte offset in the text.
#[derive(Debug, Clone, PartialEq)]
pub struct MoneyMatch {
    pub amount: f64,
    pub offset: usize,
}

/// A percentage value with its byte offset in the text.
#[derive(Debug, Clone, PartialEq)]
pub struct PercentMatch {
    pub value: f64,
    pub offset: usize,
}

/// A numeric value found inside a keyword context window.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextValue {
    pub value: f64,
    /// The window text the value was taken from.
    pub context: String,
}

/// All dollar amounts in document order, with million/billion suffixes
/// already applied.
pub fn find_money_amounts(text: &str) -> Vec<MoneyMatch> {
    MONEY
        .captures_iter(text)
        .filter_map(|caps| {
            let raw = caps.get(1)?;
            let amount: f64 = raw.as_str().replace(',', "").parse().ok()?;
            let multiplier = match caps.get(2).map(|m| m.as_str().to_ascii_lowercase()) {
                Some(s) if s == "million" || s == "m" => 1_000_000.0,
                Some(s) if s == "billion" || s == "b" => 1_000_000_000.0,
                _ => 1.0,
            };
            Some(MoneyMatch {
                amount: amount * multiplier,
                offset: caps.get(0).unwrap().start(),
            })
        })
        .collect()
}

/// All `N%` / `N percent` / `N percentage points` values in document order.
pub fn find_percentages(text: &str) -> Vec<PercentMatch> {
    PERCENT
        .captures_iter(text)
        .filter_map(|caps| {
            let value: f64 = caps.get(1)?.as_str().parse().ok()?;
            Some(PercentMatch {
                value,
                offset: caps.get(0).unwrap().start(),
            })
        })
        .collect()
}

/// Signed funding changes: for each funding/appropriation/budget keyword,
/// the surrounding window is scanned for a direction verb and the first
/// percentage. Cut verbs win over increase verbs when both appear.
pub fn find_funding_changes(text: &str) -> Vec<ContextValue> {
    keyword_windows(text, &FUNDING_KEYWORD)
        .into_iter()
        .filter_map(|w| {
            let sign = if NEGATIVE_VERB.is_match(w.text) {
                -1.0
            } else if POSITIVE_VERB.is_match(w.text) {
                1.0
            } else {
                return None;
            };
            let candidates = find_percentages(w.text)
                .into_iter()
                .map(|p| (p.value, p.offset));
            let value = first_preferring_after(candidates, w.keyword_at)?;
            Some(ContextValue {
                value: sign * value.abs(),
                context: w.text.to_string(),
            })
        })
        .collect()
}

/// Dollar values near minimum-wage phrases.
pub fn find_wage_changes(text: &str) -> Vec<ContextValue> {
    keyword_windows(text, &WAGE_KEYWORD)
        .into_iter()
        .filter_map(|w| {
            let candidates = find_money_amounts(w.text)
                .into_iter()
                .map(|m| (m.amount, m.offset));
            let value = first_preferring_after(candidates, w.keyword_at)?;
            Some(ContextValue {
                value,
                context: w.text.to_string(),
            })
        })
        .collect()
}

/// Dollar values near childcare phrases that also mention a subsidy,
/// grant, assistance, or support.
pub fn find_childcare_subsidies(text: &str) -> Vec<ContextValue> {
    keyword_windows(text, &CHILDCARE_KEYWORD)
        .into_iter()
        .filter_map(|w| {
            if !SUBSIDY_WORD.is_match(w.text) {
                return None;
            }
            let candidates = find_money_amounts(w.text)
                .into_iter()
                .map(|m| (m.amount, m.offset));
            let value = first_preferring_after(candidates, w.keyword_at)?;
            Some(ContextValue {
                value,
                context: w.text.to_string(),
            })
        })
        .collect()
}

/// Percentage values near tuition-cap phrases.
pub fn find_tuition_caps(text: &str) -> Vec<ContextValue> {
    keyword_windows(text, &TUITION_CAP_KEYWORD)
        .into_iter()
        .filter_map(|w| {
            let candidates = find_percentages(w.text)
                .into_iter()
                .map(|p| (p.value, p.offset));
            let value = first_preferring_after(candidates, w.keyword_at)?;
            Some(ContextValue {
                value,
                context: w.text.to_string(),
            })
        })
        .collect()
}

/// First value at or after the keyword, else the first value in the window.
/// Windows extend backwards too, so a naive "first in window" could steal a
/// value that belongs to the previous clause.
fn first_preferring_after(
    candidates: impl Iterator<Item = (f64, usize)> + Clone,
    keyword_at: usize,
) -> Option<f64> {
    candidates
        .clone()
        .find(|(_, offset)| *offset >= keyword_at)
        .or_else(|| candidates.clone().next())
        .map(|(value, _)| value)
}

const PUBLIC_PHRASES: &[&str] = &[
    "public university",
    "public universities",
    "public college",
    "public colleges",
    "state university",
    "state universities",
];

const PRIVATE_PHRASES: &[&str] = &[
    "private university",
    "private universities",
    "private college",
    "private colleges",
    "private institution",
    "private institutions",
];

const COMMUNITY_PHRASES: &[&str] = &["community college", "community colleges"];

/// Sectors the text names explicitly. Empty when no sector keyword appears;
/// the caller decides whether that means "all three".
pub fn find_institution_types(text: &str) -> BTreeSet<InstitutionType> {
    let lower = text.to_lowercase();
    let mut types = BTreeSet::new();

    if PUBLIC_PHRASES.iter().any(|p| lower.contains(p)) {
        types.insert(InstitutionType::Public);
    }
    if PRIVATE_PHRASES.iter().any(|p| lower.contains(p)) {
        types.insert(InstitutionType::Private);
    }
    if COMMUNITY_PHRASES.iter().any(|p| lower.contains(p)) {
        types.insert(InstitutionType::Community);
    }

    types
}

/// Context windows of `CONTEXT_WINDOW_CHARS` bytes on each side of every
/// keyword occurrence, in document order, clamped to char boundaries.
struct KeywordWindow<'a> {
    text: &'a str,
    /// Byte offset of the keyword match within `text`.
    keyword_at: usize,
}

fn keyword_windows<'a>(text: &'a str, keyword: &Regex) -> Vec<KeywordWindow<'a>> {
    keyword
        .find_iter(text)
        .map(|m| {
            let start = floor_char_boundary(text, m.start().saturating_sub(CONTEXT_WINDOW_CHARS));
            let end = ceil_char_boundary(text, (m.end() + CONTEXT_WINDOW_CHARS).min(text.len()));
            KeywordWindow {
                text: &text[start..end],
                keyword_at: m.start() - start,
            }
        })
        .collect()
}

fn floor_char_boundary(text: &str, mut idx: usize) -> usize {
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_char_boundary(text: &str, mut idx: usize) -> usize {
    while idx < text.len() && !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}
