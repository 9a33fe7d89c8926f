//! Text normalizer for raw bill text.
//!
//! Pure and deterministic: the same input always yields the same output.
//! Runs before every pattern extractor so their context windows see clean,
//! single-spaced text.

use std::sync::LazyLock;

use regex::Regex;

static PAGE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Page \d+ of \d+").unwrap());

static BILL_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Senate Bill \d+|House Bill \d+|Assembly Bill \d+").unwrap());

// Hyphenation must be repaired while line breaks still exist; whitespace
// collapsing erases the newline this pattern anchors on.
static HYPHEN_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w+)-\s*\n\s*(\w+)").unwrap());

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Strip page artifacts and bill-title boilerplate, repair words split by
/// hyphenated line breaks, and collapse all whitespace runs to one space.
pub fn normalize_bill_text(text: &str) -> String {
    let text = PAGE_MARKER.replace_all(text, "");
    let text = BILL_TITLE.replace_all(&text, "");
    let text = HYPHEN_BREAK.replace_all(&text, "$1$2");
    let text = WHITESPACE.replace_all(&text, " ");
    text.trim().to_string()
}
