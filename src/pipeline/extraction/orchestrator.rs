//! Two-tier extraction orchestration.
//!
//! Runs the rule-based pass first and escalates to the generative fallback
//! only when confidence lands below the threshold. The pipeline never
//! fails: every failure mode degrades to a usable parameter set.

use std::path::Path;

use tracing::{info, info_span, warn};

use super::document::load_document_text;
use super::fallback::{llm_fallback_extraction, LlmClient};
use super::merge::merge_parameters;
use super::normalize::normalize_bill_text;
use super::rules::rule_based_extraction;
use crate::config;
use crate::models::BillParameters;

/// Knobs for a single extraction run.
pub struct ExtractOptions {
    /// Rule-based confidence below this escalates to the fallback.
    pub confidence_threshold: f64,
    /// Master switch for the generative fallback.
    pub use_fallback: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            confidence_threshold: config::CONFIDENCE_THRESHOLD,
            use_fallback: true,
        }
    }
}

/// Entry point of the extraction pipeline.
pub struct BillExtractor {
    fallback: Option<Box<dyn LlmClient>>,
}

impl BillExtractor {
    pub fn new(fallback: Option<Box<dyn LlmClient>>) -> Self {
        Self { fallback }
    }

    /// Rule-based only, no generative escalation possible.
    pub fn without_fallback() -> Self {
        Self { fallback: None }
    }

    /// Extracts parameters from a bill document on disk.
    ///
    /// Unreadable files and empty documents yield the all-null parameter
    /// set with confidence 0 rather than an error.
    pub fn process_bill(&self, path: &Path, opts: &ExtractOptions) -> BillParameters {
        let span = info_span!("extract_bill", path = %path.display());
        let _guard = span.enter();

        let raw = match load_document_text(path) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "could not read bill document, using empty parameters");
                return BillParameters::empty();
            }
        };
        self.process_text(&raw, opts)
    }

    /// Extracts parameters from already-loaded bill text.
    pub fn process_text(&self, raw: &str, opts: &ExtractOptions) -> BillParameters {
        let text = normalize_bill_text(raw);
        if text.is_empty() {
            warn!("bill document is empty after normalization");
            return BillParameters::empty();
        }

        let mut params = rule_based_extraction(&text);
        params.bill_text_sample = text_sample(&text);
        info!(
            confidence = params.confidence_score,
            "rule-based extraction complete"
        );

        if params.confidence_score >= opts.confidence_threshold || !opts.use_fallback {
            return params;
        }
        let Some(client) = &self.fallback else {
            info!("confidence below threshold but no fallback client configured");
            return params;
        };

        match llm_fallback_extraction(client.as_ref(), &text) {
            Ok(fallback) => merge_parameters(&params, &fallback),
            Err(e) => {
                // Keep the rule-based result untouched, method included.
                warn!(error = %e, "generative fallback failed, keeping rule-based result");
                params
            }
        }
    }
}

fn text_sample(text: &str) -> String {
    match text.char_indices().nth(config::TEXT_SAMPLE_CHARS) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
