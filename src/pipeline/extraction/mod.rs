pub mod document;
pub mod fallback;
pub mod merge;
pub mod normalize;
pub mod orchestrator;
pub mod patterns;
pub mod rules;

pub use document::*;
pub use fallback::*;
pub use merge::*;
pub use normalize::*;
pub use orchestrator::*;
pub use patterns::*;
pub use rules::*;

use thiserror::Error;

/// Failures while turning a document file into text.
///
/// These never abort a run: the orchestrator converts them into the
/// all-null, confidence-0 parameter set.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),
}

/// Failures of the generative fallback boundary.
///
/// All of these are non-fatal by contract: the rule-based result is kept
/// unchanged whenever the fallback cannot produce a clean parameter set.
#[derive(Error, Debug)]
pub enum FallbackError {
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("API returned error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Malformed fallback response: {0}")]
    MalformedResponse(String),

    #[error("JSON parsing error: {0}")]
    JsonParsing(String),
}
