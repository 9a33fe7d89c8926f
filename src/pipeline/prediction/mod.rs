pub mod artifacts;
pub mod features;
pub mod metrics;
pub mod orchestrator;
pub mod roster;
pub mod runner;
pub mod summary;

pub use artifacts::*;
pub use features::*;
pub use metrics::*;
pub use orchestrator::*;
pub use roster::*;
pub use runner::*;
pub use summary::*;

use std::path::PathBuf;

use thiserror::Error;

/// Failures of the prediction pipeline.
///
/// Unlike extraction, these are fatal: predictions over a half-read roster
/// or a misaligned feature matrix would be silently wrong.
#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Roster error: {0}")]
    Roster(String),

    #[error("Artifact {path} unusable: {reason}")]
    Artifact { path: PathBuf, reason: String },

    #[error("Feature parity violation: {0}")]
    FeatureParity(String),
}
