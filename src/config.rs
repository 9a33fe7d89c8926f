use std::path::{Path, PathBuf};

/// Application-level constants
pub const APP_NAME: &str = "billscope";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Rule-based confidence below this triggers the generative fallback.
pub const CONFIDENCE_THRESHOLD: f64 = 60.0;

/// Confidence assigned after a successful fallback merge.
pub const FALLBACK_CONFIDENCE: f64 = 85.0;

/// Upper bound on the excerpt sent to the fallback adapter.
pub const FALLBACK_EXCERPT_CHARS: usize = 2000;

/// Length of the text sample carried on `BillParameters` for summaries.
pub const TEXT_SAMPLE_CHARS: usize = 500;

/// Hourly wage used for `hours_to_cover_gap` when the bill sets none.
pub const DEFAULT_HOURLY_WAGE: f64 = 15.0;

/// Floor for the wage divisor, guarding against non-positive wages.
pub const MIN_WAGE_DIVISOR: f64 = 1.0;

/// Size of the most-affected list in the impact summary.
pub const TOP_AFFECTED_COUNT: usize = 10;

/// Default log filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> String {
    format!("{APP_NAME}=info")
}

/// Documented defaults for roster fields the source table may lack.
pub mod defaults {
    pub const ENROLLMENT: f64 = 5000.0;
    pub const PCT_LOW_INCOME: f64 = 30.0;
    pub const PCT_MINORITY: f64 = 25.0;
    /// Used only when neither `baseline_tuition` nor `net_price` exists.
    pub const BASELINE_TUITION: f64 = 0.0;
    /// Used only when neither `baseline_grad_rate` nor `grad_rate` exists.
    pub const BASELINE_GRAD_RATE: f64 = 0.0;
}

/// On-disk layout of the trained artifact directory.
///
/// The training collaborator writes these files; the pipeline only reads.
pub mod artifacts {
    use super::*;

    pub fn scaler_path(dir: &Path) -> PathBuf {
        dir.join("scaler.json")
    }

    pub fn encoders_path(dir: &Path) -> PathBuf {
        dir.join("encoders.json")
    }

    pub fn model_path(dir: &Path, target: &str) -> PathBuf {
        dir.join(format!("{target}_model.json"))
    }

    pub fn equity_labels_path(dir: &Path) -> PathBuf {
        dir.join("equity_labels.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_paths_live_under_dir() {
        let dir = Path::new("/tmp/artifacts");
        assert!(artifacts::scaler_path(dir).starts_with(dir));
        assert_eq!(
            artifacts::model_path(dir, "tuition").file_name().unwrap(),
            "tuition_model.json"
        );
    }

    #[test]
    fn threshold_gates_below_fallback_confidence() {
        assert!(CONFIDENCE_THRESHOLD < FALLBACK_CONFIDENCE);
    }
}
