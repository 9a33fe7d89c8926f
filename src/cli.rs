//! Command-line interface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config;

#[derive(Parser, Debug)]
#[command(name = config::APP_NAME, version, about = "Bill impact estimation for college rosters")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract structured policy parameters from a bill document
    Extract(ExtractArgs),
    /// Run extraction and impact prediction end to end
    Run(RunArgs),
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Bill document, PDF or plain text
    #[arg(long)]
    pub bill: PathBuf,

    #[command(flatten)]
    pub extraction: ExtractionArgs,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Bill document, PDF or plain text
    #[arg(long)]
    pub bill: PathBuf,

    /// College roster CSV
    #[arg(long)]
    pub roster: PathBuf,

    /// Directory holding the trained model artifacts
    #[arg(long)]
    pub artifacts: PathBuf,

    /// Restrict the run to these states (repeatable)
    #[arg(long = "state", value_name = "STATE")]
    pub states: Vec<String>,

    /// Write impacts.csv and summary.json here instead of stdout
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    #[command(flatten)]
    pub extraction: ExtractionArgs,
}

/// Flags shared by every command that runs extraction.
#[derive(Args, Debug)]
pub struct ExtractionArgs {
    /// Disable the generative fallback, rule-based extraction only
    #[arg(long)]
    pub no_fallback: bool,

    /// Confidence below this escalates to the fallback
    #[arg(long, default_value_t = config::CONFIDENCE_THRESHOLD)]
    pub threshold: f64,
}
