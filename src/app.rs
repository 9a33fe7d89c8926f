//! Command dispatch and run output.

use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::cli::{Cli, Command, ExtractArgs, ExtractionArgs, RunArgs};
use crate::models::{BillParameters, ImpactSummary, InstitutionImpact};
use crate::pipeline::extraction::fallback::{AnthropicClient, LlmClient};
use crate::pipeline::extraction::orchestrator::{BillExtractor, ExtractOptions};
use crate::pipeline::prediction::orchestrator::{predict_bill_impact, PredictOptions};
use crate::pipeline::prediction::PredictionError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Prediction(#[from] PredictionError),

    #[error("JSON output error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV output error: {0}")]
    Csv(#[from] csv::Error),
}

pub fn run(cli: Cli) -> Result<(), AppError> {
    match cli.command {
        Command::Extract(args) => run_extract(args),
        Command::Run(args) => run_full(args),
    }
}

fn fallback_client(args: &ExtractionArgs) -> Option<AnthropicClient> {
    if args.no_fallback {
        return None;
    }
    let client = AnthropicClient::from_env();
    if client.is_none() {
        info!("no API credential configured, running without generative fallback");
    }
    client
}

fn extract_options(args: &ExtractionArgs) -> ExtractOptions {
    ExtractOptions {
        confidence_threshold: args.threshold,
        use_fallback: !args.no_fallback,
    }
}

fn run_extract(args: ExtractArgs) -> Result<(), AppError> {
    let extractor = BillExtractor::new(
        fallback_client(&args.extraction).map(|c| Box::new(c) as Box<dyn LlmClient>),
    );
    let params = extractor.process_bill(&args.bill, &extract_options(&args.extraction));
    println!("{}", serde_json::to_string_pretty(&params)?);
    Ok(())
}

fn run_full(args: RunArgs) -> Result<(), AppError> {
    // One client serves both the extraction fallback and the summary text.
    let summary_client = fallback_client(&args.extraction);
    let extractor = BillExtractor::new(
        fallback_client(&args.extraction).map(|c| Box::new(c) as Box<dyn LlmClient>),
    );
    let params = extractor.process_bill(&args.bill, &extract_options(&args.extraction));
    info!(
        confidence = params.confidence_score,
        method = ?params.extraction_method,
        "bill parameters extracted"
    );

    let opts = PredictOptions {
        affected_states: args.states,
    };
    let (impacts, summary) = predict_bill_impact(
        &args.roster,
        &args.artifacts,
        &params,
        &opts,
        summary_client.as_ref().map(|c| c as &dyn LlmClient),
    )?;

    match &args.output_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            write_impacts_csv(&dir.join("impacts.csv"), &impacts)?;
            write_summary_json(&dir.join("summary.json"), &params, &summary)?;
            info!(dir = %dir.display(), "wrote run outputs");
        }
        None => println!("{}", serde_json::to_string_pretty(&summary)?),
    }
    Ok(())
}

fn write_impacts_csv(path: &Path, impacts: &[InstitutionImpact]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "institution_id",
        "name",
        "institution_type",
        "state",
        "enrollment",
        "tuition_change_pct",
        "tuition_change_dollars",
        "enrollment_change_pct",
        "grad_rate_change",
        "equity_risk",
        "students_affected",
        "hours_to_cover_gap",
    ])?;
    let opt = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();
    for impact in impacts {
        writer.write_record([
            impact.institution_id.clone(),
            impact.name.clone(),
            impact
                .institution_type
                .map(|t| t.as_str().to_string())
                .unwrap_or_default(),
            impact.state.clone().unwrap_or_default(),
            impact.enrollment.to_string(),
            opt(impact.tuition_change_pct),
            opt(impact.tuition_change_dollars),
            opt(impact.enrollment_change_pct),
            opt(impact.grad_rate_change),
            impact
                .equity_risk
                .map(|r| r.as_str().to_string())
                .unwrap_or_default(),
            opt(impact.students_affected),
            opt(impact.hours_to_cover_gap),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_summary_json(
    path: &Path,
    params: &BillParameters,
    summary: &ImpactSummary,
) -> Result<(), AppError> {
    let payload = serde_json::json!({
        "bill_parameters": params,
        "impact_summary": summary,
    });
    fs::write(path, serde_json::to_string_pretty(&payload)?)?;
    Ok(())
}
