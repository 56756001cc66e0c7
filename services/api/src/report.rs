use crate::infra::build_orchestrator;
use clap::Args;
use recovery_engine::config::AppConfig;
use recovery_engine::engine::{BatchOutcome, ErrorPolicy};
use recovery_engine::error::AppError;
use recovery_engine::ingest::parse_batch;
use std::fs::File;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct AnalyzeArgs {
    /// CSV file of overdue accounts to score
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Abort the whole batch at the first bad row instead of skipping it
    #[arg(long)]
    pub(crate) abort_on_error: bool,
    /// Emit the full result set as JSON instead of the console summary
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_analyze(args: AnalyzeArgs) -> Result<(), AppError> {
    let AnalyzeArgs {
        csv,
        abort_on_error,
        json,
    } = args;

    let mut config = AppConfig::load()?;
    if abort_on_error {
        config.engine.error_policy = ErrorPolicy::AbortOnError;
    }

    let orchestrator = build_orchestrator(config.engine).map_err(AppError::Model)?;
    let file = File::open(csv)?;
    let rows = parse_batch(file)?;
    let outcome = orchestrator.submit(rows)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).map_err(|err| {
                AppError::Io(std::io::Error::new(std::io::ErrorKind::Other, err))
            })?
        );
        return Ok(());
    }

    render_outcome(&outcome);
    Ok(())
}

fn render_outcome(outcome: &BatchOutcome) {
    println!("Recovery analysis");
    println!(
        "- {} accounts scored | {} row(s) failed",
        outcome.total_accounts,
        outcome.errors.len()
    );
    println!(
        "- risk mix: {} low / {} medium / {} high",
        outcome.summary.low_risk, outcome.summary.medium_risk, outcome.summary.high_risk
    );

    for prediction in &outcome.predictions {
        println!(
            "  - {} ({}): p={:.4} | {} risk | {} days | {} ({})",
            prediction.account_id,
            prediction.company_name,
            prediction.recovery_probability,
            prediction.risk_level,
            prediction.expected_days,
            prediction.recommended_dca.name,
            prediction.recommended_dca.specialization
        );
        if let Some(factor) = prediction.top_factors.first() {
            println!(
                "    top driver: {} ({:.4}, {:?})",
                factor.label, factor.impact, factor.direction
            );
        }
    }

    for error in &outcome.errors {
        println!("  ! row {}: {}", error.row, error.reason);
    }
}
