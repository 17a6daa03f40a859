use clap::Args;
use serde_json::{json, Value};

use solar_finance_core::solar::model::model_from_fields;
use solar_finance_core::solar::validation::{validate_fields_with, ValidationOutcome};
use solar_finance_core::ModelConfig;

use super::{into_cli_error, issue_report, SourceArgs};

/// Arguments for the model and validate commands
#[derive(Args)]
pub struct ModelArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

pub fn run_model(args: ModelArgs, config: &ModelConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let fields = args.source.load_fields()?;
    let output = model_from_fields(&fields, config).map_err(into_cli_error)?;
    Ok(serde_json::to_value(output)?)
}

pub fn run_validate(args: ModelArgs, config: &ModelConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let fields = args.source.load_fields()?;
    match validate_fields_with(&fields, &config.recommended_analysis_years) {
        ValidationOutcome::Valid(inputs) => Ok(json!({
            "status": "valid",
            "project_name": inputs.assumptions.project_name,
            "warnings": inputs.warnings,
        })),
        ValidationOutcome::Invalid(failure) => Err(issue_report(&failure)),
    }
}
