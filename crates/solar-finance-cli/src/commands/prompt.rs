use clap::Args;
use colored::Colorize;
use serde_json::Value;
use std::io::{self, BufRead, Write};
use std::path::Path;

use solar_finance_core::solar::fields::{FieldMap, CAPITAL_STACK_FIELDS};
use solar_finance_core::solar::model::model_from_fields;
use solar_finance_core::solar::validation::{validate_fields_with, ValidationOutcome};
use solar_finance_core::workbook::build_workbook;
use solar_finance_core::{ModelConfig, ValidationFailure};

use super::workbook::write_workbook;
use super::{into_cli_error, today};

struct PromptField {
    key: &'static str,
    question: &'static str,
    default: Option<&'static str>,
}

const fn field(key: &'static str, question: &'static str, default: Option<&'static str>) -> PromptField {
    PromptField {
        key,
        question,
        default,
    }
}

static ASSUMPTION_PROMPTS: [PromptField; 11] = [
    field("project_name", "Project name", Some("Solar Project")),
    field("project_size_mw", "Project size (MW)", None),
    field("capex_per_watt", "CAPEX ($/W)", None),
    field("capacity_factor", "Capacity factor (0-1)", None),
    field("ppa_price_per_mwh", "PPA price ($/MWh)", None),
    field("opex_per_kw_year", "OPEX ($/kW-year)", None),
    field("annual_degradation_pct", "Annual degradation (0-1)", Some("0.005")),
    field("merchant_tail_start_year", "Merchant tail start year", Some("16")),
    field("merchant_tail_price_per_mwh", "Merchant tail price ($/MWh)", Some("40")),
    field("analysis_years", "Analysis period (15-25 years recommended)", Some("20")),
    field("discount_rate", "Discount rate (0-1)", Some("0.08")),
];

static CAPITAL_PROMPTS: [PromptField; 5] = [
    field("debt_pct", "Debt % of capital stack (0-1)", Some("0.6")),
    field("tax_equity_pct", "Tax equity % of capital stack (0-1)", Some("0.2")),
    field("sponsor_equity_pct", "Sponsor equity % of capital stack (0-1)", Some("0.2")),
    field("debt_rate", "Debt interest rate (0-1)", Some("0.06")),
    field("debt_tenor_years", "Debt tenor (years)", Some("15")),
];

/// Arguments for the interactive prompt
#[derive(Args)]
pub struct PromptArgs {
    /// Also write the workbook tabs as CSV files into this directory
    #[arg(long)]
    pub workbook_dir: Option<String>,

    /// Title for the workbook
    #[arg(long, default_value = "Solar Financial Model")]
    pub sheet_title: String,
}

/// Prompts go to stderr so stdout carries only the model output.
pub fn run_prompt(args: PromptArgs, config: &ModelConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let stdin = io::stdin();
    let mut answers = stdin.lock().lines();
    let mut fields = FieldMap::new();

    eprintln!("\nSolar Finance Agent: let's gather project details for the model.");
    for (title, prompts) in [
        ("Project Assumptions", &ASSUMPTION_PROMPTS[..]),
        ("Capital Stack", &CAPITAL_PROMPTS[..]),
    ] {
        eprintln!("\n{}", title.bold());
        eprintln!("{}", "-".repeat(title.len()));
        for prompt in prompts {
            ask(&mut answers, prompt, &mut fields)?;
        }
    }

    loop {
        eprintln!("\nReviewing inputs for likely gaps/flags...");
        match validate_fields_with(&fields, &config.recommended_analysis_years) {
            ValidationOutcome::Valid(inputs) => {
                if inputs.warnings.is_empty() {
                    eprintln!("No obvious gaps found. Proceeding with model build.");
                } else {
                    eprintln!("{}", "Potential issues identified:".yellow());
                    for w in &inputs.warnings {
                        eprintln!(" - {}", w.message);
                    }
                }
                break;
            }
            ValidationOutcome::Invalid(failure) => {
                eprintln!("{}", "These inputs need another look:".red());
                for issue in &failure.issues {
                    eprintln!(" - {issue}");
                }
                for prompt in reask(&failure) {
                    ask(&mut answers, prompt, &mut fields)?;
                }
            }
        }
    }

    let output = model_from_fields(&fields, config).map_err(into_cli_error)?;

    if let Some(ref dir) = args.workbook_dir {
        let workbook = build_workbook(&args.sheet_title, today(), &output.result);
        write_workbook(Path::new(dir), &workbook)?;
        eprintln!("\nModel build complete. Workbook written to {dir}");
    }

    Ok(serde_json::to_value(output)?)
}

fn ask<B: BufRead>(
    answers: &mut io::Lines<B>,
    prompt: &PromptField,
    fields: &mut FieldMap,
) -> Result<(), Box<dyn std::error::Error>> {
    let suffix = prompt.default.map(|d| format!(" [{d}]")).unwrap_or_default();
    eprint!("{}{}: ", prompt.question, suffix);
    io::stderr().flush()?;

    let line = answers
        .next()
        .ok_or("input closed before every field was answered")??;
    let answer = line.trim();
    let value = match (answer.is_empty(), prompt.default) {
        (true, Some(default)) => default,
        _ => answer,
    };
    fields.insert(prompt.key.to_string(), value.to_string());
    Ok(())
}

/// Prompts to repeat for a failed review, in form order. A capital-stack
/// issue re-asks all three percentages.
fn reask(failure: &ValidationFailure) -> Vec<&'static PromptField> {
    ASSUMPTION_PROMPTS
        .iter()
        .chain(CAPITAL_PROMPTS.iter())
        .filter(|p| {
            failure.mentions(p.key)
                || (failure.mentions("capital_stack") && CAPITAL_STACK_FIELDS.contains(&p.key))
        })
        .collect()
}
