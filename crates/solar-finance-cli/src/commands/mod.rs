pub mod message;
pub mod model;
pub mod prompt;
pub mod workbook;

use clap::Args;
use serde_json::Value;
use solar_finance_core::messaging::parse_structured_message;
use solar_finance_core::solar::fields::{field_map_from_json, FieldMap};
use solar_finance_core::{SolarFinanceError, ValidationFailure};

use crate::input;

/// Where model fields come from. Without a flag, piped stdin is read as JSON
/// when it starts with `{` and as a key=value message otherwise.
#[derive(Args)]
pub struct SourceArgs {
    /// Path to a JSON input file (flat fields or assumptions/capital_stack/debt_terms)
    #[arg(long, conflicts_with = "message")]
    pub input: Option<String>,

    /// Path to a key=value message file
    #[arg(long)]
    pub message: Option<String>,
}

impl SourceArgs {
    pub fn load_fields(&self) -> Result<FieldMap, Box<dyn std::error::Error>> {
        if let Some(ref path) = self.input {
            let value = input::file::read_json_value(path)?;
            return Ok(field_map_from_json(&value)?);
        }
        if let Some(ref path) = self.message {
            let body = input::file::read_text(path)?;
            return Ok(parse_structured_message(&body));
        }
        match input::stdin::read_stdin()? {
            Some(text) => fields_from_text(&text),
            None => Err("--input <file.json>, --message <file.txt> or stdin required".into()),
        }
    }
}

pub fn fields_from_text(text: &str) -> Result<FieldMap, Box<dyn std::error::Error>> {
    if text.trim_start().starts_with('{') {
        let value: Value = serde_json::from_str(text)?;
        Ok(field_map_from_json(&value)?)
    } else {
        Ok(parse_structured_message(text))
    }
}

/// One line per rejected field.
pub fn issue_report(failure: &ValidationFailure) -> Box<dyn std::error::Error> {
    let mut lines = vec![format!("{} input issue(s)", failure.issues.len())];
    lines.extend(failure.issues.iter().map(|issue| format!("  - {issue}")));
    lines.join("\n").into()
}

pub fn into_cli_error(err: SolarFinanceError) -> Box<dyn std::error::Error> {
    match err {
        SolarFinanceError::Validation(failure) => issue_report(&failure),
        other => other.into(),
    }
}

pub fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}
