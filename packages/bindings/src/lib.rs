use napi::Result as NapiResult;
use napi_derive::napi;
use serde_json::{json, Value};

use solar_finance_core::messaging::{self, find_missing_fields, parse_structured_message, Channel};
use solar_finance_core::solar::fields::{field_map_from_json, FieldMap};
use solar_finance_core::solar::model::model_from_fields;
use solar_finance_core::solar::validation::{validate_fields_with, ValidationOutcome};
use solar_finance_core::ModelConfig;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn read_fields(input_json: &str) -> NapiResult<FieldMap> {
    let value: Value = serde_json::from_str(input_json).map_err(to_napi_error)?;
    field_map_from_json(&value).map_err(to_napi_error)
}

fn read_config(config_json: Option<String>) -> NapiResult<ModelConfig> {
    let config: ModelConfig = match config_json {
        Some(raw) => serde_json::from_str(&raw).map_err(to_napi_error)?,
        None => ModelConfig::default(),
    };
    config.check().map_err(to_napi_error)?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

#[napi]
pub fn run_solar_model(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let fields = read_fields(&input_json)?;
    let config = read_config(config_json)?;
    let output = model_from_fields(&fields, &config).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn validate_inputs(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let fields = read_fields(&input_json)?;
    let config = read_config(config_json)?;
    let report = match validate_fields_with(&fields, &config.recommended_analysis_years) {
        ValidationOutcome::Valid(inputs) => json!({
            "status": "valid",
            "warnings": inputs.warnings,
        }),
        ValidationOutcome::Invalid(failure) => json!({
            "status": "invalid",
            "issues": failure.issues,
        }),
    };
    serde_json::to_string(&report).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Messaging
// ---------------------------------------------------------------------------

#[napi]
pub fn parse_message(body: String) -> NapiResult<String> {
    let fields = parse_structured_message(&body);
    let missing = find_missing_fields(&fields);
    serde_json::to_string(&json!({
        "fields": fields,
        "missing": missing,
    }))
    .map_err(to_napi_error)
}

#[napi]
pub fn handle_message(channel: String, body: String, config_json: Option<String>) -> NapiResult<String> {
    let channel: Channel = channel.parse().map_err(to_napi_error)?;
    let config = read_config(config_json)?;
    let response = messaging::handle_message(channel, &body, &config);
    serde_json::to_string(&response).map_err(to_napi_error)
}
