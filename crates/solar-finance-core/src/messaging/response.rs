use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ModelConfig;
use crate::error::{FieldIssue, SolarFinanceError};
use crate::messaging::parser::{find_missing_fields, parse_structured_message, MissingFields};
use crate::solar::fields::FieldMap;
use crate::solar::model::{run_model_from_fields, FinancialModelResult};
use crate::time_value::IrrOutcome;
use crate::types::Money;

const NEEDS_INPUT_MESSAGE: &str = "I need more details before building the model.";
const NEEDS_FIX_MESSAGE: &str = "Some values need fixing before I can build the model.";

/// Where a message came from and where the reply goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Sms,
    Whatsapp,
    Email,
    Cli,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Sms => "sms",
            Channel::Whatsapp => "whatsapp",
            Channel::Email => "email",
            Channel::Cli => "cli",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = SolarFinanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sms" => Ok(Channel::Sms),
            "whatsapp" => Ok(Channel::Whatsapp),
            "email" => Ok(Channel::Email),
            "cli" => Ok(Channel::Cli),
            other => Err(SolarFinanceError::InvalidInput {
                field: "channel".into(),
                reason: format!("unknown channel '{other}', expected sms, whatsapp, email or cli"),
            }),
        }
    }
}

/// Title used for the workbook when the message does not set `sheet_title`.
pub fn default_sheet_title(channel: Channel) -> String {
    format!("Solar Model ({channel})")
}

/// Reply to an inbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ModelResponse {
    /// The model did not run; every issue is listed.
    NeedsInput {
        channel: Channel,
        message: String,
        missing: MissingFields,
        issues: Vec<FieldIssue>,
    },
    Ok {
        channel: Channel,
        project_name: String,
        sheet_title: String,
        capex: Money,
        sponsor_equity_investment: Money,
        irr: IrrOutcome,
        npv: Money,
        /// Location of the written workbook, when one was produced
        workbook: Option<String>,
        warnings: Vec<String>,
        summary: String,
    },
    /// Anything other than bad input, e.g. an unusable configuration.
    Error { channel: Channel, message: String },
}

impl ModelResponse {
    pub fn channel(&self) -> Channel {
        match self {
            ModelResponse::NeedsInput { channel, .. }
            | ModelResponse::Ok { channel, .. }
            | ModelResponse::Error { channel, .. } => *channel,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ModelResponse::Ok { .. })
    }

    /// Attach the workbook location to a successful reply.
    pub fn with_workbook(mut self, location: impl Into<String>) -> Self {
        if let ModelResponse::Ok { workbook, .. } = &mut self {
            *workbook = Some(location.into());
        }
        self
    }

    /// Plain-text body suitable for an SMS or email reply.
    pub fn reply_text(&self) -> String {
        match self {
            ModelResponse::NeedsInput {
                message,
                missing,
                issues,
                ..
            } => {
                let mut lines = vec![message.clone()];
                for (label, names) in [
                    ("Missing assumptions", &missing.assumptions),
                    ("Missing capital stack", &missing.capital_stack),
                    ("Missing debt terms", &missing.debt_terms),
                ] {
                    if !names.is_empty() {
                        lines.push(format!("{label}: {}", names.join(", ")));
                    }
                }
                for issue in issues.iter().filter(|i| !missing.all().any(|m| m == i.field)) {
                    lines.push(format!("Fix {issue}"));
                }
                lines.join("\n")
            }
            ModelResponse::Ok {
                summary,
                workbook,
                warnings,
                ..
            } => {
                let mut lines = vec![summary.clone()];
                if let Some(location) = workbook {
                    lines.push(format!("Workbook: {location}"));
                }
                lines.extend(warnings.iter().map(|w| format!("Note: {w}")));
                lines.join("\n")
            }
            ModelResponse::Error { message, .. } => format!("Could not build the model: {message}"),
        }
    }
}

/// Build the success reply for a completed run.
pub fn format_success(channel: Channel, sheet_title: &str, result: &FinancialModelResult) -> ModelResponse {
    let summary = format!(
        "{} model ready. Sponsor IRR: {}. NPV at {}%: {}.",
        result.assumptions.project_name,
        result.irr.describe(),
        result.assumptions.discount_rate.saturating_mul(Money::ONE_HUNDRED).normalize(),
        result.npv.round_dp(2)
    );
    ModelResponse::Ok {
        channel,
        project_name: result.assumptions.project_name.clone(),
        sheet_title: sheet_title.to_string(),
        capex: result.capex,
        sponsor_equity_investment: result.sponsor_equity_investment,
        irr: result.irr.clone(),
        npv: result.npv,
        workbook: None,
        warnings: result.warnings.iter().map(|w| w.message.clone()).collect(),
        summary,
    }
}

/// Build the reply for a run that stopped before producing a result.
pub fn format_failure(channel: Channel, fields: &FieldMap, error: &SolarFinanceError) -> ModelResponse {
    match error.validation_failure() {
        Some(failure) => {
            let missing = find_missing_fields(fields);
            let message = if missing.is_empty() {
                NEEDS_FIX_MESSAGE
            } else {
                NEEDS_INPUT_MESSAGE
            };
            ModelResponse::NeedsInput {
                channel,
                message: message.to_string(),
                missing,
                issues: failure.issues.clone(),
            }
        }
        None => ModelResponse::Error {
            channel,
            message: error.to_string(),
        },
    }
}

/// Parse a message body, run the model and format the reply. Never fails;
/// problems come back as `NeedsInput` or `Error`.
pub fn handle_message(channel: Channel, body: &str, config: &ModelConfig) -> ModelResponse {
    let fields = parse_structured_message(body);
    debug!(%channel, fields = fields.len(), "message parsed");

    let sheet_title = fields
        .get("sheet_title")
        .filter(|t| !t.trim().is_empty())
        .cloned()
        .unwrap_or_else(|| default_sheet_title(channel));

    match run_model_from_fields(&fields, config) {
        Ok(result) => format_success(channel, &sheet_title, &result),
        Err(error) => {
            if error.validation_failure().is_none() {
                warn!(%channel, "model run failed: {error}");
            }
            format_failure(channel, &fields, &error)
        }
    }
}
