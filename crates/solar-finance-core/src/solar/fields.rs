//! Loosely-typed input: field name to raw text.
//!
//! Prompts, messages and JSON documents all land here before a single
//! conversion into the typed input objects.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::SolarFinanceError;
use crate::SolarFinanceResult;

/// Raw field values keyed by field name. Unknown keys are kept.
pub type FieldMap = BTreeMap<String, String>;

/// Which input object a field belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldGroup {
    Assumptions,
    CapitalStack,
    DebtTerms,
}

/// Fields of `ProjectAssumptions`, in declaration order.
pub const ASSUMPTION_FIELDS: [&str; 11] = [
    "project_name",
    "project_size_mw",
    "capex_per_watt",
    "capacity_factor",
    "ppa_price_per_mwh",
    "opex_per_kw_year",
    "annual_degradation_pct",
    "merchant_tail_price_per_mwh",
    "merchant_tail_start_year",
    "analysis_years",
    "discount_rate",
];

pub const CAPITAL_STACK_FIELDS: [&str; 3] = ["debt_pct", "tax_equity_pct", "sponsor_equity_pct"];

pub const DEBT_TERM_FIELDS: [&str; 2] = ["debt_rate", "debt_tenor_years"];

/// Every required field, grouped.
pub fn required_fields() -> impl Iterator<Item = (FieldGroup, &'static str)> {
    ASSUMPTION_FIELDS
        .iter()
        .map(|f| (FieldGroup::Assumptions, *f))
        .chain(CAPITAL_STACK_FIELDS.iter().map(|f| (FieldGroup::CapitalStack, *f)))
        .chain(DEBT_TERM_FIELDS.iter().map(|f| (FieldGroup::DebtTerms, *f)))
}

pub fn group_of(field: &str) -> Option<FieldGroup> {
    required_fields().find(|(_, f)| *f == field).map(|(g, _)| g)
}

/// Flatten a JSON document into a [`FieldMap`].
///
/// Accepts either a flat object of fields or the nested
/// `{assumptions, capital_stack, debt_terms}` layout. Strings and numbers are
/// kept as text; nulls are dropped so they read as missing.
pub fn field_map_from_json(value: &Value) -> SolarFinanceResult<FieldMap> {
    let object = value.as_object().ok_or_else(|| SolarFinanceError::InvalidInput {
        field: "input".into(),
        reason: "Expected a JSON object of model fields".into(),
    })?;

    let mut fields = FieldMap::new();
    for (key, val) in object {
        match val {
            Value::Object(_) if matches!(key.as_str(), "assumptions" | "capital_stack" | "debt_terms") => {
                fields.extend(field_map_from_json(val)?);
            }
            Value::Null => {}
            Value::String(s) => {
                fields.insert(key.clone(), s.clone());
            }
            Value::Number(n) => {
                fields.insert(key.clone(), n.to_string());
            }
            Value::Bool(b) => {
                fields.insert(key.clone(), b.to_string());
            }
            other => {
                fields.insert(key.clone(), other.to_string());
            }
        }
    }
    Ok(fields)
}
