use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::config::RecommendedYears;
use crate::error::{FieldIssue, ValidationFailure};
use crate::solar::assumptions::{CapitalStack, DebtTerms, ProjectAssumptions};
use crate::solar::fields::FieldMap;

/// Largest accepted distance of the capital-stack sum from 1.0.
pub const CAPITAL_STACK_TOLERANCE: Decimal = dec!(0.005);

/// Longest analysis period accepted. Anything beyond the recommended range but
/// within this ceiling is only an advisory.
pub const MAX_ANALYSIS_YEARS: u32 = 100;

/// A value that is accepted but outside the recommended range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationWarning {
    pub field: String,
    pub message: String,
}

/// Inputs that passed every check, ready for projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedInputs {
    pub assumptions: ProjectAssumptions,
    pub capital_stack: CapitalStack,
    pub debt_terms: DebtTerms,
    pub warnings: Vec<ConfigurationWarning>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Valid(ValidatedInputs),
    Invalid(ValidationFailure),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid(_))
    }

    pub fn into_result(self) -> Result<ValidatedInputs, ValidationFailure> {
        match self {
            ValidationOutcome::Valid(inputs) => Ok(inputs),
            ValidationOutcome::Invalid(failure) => Err(failure),
        }
    }
}

/// Check typed inputs against the default recommended analysis range.
pub fn validate(
    assumptions: &ProjectAssumptions,
    capital_stack: &CapitalStack,
    debt_terms: &DebtTerms,
) -> ValidationOutcome {
    validate_with(assumptions, capital_stack, debt_terms, &RecommendedYears::default())
}

pub fn validate_with(
    assumptions: &ProjectAssumptions,
    capital_stack: &CapitalStack,
    debt_terms: &DebtTerms,
    recommended: &RecommendedYears,
) -> ValidationOutcome {
    Draft::from_typed(assumptions, capital_stack, debt_terms).finish(Vec::new(), recommended)
}

/// Convert raw field text and check it, reporting every missing, malformed
/// and out-of-range field together.
pub fn validate_fields(fields: &FieldMap) -> ValidationOutcome {
    validate_fields_with(fields, &RecommendedYears::default())
}

pub fn validate_fields_with(fields: &FieldMap, recommended: &RecommendedYears) -> ValidationOutcome {
    let mut reader = FieldReader {
        fields,
        issues: Vec::new(),
    };
    let draft = Draft {
        project_name: reader.text("project_name"),
        project_size_mw: reader.number("project_size_mw"),
        capex_per_watt: reader.number("capex_per_watt"),
        capacity_factor: reader.number("capacity_factor"),
        ppa_price_per_mwh: reader.number("ppa_price_per_mwh"),
        opex_per_kw_year: reader.number("opex_per_kw_year"),
        annual_degradation_pct: reader.number("annual_degradation_pct"),
        merchant_tail_price_per_mwh: reader.number("merchant_tail_price_per_mwh"),
        merchant_tail_start_year: reader.whole("merchant_tail_start_year"),
        analysis_years: reader.whole("analysis_years"),
        discount_rate: reader.number("discount_rate"),
        debt_pct: reader.number("debt_pct"),
        tax_equity_pct: reader.number("tax_equity_pct"),
        sponsor_equity_pct: reader.number("sponsor_equity_pct"),
        debt_rate: reader.number("debt_rate"),
        debt_tenor_years: reader.whole("debt_tenor_years"),
    };
    draft.finish(reader.issues, recommended)
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

struct FieldReader<'a> {
    fields: &'a FieldMap,
    issues: Vec<FieldIssue>,
}

impl<'a> FieldReader<'a> {
    fn raw(&mut self, name: &str) -> Option<&'a str> {
        let fields: &'a FieldMap = self.fields;
        match fields.get(name).map(|v| v.trim()) {
            Some(v) if !v.is_empty() => Some(v),
            _ => {
                self.issues.push(FieldIssue::new(name, "missing required field"));
                None
            }
        }
    }

    fn text(&mut self, name: &str) -> Option<String> {
        self.raw(name).map(str::to_string)
    }

    fn number(&mut self, name: &str) -> Option<Decimal> {
        let raw = self.raw(name)?;
        match parse_decimal(raw) {
            Some(value) => Some(value),
            None => {
                self.issues
                    .push(FieldIssue::new(name, format!("expected a number, got `{raw}`")));
                None
            }
        }
    }

    fn whole(&mut self, name: &str) -> Option<u32> {
        let raw = self.raw(name)?;
        let parsed = parse_decimal(raw)
            .filter(|v| v.fract().is_zero())
            .and_then(|v| v.to_u32());
        if parsed.is_none() {
            self.issues.push(FieldIssue::new(
                name,
                format!("expected a non-negative whole number, got `{raw}`"),
            ));
        }
        parsed
    }
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

// ---------------------------------------------------------------------------
// Checks
// ---------------------------------------------------------------------------

/// Every field optional, so the same checks run on partially converted input.
#[derive(Debug, Default)]
struct Draft {
    project_name: Option<String>,
    project_size_mw: Option<Decimal>,
    capex_per_watt: Option<Decimal>,
    capacity_factor: Option<Decimal>,
    ppa_price_per_mwh: Option<Decimal>,
    opex_per_kw_year: Option<Decimal>,
    annual_degradation_pct: Option<Decimal>,
    merchant_tail_price_per_mwh: Option<Decimal>,
    merchant_tail_start_year: Option<u32>,
    analysis_years: Option<u32>,
    discount_rate: Option<Decimal>,
    debt_pct: Option<Decimal>,
    tax_equity_pct: Option<Decimal>,
    sponsor_equity_pct: Option<Decimal>,
    debt_rate: Option<Decimal>,
    debt_tenor_years: Option<u32>,
}

impl Draft {
    fn from_typed(a: &ProjectAssumptions, c: &CapitalStack, d: &DebtTerms) -> Self {
        Self {
            project_name: Some(a.project_name.clone()),
            project_size_mw: Some(a.project_size_mw),
            capex_per_watt: Some(a.capex_per_watt),
            capacity_factor: Some(a.capacity_factor),
            ppa_price_per_mwh: Some(a.ppa_price_per_mwh),
            opex_per_kw_year: Some(a.opex_per_kw_year),
            annual_degradation_pct: Some(a.annual_degradation_pct),
            merchant_tail_price_per_mwh: Some(a.merchant_tail_price_per_mwh),
            merchant_tail_start_year: Some(a.merchant_tail_start_year),
            analysis_years: Some(a.analysis_years),
            discount_rate: Some(a.discount_rate),
            debt_pct: Some(c.debt_pct),
            tax_equity_pct: Some(c.tax_equity_pct),
            sponsor_equity_pct: Some(c.sponsor_equity_pct),
            debt_rate: Some(d.debt_rate),
            debt_tenor_years: Some(d.debt_tenor_years),
        }
    }

    fn finish(self, mut issues: Vec<FieldIssue>, recommended: &RecommendedYears) -> ValidationOutcome {
        self.check(&mut issues);
        if !issues.is_empty() {
            return ValidationOutcome::Invalid(ValidationFailure { issues });
        }

        let warnings = self.advisories(recommended);
        match self.into_inputs(warnings) {
            Some(inputs) => ValidationOutcome::Valid(inputs),
            // Unreachable when no issue was recorded; reported rather than assumed.
            None => ValidationOutcome::Invalid(ValidationFailure {
                issues: vec![FieldIssue::new("input", "incomplete input")],
            }),
        }
    }

    fn check(&self, issues: &mut Vec<FieldIssue>) {
        if let Some(name) = &self.project_name {
            if name.trim().is_empty() {
                issues.push(FieldIssue::new("project_name", "must not be empty"));
            }
        }

        positive("project_size_mw", self.project_size_mw, issues);
        positive("capex_per_watt", self.capex_per_watt, issues);

        if let Some(cf) = self.capacity_factor {
            if cf <= Decimal::ZERO || cf > Decimal::ONE {
                issues.push(FieldIssue::new(
                    "capacity_factor",
                    format!("must be in (0, 1], got {cf}"),
                ));
            }
        }

        non_negative("ppa_price_per_mwh", self.ppa_price_per_mwh, issues);
        non_negative("opex_per_kw_year", self.opex_per_kw_year, issues);

        if let Some(d) = self.annual_degradation_pct {
            if d < Decimal::ZERO || d >= Decimal::ONE {
                issues.push(FieldIssue::new(
                    "annual_degradation_pct",
                    format!("must be in [0, 1), got {d}"),
                ));
            }
        }

        non_negative("merchant_tail_price_per_mwh", self.merchant_tail_price_per_mwh, issues);

        if let Some(start) = self.merchant_tail_start_year {
            if start < 1 {
                issues.push(FieldIssue::new("merchant_tail_start_year", "must be at least 1"));
            } else if let Some(years) = self.analysis_years {
                if start > years {
                    issues.push(FieldIssue::new(
                        "merchant_tail_start_year",
                        format!("must not exceed analysis_years ({years}), got {start}"),
                    ));
                }
            }
        }

        match self.analysis_years {
            Some(0) => issues.push(FieldIssue::new("analysis_years", "must be at least 1")),
            Some(years) if years > MAX_ANALYSIS_YEARS => issues.push(FieldIssue::new(
                "analysis_years",
                format!("must not exceed {MAX_ANALYSIS_YEARS}, got {years}"),
            )),
            _ => {}
        }

        positive("discount_rate", self.discount_rate, issues);

        unit_interval("debt_pct", self.debt_pct, issues);
        unit_interval("tax_equity_pct", self.tax_equity_pct, issues);
        unit_interval("sponsor_equity_pct", self.sponsor_equity_pct, issues);

        if let (Some(debt), Some(te), Some(sponsor)) =
            (self.debt_pct, self.tax_equity_pct, self.sponsor_equity_pct)
        {
            let total = debt + te + sponsor;
            if (total - Decimal::ONE).abs() > CAPITAL_STACK_TOLERANCE {
                issues.push(FieldIssue::new(
                    "capital_stack",
                    format!(
                        "debt_pct + tax_equity_pct + sponsor_equity_pct must sum to 1.0 \
                         (±{CAPITAL_STACK_TOLERANCE}), found {total}"
                    ),
                ));
            }
        }

        non_negative("debt_rate", self.debt_rate, issues);

        if let Some(tenor) = self.debt_tenor_years {
            if tenor < 1 {
                issues.push(FieldIssue::new("debt_tenor_years", "must be at least 1"));
            } else if let Some(years) = self.analysis_years {
                if tenor > years {
                    issues.push(FieldIssue::new(
                        "debt_tenor_years",
                        format!("must not exceed analysis_years ({years}), got {tenor}"),
                    ));
                }
            }
        }
    }

    fn advisories(&self, recommended: &RecommendedYears) -> Vec<ConfigurationWarning> {
        let mut warnings = Vec::new();
        if let Some(years) = self.analysis_years {
            if !recommended.contains(years) {
                warnings.push(ConfigurationWarning {
                    field: "analysis_years".into(),
                    message: format!(
                        "Analysis period of {years} years is outside the typical {}-{} year range",
                        recommended.min, recommended.max
                    ),
                });
            }
        }
        warnings
    }

    fn into_inputs(self, warnings: Vec<ConfigurationWarning>) -> Option<ValidatedInputs> {
        Some(ValidatedInputs {
            assumptions: ProjectAssumptions {
                project_name: self.project_name?,
                project_size_mw: self.project_size_mw?,
                capex_per_watt: self.capex_per_watt?,
                capacity_factor: self.capacity_factor?,
                ppa_price_per_mwh: self.ppa_price_per_mwh?,
                opex_per_kw_year: self.opex_per_kw_year?,
                annual_degradation_pct: self.annual_degradation_pct?,
                merchant_tail_price_per_mwh: self.merchant_tail_price_per_mwh?,
                merchant_tail_start_year: self.merchant_tail_start_year?,
                analysis_years: self.analysis_years?,
                discount_rate: self.discount_rate?,
            },
            capital_stack: CapitalStack {
                debt_pct: self.debt_pct?,
                tax_equity_pct: self.tax_equity_pct?,
                sponsor_equity_pct: self.sponsor_equity_pct?,
            },
            debt_terms: DebtTerms {
                debt_rate: self.debt_rate?,
                debt_tenor_years: self.debt_tenor_years?,
            },
            warnings,
        })
    }
}

fn positive(field: &str, value: Option<Decimal>, issues: &mut Vec<FieldIssue>) {
    if let Some(v) = value {
        if v <= Decimal::ZERO {
            issues.push(FieldIssue::new(field, format!("must be positive, got {v}")));
        }
    }
}

fn non_negative(field: &str, value: Option<Decimal>, issues: &mut Vec<FieldIssue>) {
    if let Some(v) = value {
        if v < Decimal::ZERO {
            issues.push(FieldIssue::new(field, format!("must not be negative, got {v}")));
        }
    }
}

fn unit_interval(field: &str, value: Option<Decimal>, issues: &mut Vec<FieldIssue>) {
    if let Some(v) = value {
        if v < Decimal::ZERO || v > Decimal::ONE {
            issues.push(FieldIssue::new(field, format!("must be in [0, 1], got {v}")));
        }
    }
}
