use std::collections::BTreeMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ModelConfig;
use crate::solar::assumptions::{
    CapitalStack, CashFlowYear, DebtTerms, ProjectAssumptions, SolarProjectInput,
};
use crate::solar::fields::FieldMap;
use crate::solar::projection::project;
use crate::solar::returns::{
    compute_returns, input_sensitivities, SensitivityCase, SensitivityParameter, Shift,
};
use crate::solar::validation::{
    validate_fields_with, validate_with, ConfigurationWarning, ValidatedInputs,
};
use crate::time_value::IrrOutcome;
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::SolarFinanceResult;

const METHODOLOGY: &str = "Solar Project Levered Cash Flow Model (levelized debt, sponsor IRR/NPV)";

/// Complete model output. Deterministic for identical inputs and owned
/// entirely by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialModelResult {
    pub assumptions: ProjectAssumptions,
    pub capital_stack: CapitalStack,
    pub debt_terms: DebtTerms,
    /// Total installed cost
    pub capex: Money,
    /// Loan amount, capex × debt_pct
    pub debt_principal: Money,
    /// capex × tax_equity_pct (receives no cash flow in this model)
    pub tax_equity_amount: Money,
    /// capex × sponsor_equity_pct, the t=0 outflow
    pub sponsor_equity_investment: Money,
    /// Level payment for years 1..=debt_tenor_years
    pub annual_debt_service: Money,
    pub cash_flow_schedule: Vec<CashFlowYear>,
    /// Vector the IRR and NPV are computed on
    pub equity_cash_flows: Vec<Money>,
    pub irr: IrrOutcome,
    /// NPV at the assumed discount rate
    pub npv: Money,
    /// Every sensitivity case keyed by label, e.g. `ppa_price_per_mwh=54.9`
    pub sensitivities: BTreeMap<String, SensitivityCase>,
    /// Accepted values outside recommended ranges
    pub warnings: Vec<ConfigurationWarning>,
}

impl FinancialModelResult {
    /// Scenario label to NPV.
    pub fn npv_by_scenario(&self) -> BTreeMap<String, Money> {
        self.sensitivities
            .iter()
            .map(|(label, case)| (label.clone(), case.npv))
            .collect()
    }

    pub fn sensitivity(&self, parameter: SensitivityParameter, shift: Shift) -> Option<&SensitivityCase> {
        self.sensitivities
            .values()
            .find(|c| c.parameter == parameter && c.shift == shift)
    }
}

/// Validate, project and compute returns with the default configuration.
///
/// Invalid input comes back as [`crate::SolarFinanceError::Validation`]; the
/// projector and calculator are not run in that case.
pub fn run_model(
    assumptions: &ProjectAssumptions,
    capital_stack: &CapitalStack,
    debt_terms: &DebtTerms,
) -> SolarFinanceResult<FinancialModelResult> {
    run_model_with_config(assumptions, capital_stack, debt_terms, &ModelConfig::default())
}

pub fn run_model_with_config(
    assumptions: &ProjectAssumptions,
    capital_stack: &CapitalStack,
    debt_terms: &DebtTerms,
    config: &ModelConfig,
) -> SolarFinanceResult<FinancialModelResult> {
    config.check()?;
    debug!(project = %assumptions.project_name, "validating inputs");
    let inputs = validate_with(
        assumptions,
        capital_stack,
        debt_terms,
        &config.recommended_analysis_years,
    )
    .into_result()
    .inspect_err(|failure| warn!(issues = failure.issues.len(), "validation failed: {failure}"))?;
    build(inputs, config)
}

/// Same as [`run_model_with_config`], starting from raw field text.
pub fn run_model_from_fields(
    fields: &FieldMap,
    config: &ModelConfig,
) -> SolarFinanceResult<FinancialModelResult> {
    config.check()?;
    debug!(fields = fields.len(), "validating field map");
    let inputs = validate_fields_with(fields, &config.recommended_analysis_years)
        .into_result()
        .inspect_err(|failure| warn!(issues = failure.issues.len(), "validation failed: {failure}"))?;
    build(inputs, config)
}

fn build(inputs: ValidatedInputs, config: &ModelConfig) -> SolarFinanceResult<FinancialModelResult> {
    let ValidatedInputs {
        assumptions,
        capital_stack,
        debt_terms,
        warnings,
    } = inputs;

    for w in &warnings {
        warn!(field = %w.field, "{}", w.message);
    }

    debug!(years = assumptions.analysis_years, "projecting cash flows");
    let projection = project(&assumptions, &capital_stack, &debt_terms)?;

    debug!("computing returns");
    let returns = compute_returns(
        projection.capex,
        &capital_stack,
        &projection.schedule,
        assumptions.discount_rate,
        config,
    )?;

    let mut sensitivities = returns.sensitivities;
    for case in input_sensitivities(&assumptions, &capital_stack, &debt_terms, config)? {
        sensitivities.insert(case.label(), case);
    }

    if !returns.irr.is_converged() {
        warn!(project = %assumptions.project_name, "equity IRR: {}", returns.irr.describe());
    }
    info!(
        project = %assumptions.project_name,
        capex = %projection.capex,
        npv = %returns.npv.round_dp(2),
        irr = %returns.irr.describe(),
        "model complete"
    );

    Ok(FinancialModelResult {
        tax_equity_amount: projection.capex * capital_stack.tax_equity_pct,
        capex: projection.capex,
        debt_principal: projection.debt_principal,
        sponsor_equity_investment: returns.sponsor_equity_investment,
        annual_debt_service: projection.annual_debt_service,
        cash_flow_schedule: projection.schedule,
        equity_cash_flows: returns.equity_cash_flows,
        irr: returns.irr,
        npv: returns.npv,
        sensitivities,
        warnings,
        assumptions,
        capital_stack,
        debt_terms,
    })
}

/// Run the model and wrap it in the standard computation envelope.
pub fn model_solar_project(
    input: &SolarProjectInput,
    config: &ModelConfig,
) -> SolarFinanceResult<ComputationOutput<FinancialModelResult>> {
    let start = Instant::now();
    let result = run_model_with_config(
        &input.assumptions,
        &input.capital_stack,
        &input.debt_terms,
        config,
    )?;
    Ok(envelope(result, start))
}

/// Envelope variant of [`run_model_from_fields`].
pub fn model_from_fields(
    fields: &FieldMap,
    config: &ModelConfig,
) -> SolarFinanceResult<ComputationOutput<FinancialModelResult>> {
    let start = Instant::now();
    let result = run_model_from_fields(fields, config)?;
    Ok(envelope(result, start))
}

fn envelope(result: FinancialModelResult, start: Instant) -> ComputationOutput<FinancialModelResult> {
    let mut warnings: Vec<String> = result.warnings.iter().map(|w| w.message.clone()).collect();
    if !result.irr.is_converged() {
        warnings.push(format!("Equity IRR unavailable: {}", result.irr.describe()));
    }
    if result.npv.is_sign_negative() {
        warnings.push(format!(
            "NPV of {} is negative at the {} discount rate",
            result.npv.round_dp(2),
            result.assumptions.discount_rate
        ));
    }

    let a = &result.assumptions;
    let assumptions = serde_json::json!({
        "project_name": a.project_name,
        "project_size_mw": a.project_size_mw.to_string(),
        "capex_per_watt": a.capex_per_watt.to_string(),
        "analysis_years": a.analysis_years,
        "merchant_tail_start_year": a.merchant_tail_start_year,
        "discount_rate": a.discount_rate.to_string(),
        "debt_pct": result.capital_stack.debt_pct.to_string(),
        "sponsor_equity_pct": result.capital_stack.sponsor_equity_pct.to_string(),
        "debt_rate": result.debt_terms.debt_rate.to_string(),
        "debt_tenor_years": result.debt_terms.debt_tenor_years,
    });

    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(METHODOLOGY, &assumptions, warnings, elapsed, result)
}
