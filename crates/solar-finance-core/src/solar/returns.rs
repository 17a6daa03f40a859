use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::error::checked;
use crate::solar::assumptions::{CapitalStack, CashFlowYear, DebtTerms, ProjectAssumptions};
use crate::solar::projection::project;
use crate::time_value::{self, IrrOutcome};
use crate::types::{Money, Rate};
use crate::SolarFinanceResult;

/// Input perturbed by a sensitivity case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityParameter {
    DiscountRate,
    PpaPrice,
    Capex,
}

impl SensitivityParameter {
    /// Name of the input field the case perturbs.
    pub fn field_name(&self) -> &'static str {
        match self {
            SensitivityParameter::DiscountRate => "discount_rate",
            SensitivityParameter::PpaPrice => "ppa_price_per_mwh",
            SensitivityParameter::Capex => "capex_per_watt",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shift {
    Down,
    Up,
}

/// One rerun with a single input moved away from its base value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityCase {
    pub parameter: SensitivityParameter,
    pub shift: Shift,
    /// The perturbed input value
    pub value: Decimal,
    pub npv: Money,
    pub irr: IrrOutcome,
}

impl SensitivityCase {
    /// e.g. `discount_rate=0.07`
    pub fn label(&self) -> String {
        format!("{}={}", self.parameter.field_name(), self.value.normalize())
    }
}

/// Returns on the sponsor's equity for one projected schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnsSummary {
    pub sponsor_equity_investment: Money,
    /// Index 0 is the equity outflow, index n the year-n levered cash flow
    pub equity_cash_flows: Vec<Money>,
    pub irr: IrrOutcome,
    pub npv: Money,
    /// Discount-rate cases, keyed by label
    pub sensitivities: BTreeMap<String, SensitivityCase>,
}

/// Sponsor cash-flow vector: the equity cheque at t=0, then every year's
/// levered cash flow. The sponsor receives all post-debt-service cash.
pub fn equity_cash_flows(sponsor_equity_investment: Money, schedule: &[CashFlowYear]) -> Vec<Money> {
    std::iter::once(-sponsor_equity_investment)
        .chain(schedule.iter().map(|row| row.levered_cash_flow))
        .collect()
}

/// IRR, NPV and discount-rate sensitivities for a projected schedule.
pub fn compute_returns(
    capex: Money,
    capital_stack: &CapitalStack,
    schedule: &[CashFlowYear],
    discount_rate: Rate,
    config: &ModelConfig,
) -> SolarFinanceResult<ReturnsSummary> {
    let sponsor_equity_investment = capex * capital_stack.sponsor_equity_pct;
    let flows = equity_cash_flows(sponsor_equity_investment, schedule);

    let irr = time_value::irr(&flows, &config.irr)?;
    let npv = time_value::npv(discount_rate, &flows)?;

    let delta = config.sensitivity.discount_rate_delta;
    let mut sensitivities = BTreeMap::new();
    let up = checked(discount_rate.checked_add(delta), "discount-rate sensitivity")?;
    for (shift, rate) in [(Shift::Down, discount_rate - delta), (Shift::Up, up)] {
        let case = SensitivityCase {
            parameter: SensitivityParameter::DiscountRate,
            shift,
            value: rate,
            npv: time_value::npv(rate, &flows)?,
            irr: irr.clone(),
        };
        sensitivities.insert(case.label(), case);
    }

    Ok(ReturnsSummary {
        sponsor_equity_investment,
        equity_cash_flows: flows,
        irr,
        npv,
        sensitivities,
    })
}

/// PPA price and CAPEX cases. Each one reruns the projector on a perturbed
/// copy of the assumptions; the originals are never touched.
pub fn input_sensitivities(
    assumptions: &ProjectAssumptions,
    capital_stack: &CapitalStack,
    debt_terms: &DebtTerms,
    config: &ModelConfig,
) -> SolarFinanceResult<Vec<SensitivityCase>> {
    let settings = &config.sensitivity;
    let mut cases = Vec::with_capacity(4);

    for (shift, factor) in [
        (Shift::Down, Decimal::ONE - settings.ppa_price_shift),
        (Shift::Up, Decimal::ONE + settings.ppa_price_shift),
    ] {
        let mut shifted = assumptions.clone();
        shifted.ppa_price_per_mwh = checked(
            assumptions.ppa_price_per_mwh.checked_mul(factor),
            "PPA price sensitivity",
        )?;
        cases.push(rerun(
            SensitivityParameter::PpaPrice,
            shift,
            shifted.ppa_price_per_mwh,
            &shifted,
            capital_stack,
            debt_terms,
            config,
        )?);
    }

    for (shift, factor) in [
        (Shift::Down, Decimal::ONE - settings.capex_shift),
        (Shift::Up, Decimal::ONE + settings.capex_shift),
    ] {
        let mut shifted = assumptions.clone();
        shifted.capex_per_watt = checked(
            assumptions.capex_per_watt.checked_mul(factor),
            "CAPEX sensitivity",
        )?;
        cases.push(rerun(
            SensitivityParameter::Capex,
            shift,
            shifted.capex_per_watt,
            &shifted,
            capital_stack,
            debt_terms,
            config,
        )?);
    }

    Ok(cases)
}

fn rerun(
    parameter: SensitivityParameter,
    shift: Shift,
    value: Decimal,
    assumptions: &ProjectAssumptions,
    capital_stack: &CapitalStack,
    debt_terms: &DebtTerms,
    config: &ModelConfig,
) -> SolarFinanceResult<SensitivityCase> {
    let projection = project(assumptions, capital_stack, debt_terms)?;
    let sponsor = projection.capex * capital_stack.sponsor_equity_pct;
    let flows = equity_cash_flows(sponsor, &projection.schedule);

    Ok(SensitivityCase {
        parameter,
        shift,
        value,
        npv: time_value::npv(assumptions.discount_rate, &flows)?,
        irr: time_value::irr(&flows, &config.irr)?,
    })
}
