use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{checked, SolarFinanceError};
use crate::solar::assumptions::{CapitalStack, CashFlowYear, DebtTerms, ProjectAssumptions};
use crate::solar::validation::MAX_ANALYSIS_YEARS;
use crate::time_value::levelized_payment;
use crate::types::{MegawattHours, Money, HOURS_PER_YEAR};
use crate::SolarFinanceResult;

const WATTS_PER_MW: Decimal = dec!(1_000_000);
const KW_PER_MW: Decimal = dec!(1_000);

/// Output of the projector: the up-front cost and the annual schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub capex: Money,
    pub debt_principal: Money,
    pub annual_debt_service: Money,
    pub schedule: Vec<CashFlowYear>,
}

/// Total installed cost: MW × 1,000,000 W/MW × cost per watt.
pub fn total_capex(assumptions: &ProjectAssumptions) -> SolarFinanceResult<Money> {
    let capex = assumptions
        .project_size_mw
        .checked_mul(WATTS_PER_MW)
        .and_then(|w| w.checked_mul(assumptions.capex_per_watt));
    checked(capex, "total CAPEX")
}

/// Undegraded annual energy: MW × capacity factor × 8,760 h.
pub fn first_year_generation(assumptions: &ProjectAssumptions) -> SolarFinanceResult<MegawattHours> {
    let generation = (assumptions.project_size_mw * assumptions.capacity_factor)
        .checked_mul(Decimal::from(HOURS_PER_YEAR));
    checked(generation, "first-year generation")
}

/// Energy price for a 1-based year. The merchant tail starts exactly at
/// `merchant_tail_start_year`; there is no blending.
pub fn energy_price(assumptions: &ProjectAssumptions, year: u32) -> Money {
    if year < assumptions.merchant_tail_start_year {
        assumptions.ppa_price_per_mwh
    } else {
        assumptions.merchant_tail_price_per_mwh
    }
}

/// Flat annual O&M: MW × 1,000 kW/MW × cost per kW-year.
pub fn annual_opex(assumptions: &ProjectAssumptions) -> SolarFinanceResult<Money> {
    let opex = assumptions
        .project_size_mw
        .checked_mul(KW_PER_MW)
        .and_then(|kw| kw.checked_mul(assumptions.opex_per_kw_year));
    checked(opex, "annual O&M")
}

/// Project the levered cash-flow schedule from validated inputs.
///
/// Pure: the same inputs always give the same schedule, one row per year
/// `1..=analysis_years`. Inputs too large for Decimal arithmetic give
/// [`SolarFinanceError::Overflow`] rather than a panic.
pub fn project(
    assumptions: &ProjectAssumptions,
    capital_stack: &CapitalStack,
    debt_terms: &DebtTerms,
) -> SolarFinanceResult<Projection> {
    if assumptions.analysis_years > MAX_ANALYSIS_YEARS {
        return Err(SolarFinanceError::InvalidInput {
            field: "analysis_years".into(),
            reason: format!("must not exceed {MAX_ANALYSIS_YEARS}, got {}", assumptions.analysis_years),
        });
    }

    let capex = total_capex(assumptions)?;
    let debt_principal = capex * capital_stack.debt_pct;
    let annual_debt_service =
        levelized_payment(debt_principal, debt_terms.debt_rate, debt_terms.debt_tenor_years)?;

    let base_generation = first_year_generation(assumptions)?;
    let retention = Decimal::ONE - assumptions.annual_degradation_pct;
    let opex = annual_opex(assumptions)?;

    let mut schedule = Vec::with_capacity(assumptions.analysis_years as usize);
    let mut generation = base_generation;

    for year in 1..=assumptions.analysis_years {
        if year > 1 {
            generation *= retention;
        }

        let price = energy_price(assumptions, year);
        let revenue = checked(generation.checked_mul(price), "annual revenue")?;
        let debt_service = if year <= debt_terms.debt_tenor_years {
            annual_debt_service
        } else {
            Decimal::ZERO
        };

        schedule.push(CashFlowYear {
            year,
            generation_mwh: generation,
            energy_price_per_mwh: price,
            revenue,
            opex,
            debt_service,
            levered_cash_flow: checked(
                revenue.checked_sub(opex).and_then(|v| v.checked_sub(debt_service)),
                "levered cash flow",
            )?,
        });
    }

    Ok(Projection {
        capex,
        debt_principal,
        annual_debt_service,
        schedule,
    })
}
