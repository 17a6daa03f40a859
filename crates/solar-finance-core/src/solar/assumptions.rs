use serde::{Deserialize, Serialize};

use crate::types::{MegawattHours, Megawatts, Money, Rate};

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Physical and commercial assumptions for a single solar project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectAssumptions {
    /// Project name / identifier
    pub project_name: String,
    /// Nameplate capacity (MW)
    pub project_size_mw: Megawatts,
    /// Installed cost per watt
    pub capex_per_watt: Money,
    /// Net capacity factor, in (0, 1]
    pub capacity_factor: Rate,
    /// Contracted energy price while the PPA runs
    pub ppa_price_per_mwh: Money,
    /// Fixed O&M cost per kW of capacity per year
    pub opex_per_kw_year: Money,
    /// Annual loss of output, in [0, 1)
    pub annual_degradation_pct: Rate,
    /// Open-market price once the PPA has ended
    pub merchant_tail_price_per_mwh: Money,
    /// First year (1-based) sold at the merchant price
    pub merchant_tail_start_year: u32,
    /// Number of projected operating years
    pub analysis_years: u32,
    /// Discount rate used for NPV
    pub discount_rate: Rate,
}

/// Share of project cost raised from each financing source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalStack {
    pub debt_pct: Rate,
    pub tax_equity_pct: Rate,
    pub sponsor_equity_pct: Rate,
}

/// Amortizing term loan terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtTerms {
    pub debt_rate: Rate,
    pub debt_tenor_years: u32,
}

/// The three input objects the engine runs on, as one serializable document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolarProjectInput {
    pub assumptions: ProjectAssumptions,
    pub capital_stack: CapitalStack,
    pub debt_terms: DebtTerms,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// One projected operating year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowYear {
    /// Year number (1-based)
    pub year: u32,
    pub generation_mwh: MegawattHours,
    /// PPA price before the merchant tail, merchant price from it onwards
    pub energy_price_per_mwh: Money,
    pub revenue: Money,
    pub opex: Money,
    /// Levelized payment while the loan is outstanding, zero afterwards
    pub debt_service: Money,
    /// revenue - opex - debt_service
    pub levered_cash_flow: Money,
}
