//! Tabular rendering of a model run: the `Assumptions`, `Cash Flow` and
//! `IRR_NPV` tabs. Every cell is text; money has two decimals.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::solar::model::FinancialModelResult;
use crate::solar::returns::{SensitivityParameter, Shift};
use crate::time_value::IrrOutcome;

pub const ASSUMPTIONS_TAB: &str = "Assumptions";
pub const CASH_FLOW_TAB: &str = "Cash Flow";
pub const RETURNS_TAB: &str = "IRR_NPV";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worksheet {
    pub title: String,
    /// First row is the header
    pub rows: Vec<Vec<String>>,
}

impl Worksheet {
    fn new(title: &str, header: &[&str]) -> Self {
        Self {
            title: title.to_string(),
            rows: vec![header.iter().map(|h| h.to_string()).collect()],
        }
    }

    fn push<I, S>(&mut self, row: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(row.into_iter().map(Into::into).collect());
    }

    pub fn header(&self) -> &[String] {
        self.rows.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Rows after the header.
    pub fn body(&self) -> &[Vec<String>] {
        self.rows.get(1..).unwrap_or(&[])
    }

    /// First row whose leading cell equals `label`.
    pub fn find_row(&self, label: &str) -> Option<&[String]> {
        self.rows
            .iter()
            .find(|r| r.first().is_some_and(|c| c == label))
            .map(Vec::as_slice)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workbook {
    pub title: String,
    pub prepared_on: NaiveDate,
    pub sheets: Vec<Worksheet>,
}

impl Workbook {
    pub fn sheet(&self, title: &str) -> Option<&Worksheet> {
        self.sheets.iter().find(|s| s.title == title)
    }
}

/// Lay out a finished run as three worksheets.
pub fn build_workbook(title: &str, prepared_on: NaiveDate, result: &FinancialModelResult) -> Workbook {
    Workbook {
        title: title.to_string(),
        prepared_on,
        sheets: vec![
            assumptions_sheet(prepared_on, result),
            cash_flow_sheet(result),
            returns_sheet(result),
        ],
    }
}

fn money(value: Decimal) -> String {
    format!("{value:.2}")
}

fn plain(value: Decimal) -> String {
    value.normalize().to_string()
}

fn irr_cell(irr: &IrrOutcome) -> String {
    match irr.rate() {
        Some(rate) => plain(rate.round_dp(6)),
        None => irr.describe(),
    }
}

fn assumptions_sheet(prepared_on: NaiveDate, result: &FinancialModelResult) -> Worksheet {
    let a = &result.assumptions;
    let c = &result.capital_stack;
    let d = &result.debt_terms;

    let mut sheet = Worksheet::new(ASSUMPTIONS_TAB, &["Assumption", "Value", "Notes"]);
    let rows = [
        ("Project Name", a.project_name.clone(), ""),
        ("Project Size (MW)", plain(a.project_size_mw), "Core production lever"),
        ("CAPEX ($/W)", plain(a.capex_per_watt), "Affects upfront investment"),
        ("Capacity Factor", plain(a.capacity_factor), "Drives annual generation"),
        ("PPA Price ($/MWh)", plain(a.ppa_price_per_mwh), "Primary contracted revenue lever"),
        ("OPEX ($/kW-year)", plain(a.opex_per_kw_year), "Operating expense lever"),
        ("Annual Degradation", plain(a.annual_degradation_pct), "Generation declines over time"),
        (
            "Merchant Tail Start Year",
            a.merchant_tail_start_year.to_string(),
            "Switch from PPA to merchant pricing",
        ),
        (
            "Merchant Tail Price ($/MWh)",
            plain(a.merchant_tail_price_per_mwh),
            "Uncontracted revenue assumption",
        ),
        ("Analysis Period (years)", a.analysis_years.to_string(), ""),
        ("Discount Rate", plain(a.discount_rate), "Used in NPV"),
        ("Debt %", plain(c.debt_pct), "Capital stack lever"),
        ("Tax Equity %", plain(c.tax_equity_pct), "Capital stack lever"),
        ("Sponsor Equity %", plain(c.sponsor_equity_pct), "Capital stack lever"),
        ("Debt Rate", plain(d.debt_rate), ""),
        ("Debt Tenor (years)", d.debt_tenor_years.to_string(), ""),
        ("Prepared On", prepared_on.format("%Y-%m-%d").to_string(), ""),
    ];
    for (label, value, note) in rows {
        sheet.push([label.to_string(), value, note.to_string()]);
    }
    sheet
}

fn cash_flow_sheet(result: &FinancialModelResult) -> Worksheet {
    let mut sheet = Worksheet::new(
        CASH_FLOW_TAB,
        &[
            "Year",
            "Generation MWh",
            "Energy Price",
            "Revenue",
            "OPEX",
            "Debt Service",
            "Levered Cash Flow",
        ],
    );
    for row in &result.cash_flow_schedule {
        sheet.push([
            row.year.to_string(),
            money(row.generation_mwh),
            money(row.energy_price_per_mwh),
            money(row.revenue),
            money(row.opex),
            money(row.debt_service),
            money(row.levered_cash_flow),
        ]);
    }
    sheet
}

fn returns_sheet(result: &FinancialModelResult) -> Worksheet {
    let mut sheet = Worksheet::new(RETURNS_TAB, &["Metric", "Value"]);
    sheet.push(["Sponsor IRR".to_string(), irr_cell(&result.irr)]);
    sheet.push(["Sponsor NPV".to_string(), money(result.npv)]);
    sheet.push(["CAPEX".to_string(), money(result.capex)]);
    sheet.push(["Debt Principal".to_string(), money(result.debt_principal)]);
    sheet.push(["Annual Debt Service".to_string(), money(result.annual_debt_service)]);
    sheet.push(["Sponsor Equity".to_string(), money(result.sponsor_equity_investment)]);
    sheet.push(Vec::<String>::new());
    sheet.push(["Sensitivity", "Downside", "Base", "Upside"]);

    let parameters = [
        (SensitivityParameter::DiscountRate, "Discount Rate"),
        (SensitivityParameter::PpaPrice, "PPA Price"),
        (SensitivityParameter::Capex, "CAPEX"),
    ];

    for (parameter, name) in parameters {
        let down = result.sensitivity(parameter, Shift::Down);
        let up = result.sensitivity(parameter, Shift::Up);
        sheet.push([
            format!("{name} NPV"),
            down.map(|c| money(c.npv)).unwrap_or_default(),
            money(result.npv),
            up.map(|c| money(c.npv)).unwrap_or_default(),
        ]);
    }

    // The discount rate does not move the IRR, so only the input axes get a row.
    for (parameter, name) in &parameters[1..] {
        let down = result.sensitivity(*parameter, Shift::Down);
        let up = result.sensitivity(*parameter, Shift::Up);
        sheet.push([
            format!("{name} IRR"),
            down.map(|c| irr_cell(&c.irr)).unwrap_or_default(),
            irr_cell(&result.irr),
            up.map(|c| irr_cell(&c.irr)).unwrap_or_default(),
        ]);
    }
    sheet
}
