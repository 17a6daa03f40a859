//! Tunable settings for the returns calculator.
//!
//! Every field has a default, so an empty YAML/JSON document is a valid
//! configuration.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::SolarFinanceError;
use crate::types::{Money, Rate};
use crate::SolarFinanceResult;

/// Search window and stopping rule for the IRR root-finder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IrrSettings {
    /// Lowest rate searched (must be > -1)
    pub lower_bound: Rate,
    /// Highest rate searched
    pub upper_bound: Rate,
    /// Accept a rate once |NPV| falls below this many currency units
    pub tolerance: Money,
    /// Bisection steps before giving up
    pub max_iterations: u32,
}

impl Default for IrrSettings {
    fn default() -> Self {
        Self {
            lower_bound: dec!(-0.99),
            upper_bound: dec!(10.0),
            tolerance: dec!(0.000001),
            max_iterations: 200,
        }
    }
}

/// One-at-a-time perturbations applied after the base run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensitivitySettings {
    /// Absolute shift applied to the discount rate (0.01 = one point)
    pub discount_rate_delta: Rate,
    /// Relative shift applied to the PPA price (0.10 = ±10%)
    pub ppa_price_shift: Rate,
    /// Relative shift applied to CAPEX per watt
    pub capex_shift: Rate,
}

impl Default for SensitivitySettings {
    fn default() -> Self {
        Self {
            discount_rate_delta: dec!(0.01),
            ppa_price_shift: dec!(0.10),
            capex_shift: dec!(0.10),
        }
    }
}

/// Inclusive range of analysis periods that run without an advisory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendedYears {
    pub min: u32,
    pub max: u32,
}

impl Default for RecommendedYears {
    fn default() -> Self {
        Self { min: 15, max: 25 }
    }
}

impl RecommendedYears {
    pub fn contains(&self, years: u32) -> bool {
        (self.min..=self.max).contains(&years)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub irr: IrrSettings,
    pub sensitivity: SensitivitySettings,
    pub recommended_analysis_years: RecommendedYears,
}

impl ModelConfig {
    /// Reject settings the calculator cannot honour.
    pub fn check(&self) -> SolarFinanceResult<()> {
        let irr = &self.irr;
        if irr.lower_bound <= dec!(-1) {
            return Err(SolarFinanceError::InvalidInput {
                field: "irr.lower_bound".into(),
                reason: "Lower bound must be greater than -100%".into(),
            });
        }
        if irr.upper_bound <= irr.lower_bound {
            return Err(SolarFinanceError::InvalidInput {
                field: "irr.upper_bound".into(),
                reason: "Upper bound must exceed the lower bound".into(),
            });
        }
        if irr.tolerance <= Decimal::ZERO {
            return Err(SolarFinanceError::InvalidInput {
                field: "irr.tolerance".into(),
                reason: "Tolerance must be positive".into(),
            });
        }
        if irr.max_iterations == 0 {
            return Err(SolarFinanceError::InvalidInput {
                field: "irr.max_iterations".into(),
                reason: "At least one iteration is required".into(),
            });
        }

        let sens = &self.sensitivity;
        for (field, value) in [
            ("sensitivity.discount_rate_delta", sens.discount_rate_delta),
            ("sensitivity.ppa_price_shift", sens.ppa_price_shift),
            ("sensitivity.capex_shift", sens.capex_shift),
        ] {
            if value < Decimal::ZERO {
                return Err(SolarFinanceError::InvalidInput {
                    field: field.into(),
                    reason: "Shift must be non-negative".into(),
                });
            }
        }
        // Discount rates are validated positive, so this keeps rate - delta above -100%.
        if sens.discount_rate_delta >= Decimal::ONE {
            return Err(SolarFinanceError::InvalidInput {
                field: "sensitivity.discount_rate_delta".into(),
                reason: "Delta must be below 100% so the lower rate stays above -100%".into(),
            });
        }
        if sens.capex_shift >= Decimal::ONE {
            return Err(SolarFinanceError::InvalidInput {
                field: "sensitivity.capex_shift".into(),
                reason: "A 100% downward CAPEX shift leaves nothing to finance".into(),
            });
        }

        if self.recommended_analysis_years.min > self.recommended_analysis_years.max {
            return Err(SolarFinanceError::InvalidInput {
                field: "recommended_analysis_years".into(),
                reason: "min must be <= max".into(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_pass_check() {
        assert!(ModelConfig::default().check().is_ok());
    }

    #[test]
    fn test_empty_document_yields_defaults() {
        let config: ModelConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ModelConfig::default());
    }

    #[test]
    fn test_partial_override_keeps_other_defaults() {
        let config: ModelConfig =
            serde_json::from_str(r#"{"irr": {"max_iterations": 50}}"#).unwrap();
        assert_eq!(config.irr.max_iterations, 50);
        assert_eq!(config.irr.upper_bound, dec!(10.0));
        assert_eq!(config.sensitivity, SensitivitySettings::default());
    }

    #[test]
    fn test_lower_bound_at_minus_one_rejected() {
        let mut config = ModelConfig::default();
        config.irr.lower_bound = dec!(-1);
        match config.check().unwrap_err() {
            SolarFinanceError::InvalidInput { field, .. } => assert_eq!(field, "irr.lower_bound"),
            other => panic!("Expected InvalidInput, got: {other:?}"),
        }
    }

    #[test]
    fn test_discount_rate_delta_of_one_or_more_rejected() {
        for delta in [dec!(1), dec!(1.5)] {
            let mut config = ModelConfig::default();
            config.sensitivity.discount_rate_delta = delta;
            match config.check().unwrap_err() {
                SolarFinanceError::InvalidInput { field, .. } => {
                    assert_eq!(field, "sensitivity.discount_rate_delta")
                }
                other => panic!("Expected InvalidInput, got: {other:?}"),
            }
        }
    }

    #[test]
    fn test_discount_rate_delta_just_below_one_accepted() {
        let mut config = ModelConfig::default();
        config.sensitivity.discount_rate_delta = dec!(0.99);
        assert!(config.check().is_ok());
    }

    #[test]
    fn test_recommended_years_range() {
        let years = RecommendedYears::default();
        assert!(years.contains(15));
        assert!(years.contains(25));
        assert!(!years.contains(14));
        assert!(!years.contains(26));
    }
}
