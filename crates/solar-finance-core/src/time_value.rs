use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::config::IrrSettings;
use crate::error::{checked, SolarFinanceError};
use crate::types::{Money, Rate};
use crate::SolarFinanceResult;

/// Result of an IRR search. Anything other than `Converged` is a distinct
/// marker, never a numeric stand-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IrrOutcome {
    Converged { rate: Rate, iterations: u32 },
    /// The flows are all outflows or all inflows
    NoSignChange,
    /// NPV has the same sign at both ends of the search window
    NotBracketed,
    DidNotConverge { iterations: u32, last_rate: Rate },
}

impl IrrOutcome {
    pub fn rate(&self) -> Option<Rate> {
        match self {
            IrrOutcome::Converged { rate, .. } => Some(*rate),
            _ => None,
        }
    }

    pub fn is_converged(&self) -> bool {
        matches!(self, IrrOutcome::Converged { .. })
    }

    /// Short human label, e.g. "31.87%" or "no IRR (no sign change)".
    pub fn describe(&self) -> String {
        match self {
            IrrOutcome::Converged { rate, .. } => {
                format!("{}%", rate.saturating_mul(dec!(100)).round_dp(2))
            }
            IrrOutcome::NoSignChange => "no IRR (no sign change)".into(),
            IrrOutcome::NotBracketed => "no IRR (root outside search range)".into(),
            IrrOutcome::DidNotConverge { iterations, .. } => {
                format!("no IRR (did not converge in {iterations} iterations)")
            }
        }
    }
}

/// `base` raised to a whole-number power by repeated multiplication, or
/// `None` once the product leaves the Decimal range.
pub fn compound(base: Decimal, periods: u32) -> Option<Decimal> {
    (0..periods).try_fold(Decimal::ONE, |acc, _| acc.checked_mul(base))
}

/// Net Present Value of a series of cash flows, index 0 undiscounted.
///
/// For non-negative rates each flow is scaled by the running discount factor,
/// which never exceeds one. For rates in (-1, 0) the flows are rolled forward
/// to the final period first and brought back with a single checked division,
/// so an unrepresentable result is an error rather than an overflow.
pub fn npv(rate: Rate, cash_flows: &[Money]) -> SolarFinanceResult<Money> {
    if rate <= dec!(-1) {
        return Err(SolarFinanceError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    if rate >= Decimal::ZERO {
        return checked(discounted_sum(rate, cash_flows), "NPV discounting");
    }

    let horizon = cash_flows.len().saturating_sub(1) as u32;
    let growth = compound(Decimal::ONE + rate, horizon);
    checked(terminal_value(rate, cash_flows), "NPV terminal value")?
        .checked_div(growth.unwrap_or(Decimal::ZERO))
        .ok_or_else(|| SolarFinanceError::DivisionByZero {
            context: format!("NPV at rate {rate} over {horizon} periods"),
        })
}

/// Σ cf_t / (1+r)^t for r >= 0.
fn discounted_sum(rate: Rate, cash_flows: &[Money]) -> Option<Money> {
    let factor_step = Decimal::ONE / Decimal::ONE.checked_add(rate)?;
    let mut factor = Decimal::ONE;
    let mut total = Decimal::ZERO;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            factor *= factor_step;
        }
        total = total.checked_add(cf * factor)?;
    }

    Some(total)
}

/// Σ cf_t (1+r)^(N-t), evaluated in Horner form. Same sign as NPV for r > -1.
fn terminal_value(rate: Rate, cash_flows: &[Money]) -> Option<Money> {
    let one_plus_r = Decimal::ONE + rate;
    cash_flows
        .iter()
        .try_fold(Decimal::ZERO, |acc, cf| acc.checked_mul(one_plus_r)?.checked_add(*cf))
}

/// A quantity with the sign of NPV(rate) that stays bounded by Σ|cf| anywhere
/// in (-1, ∞).
fn npv_sign_proxy(rate: Rate, cash_flows: &[Money]) -> SolarFinanceResult<Money> {
    let value = if rate >= Decimal::ZERO {
        discounted_sum(rate, cash_flows)
    } else {
        terminal_value(rate, cash_flows)
    };
    checked(value, "IRR search")
}

/// Internal Rate of Return by bisection over the configured window.
///
/// Returns `Err` only for unusable arguments. An IRR that does not exist or
/// cannot be found is reported through [`IrrOutcome`].
pub fn irr(cash_flows: &[Money], settings: &IrrSettings) -> SolarFinanceResult<IrrOutcome> {
    if cash_flows.len() < 2 {
        return Err(SolarFinanceError::InsufficientData(
            "IRR requires at least 2 cash flows".into(),
        ));
    }
    if settings.lower_bound <= dec!(-1) || settings.upper_bound <= settings.lower_bound {
        return Err(SolarFinanceError::InvalidInput {
            field: "irr bounds".into(),
            reason: format!(
                "Search window [{}, {}] must satisfy -1 < lower < upper",
                settings.lower_bound, settings.upper_bound
            ),
        });
    }

    let has_outflow = cash_flows.iter().any(|cf| cf.is_sign_negative() && !cf.is_zero());
    let has_inflow = cash_flows.iter().any(|cf| *cf > Decimal::ZERO);
    if !(has_outflow && has_inflow) {
        return Ok(IrrOutcome::NoSignChange);
    }

    let mut lo = settings.lower_bound;
    let mut hi = settings.upper_bound;
    let f_lo = npv_sign_proxy(lo, cash_flows)?;
    let f_hi = npv_sign_proxy(hi, cash_flows)?;

    if f_lo.is_zero() {
        return Ok(IrrOutcome::Converged { rate: lo, iterations: 0 });
    }
    if f_hi.is_zero() {
        return Ok(IrrOutcome::Converged { rate: hi, iterations: 0 });
    }
    let lo_positive = f_lo > Decimal::ZERO;
    if lo_positive == (f_hi > Decimal::ZERO) {
        return Ok(IrrOutcome::NotBracketed);
    }

    for iteration in 1..=settings.max_iterations {
        let mid = (lo + hi) / dec!(2);

        if let Ok(value) = npv(mid, cash_flows) {
            if value.abs() < settings.tolerance {
                return Ok(IrrOutcome::Converged {
                    rate: mid,
                    iterations: iteration,
                });
            }
        }

        // Decimal precision exhausted; the window can no longer shrink.
        if mid == lo || mid == hi {
            return Ok(IrrOutcome::DidNotConverge {
                iterations: iteration,
                last_rate: mid,
            });
        }

        if (npv_sign_proxy(mid, cash_flows)? > Decimal::ZERO) == lo_positive {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    Ok(IrrOutcome::DidNotConverge {
        iterations: settings.max_iterations,
        last_rate: (lo + hi) / dec!(2),
    })
}

/// Level annual payment that fully amortizes `principal` over `periods`.
///
/// A zero rate falls back to straight-line repayment. Computed as
/// P·r / (1 - 1/g) with g = (1+r)^n; when g is too large to represent, 1/g is
/// below Decimal resolution and the payment is the interest-only P·r.
pub fn levelized_payment(principal: Money, rate: Rate, periods: u32) -> SolarFinanceResult<Money> {
    if periods == 0 {
        return Err(SolarFinanceError::InvalidInput {
            field: "periods".into(),
            reason: "Number of periods must be > 0".into(),
        });
    }
    if rate < Decimal::ZERO {
        return Err(SolarFinanceError::InvalidInput {
            field: "rate".into(),
            reason: "Loan rate cannot be negative".into(),
        });
    }

    if principal.is_zero() {
        return Ok(Decimal::ZERO);
    }
    if rate.is_zero() {
        return Ok(principal / Decimal::from(periods));
    }

    let interest = checked(principal.checked_mul(rate), "levelized payment interest")?;
    let Some(growth) = Decimal::ONE.checked_add(rate).and_then(|base| compound(base, periods)) else {
        return Ok(interest);
    };

    let annuity = Decimal::ONE - Decimal::ONE / growth;
    if annuity.is_zero() {
        return Err(SolarFinanceError::DivisionByZero {
            context: "levelized payment annuity factor".into(),
        });
    }

    checked(interest.checked_div(annuity), "levelized payment")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn settings() -> IrrSettings {
        IrrSettings::default()
    }

    #[test]
    fn test_npv_basic() {
        let cfs = vec![dec!(-1000), dec!(300), dec!(400), dec!(500)];
        let result = npv(dec!(0.10), &cfs).unwrap();
        // NPV at 10%: -1000 + 300/1.1 + 400/1.21 + 500/1.331 ≈ -21.04
        assert!((result - dec!(-21.04)).abs() < dec!(0.01));
    }

    #[test]
    fn test_npv_zero_rate() {
        let cfs = vec![dec!(-100), dec!(50), dec!(50), dec!(50)];
        let result = npv(dec!(0.0), &cfs).unwrap();
        assert_eq!(result, dec!(50));
    }

    #[test]
    fn test_npv_negative_rate() {
        // -100 + 60/0.5 = 20
        let cfs = vec![dec!(-100), dec!(60)];
        let result = npv(dec!(-0.5), &cfs).unwrap();
        assert!((result - dec!(20)).abs() < dec!(0.0000001));
    }

    #[test]
    fn test_npv_rejects_rate_at_minus_one() {
        let cfs = vec![dec!(-100), dec!(60)];
        assert!(npv(dec!(-1), &cfs).is_err());
    }

    #[test]
    fn test_npv_extreme_negative_rate_does_not_panic() {
        let cfs: Vec<Money> = std::iter::once(dec!(-26_880_000))
            .chain(std::iter::repeat(dec!(9_000_000)).take(20))
            .collect();
        // Either a representable value or an error, never an overflow panic.
        let _ = npv(dec!(-0.99), &cfs);
    }

    #[test]
    fn test_irr_basic() {
        let cfs = vec![dec!(-1000), dec!(400), dec!(400), dec!(400)];
        let outcome = irr(&cfs, &settings()).unwrap();
        let rate = outcome.rate().expect("IRR should converge");
        // IRR should be ~9.7%
        assert!((rate - dec!(0.097)).abs() < dec!(0.001));
    }

    #[test]
    fn test_irr_zeroes_npv() {
        let cfs = vec![dec!(-500), dec!(100), dec!(200), dec!(300), dec!(50)];
        let outcome = irr(&cfs, &settings()).unwrap();
        let rate = outcome.rate().unwrap();
        let residual = npv(rate, &cfs).unwrap();
        assert!(residual.abs() < settings().tolerance);
    }

    #[test]
    fn test_irr_negative_root() {
        // Receive back less than invested: IRR = -20%
        let cfs = vec![dec!(-100), dec!(80)];
        let rate = irr(&cfs, &settings()).unwrap().rate().unwrap();
        assert!((rate - dec!(-0.2)).abs() < dec!(0.0000001));
    }

    #[test]
    fn test_irr_all_outflows_has_no_sign_change() {
        let cfs = vec![dec!(-100), dec!(-10), dec!(-10)];
        assert_eq!(irr(&cfs, &settings()).unwrap(), IrrOutcome::NoSignChange);
    }

    #[test]
    fn test_irr_all_inflows_has_no_sign_change() {
        let cfs = vec![dec!(0), dec!(10), dec!(10)];
        assert_eq!(irr(&cfs, &settings()).unwrap(), IrrOutcome::NoSignChange);
    }

    #[test]
    fn test_irr_root_outside_window() {
        // True IRR is 100%; search only up to 50%
        let cfs = vec![dec!(-100), dec!(200)];
        let narrow = IrrSettings {
            upper_bound: dec!(0.5),
            ..IrrSettings::default()
        };
        assert_eq!(irr(&cfs, &narrow).unwrap(), IrrOutcome::NotBracketed);
    }

    #[test]
    fn test_irr_iteration_budget_exhausted() {
        let cfs = vec![dec!(-1000), dec!(400), dec!(400), dec!(400)];
        let tight = IrrSettings {
            max_iterations: 3,
            ..IrrSettings::default()
        };
        match irr(&cfs, &tight).unwrap() {
            IrrOutcome::DidNotConverge { iterations, .. } => assert_eq!(iterations, 3),
            other => panic!("Expected DidNotConverge, got {other:?}"),
        }
    }

    #[test]
    fn test_irr_requires_two_flows() {
        assert!(irr(&[dec!(-100)], &settings()).is_err());
    }

    #[test]
    fn test_levelized_payment_known_answer() {
        // 1,000 at 10% over 3 years: 402.11
        let payment = levelized_payment(dec!(1000), dec!(0.10), 3).unwrap();
        assert!((payment - dec!(402.11)).abs() < dec!(0.01));
    }

    #[test]
    fn test_levelized_payment_zero_rate_is_straight_line() {
        let payment = levelized_payment(dec!(1500), Decimal::ZERO, 15).unwrap();
        assert_eq!(payment, dec!(100));
    }

    #[test]
    fn test_levelized_payment_zero_periods_rejected() {
        assert!(levelized_payment(dec!(1000), dec!(0.05), 0).is_err());
    }

    #[test]
    fn test_compound() {
        assert_eq!(compound(dec!(1.1), 2), Some(dec!(1.21)));
        assert_eq!(compound(dec!(3), 0), Some(Decimal::ONE));
    }

    #[test]
    fn test_compound_out_of_range_is_none() {
        assert!(compound(dec!(2), 70).is_some());
        assert_eq!(compound(dec!(2), 100), None);
    }

    #[test]
    fn test_levelized_payment_high_rate_long_tenor() {
        // g = 2^70: the payment is interest plus a vanishing principal share
        let payment = levelized_payment(dec!(100_000_000), dec!(1.0), 70).unwrap();
        assert!(payment > dec!(100_000_000));
        assert!(payment - dec!(100_000_000) < dec!(0.0001));

        // g = 2^100 exceeds the Decimal range: interest only
        let payment = levelized_payment(dec!(100_000_000), dec!(1.0), 100).unwrap();
        assert_eq!(payment, dec!(100_000_000));
    }

    #[test]
    fn test_levelized_payment_overflowing_interest_is_error() {
        let err = levelized_payment(Decimal::MAX, dec!(2), 10).unwrap_err();
        assert!(matches!(err, SolarFinanceError::Overflow { .. }));
    }

    #[test]
    fn test_npv_overflowing_sum_is_error() {
        let cfs = vec![Decimal::MAX, Decimal::MAX];
        assert!(matches!(
            npv(Decimal::ZERO, &cfs).unwrap_err(),
            SolarFinanceError::Overflow { .. }
        ));
    }

    #[test]
    fn test_irr_outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(IrrOutcome::NoSignChange).unwrap();
        assert_eq!(json["status"], "no_sign_change");
    }
}
