use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use solar_finance_core::config::ModelConfig;
use solar_finance_core::solar::assumptions::{
    CapitalStack, DebtTerms, ProjectAssumptions, SolarProjectInput,
};
use solar_finance_core::solar::model::{model_solar_project, run_model, run_model_from_fields};
use solar_finance_core::solar::returns::{SensitivityParameter, Shift};
use solar_finance_core::solar::validation::{validate, ValidationOutcome};
use solar_finance_core::solar::fields::field_map_from_json;
use solar_finance_core::time_value::{self, IrrOutcome};
use solar_finance_core::SolarFinanceError;

// ===========================================================================
// Fixtures
// ===========================================================================

fn falcon_assumptions() -> ProjectAssumptions {
    ProjectAssumptions {
        project_name: "Falcon Solar".into(),
        project_size_mw: dec!(120),
        capex_per_watt: dec!(1.12),
        capacity_factor: dec!(0.29),
        ppa_price_per_mwh: dec!(61),
        opex_per_kw_year: dec!(17),
        annual_degradation_pct: dec!(0.005),
        merchant_tail_price_per_mwh: dec!(44),
        merchant_tail_start_year: 16,
        analysis_years: 20,
        discount_rate: dec!(0.08),
    }
}

fn falcon_stack() -> CapitalStack {
    CapitalStack {
        debt_pct: dec!(0.55),
        tax_equity_pct: dec!(0.25),
        sponsor_equity_pct: dec!(0.20),
    }
}

fn falcon_debt() -> DebtTerms {
    DebtTerms {
        debt_rate: dec!(0.062),
        debt_tenor_years: 15,
    }
}

fn assert_close(actual: Decimal, expected: Decimal, tolerance: Decimal, what: &str) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "{what}: expected {expected} ± {tolerance}, got {actual}"
    );
}

// ===========================================================================
// Falcon Solar regression
// ===========================================================================

#[test]
fn test_falcon_headline_amounts() {
    let result = run_model(&falcon_assumptions(), &falcon_stack(), &falcon_debt()).unwrap();

    assert_eq!(result.capex, dec!(134_400_000));
    assert_eq!(result.debt_principal, dec!(73_920_000));
    assert_eq!(result.tax_equity_amount, dec!(33_600_000));
    assert_eq!(result.sponsor_equity_investment, dec!(26_880_000));
    assert_close(result.annual_debt_service, dec!(7_710_778.99), dec!(0.01), "debt service");
    assert_eq!(result.cash_flow_schedule.len(), 20);
    assert!(result.warnings.is_empty());
}

#[test]
fn test_falcon_cash_flows() {
    let result = run_model(&falcon_assumptions(), &falcon_stack(), &falcon_debt()).unwrap();
    let first = &result.cash_flow_schedule[0];
    let last = &result.cash_flow_schedule[19];

    assert_close(first.levered_cash_flow, dec!(8_844_949.01), dec!(0.01), "year 1");
    assert_close(last.levered_cash_flow, dec!(10_154_796.59), dec!(0.05), "year 20");
    assert_eq!(result.equity_cash_flows.len(), 21);
    assert_eq!(result.equity_cash_flows[0], dec!(-26_880_000));
}

#[test]
fn test_falcon_returns() {
    let result = run_model(&falcon_assumptions(), &falcon_stack(), &falcon_debt()).unwrap();

    assert_close(result.npv, dec!(57_409_036.95), dec!(0.05), "NPV @ 8%");
    let irr = result.irr.rate().expect("Falcon IRR should converge");
    assert_close(irr, dec!(0.318655), dec!(0.00001), "IRR");
}

#[test]
fn test_falcon_sensitivities() {
    let result = run_model(&falcon_assumptions(), &falcon_stack(), &falcon_debt()).unwrap();
    let npv = result.npv_by_scenario();

    let expected = [
        ("discount_rate=0.07", dec!(64_183_394.31)),
        ("discount_rate=0.09", dec!(51_406_333.72)),
        ("ppa_price_per_mwh=54.9", dec!(41_928_824.60)),
        ("ppa_price_per_mwh=67.1", dec!(72_889_249.30)),
        ("capex_per_watt=1.008", dec!(66_697_061.79)),
        ("capex_per_watt=1.232", dec!(48_121_012.10)),
    ];
    assert_eq!(npv.len(), expected.len());
    for (label, value) in expected {
        let actual = *npv
            .get(label)
            .unwrap_or_else(|| panic!("missing sensitivity {label}"));
        assert_close(actual, value, dec!(0.05), label);
    }

    let ppa_down = result
        .sensitivity(SensitivityParameter::PpaPrice, Shift::Down)
        .unwrap();
    assert_close(ppa_down.irr.rate().unwrap(), dec!(0.249556), dec!(0.00001), "PPA -10% IRR");
    let capex_up = result
        .sensitivity(SensitivityParameter::Capex, Shift::Up)
        .unwrap();
    assert_close(capex_up.irr.rate().unwrap(), dec!(0.261987), dec!(0.00001), "CAPEX +10% IRR");
}

#[test]
fn test_falcon_from_message_fields_matches_typed() {
    let fields = field_map_from_json(&serde_json::json!({
        "assumptions": {
            "project_name": "Falcon Solar",
            "project_size_mw": 120,
            "capex_per_watt": "1.12",
            "capacity_factor": "0.29",
            "ppa_price_per_mwh": 61,
            "opex_per_kw_year": 17,
            "annual_degradation_pct": "0.005",
            "merchant_tail_price_per_mwh": 44,
            "merchant_tail_start_year": 16,
            "analysis_years": 20,
            "discount_rate": "0.08"
        },
        "capital_stack": {
            "debt_pct": "0.55",
            "tax_equity_pct": "0.25",
            "sponsor_equity_pct": "0.20"
        },
        "debt_terms": { "debt_rate": "0.062", "debt_tenor_years": 15 }
    }))
    .unwrap();

    let from_fields = run_model_from_fields(&fields, &ModelConfig::default()).unwrap();
    let typed = run_model(&falcon_assumptions(), &falcon_stack(), &falcon_debt()).unwrap();
    assert_eq!(from_fields.capex, typed.capex);
    assert_eq!(from_fields.npv, typed.npv);
    assert_eq!(from_fields.irr, typed.irr);
}

// ===========================================================================
// Properties
// ===========================================================================

#[test]
fn test_capital_stack_outside_tolerance_rejected() {
    for sponsor in [dec!(0.194), dec!(0.206), dec!(0.5), Decimal::ZERO] {
        let mut stack = falcon_stack();
        stack.sponsor_equity_pct = sponsor;
        match validate(&falcon_assumptions(), &stack, &falcon_debt()) {
            ValidationOutcome::Invalid(failure) => {
                assert!(failure.mentions("capital_stack"), "sponsor {sponsor}")
            }
            ValidationOutcome::Valid(_) => panic!("sponsor {sponsor} should be rejected"),
        }
    }
}

#[test]
fn test_capital_stack_inside_tolerance_accepted() {
    for sponsor in [dec!(0.195), dec!(0.205)] {
        let mut stack = falcon_stack();
        stack.sponsor_equity_pct = sponsor;
        assert!(validate(&falcon_assumptions(), &stack, &falcon_debt()).is_valid());
    }
}

#[test]
fn test_schedule_shape_for_various_horizons() {
    for years in [1u32, 15, 20, 25, 40] {
        let mut a = falcon_assumptions();
        a.analysis_years = years;
        a.merchant_tail_start_year = years.min(16);
        let mut d = falcon_debt();
        d.debt_tenor_years = years.min(15);

        let result = run_model(&a, &falcon_stack(), &d).unwrap();
        let got: Vec<u32> = result.cash_flow_schedule.iter().map(|r| r.year).collect();
        assert_eq!(got, (1..=years).collect::<Vec<u32>>());
        assert_eq!(result.warnings.is_empty(), (15..=25).contains(&years));
    }
}

#[test]
fn test_converged_irr_is_a_root() {
    let config = ModelConfig::default();
    for ppa in [dec!(45), dec!(61), dec!(80)] {
        let mut a = falcon_assumptions();
        a.ppa_price_per_mwh = ppa;
        let result = run_model(&a, &falcon_stack(), &falcon_debt()).unwrap();
        if let IrrOutcome::Converged { rate, .. } = result.irr {
            let residual = time_value::npv(rate, &result.equity_cash_flows).unwrap();
            assert!(residual.abs() < config.irr.tolerance, "PPA {ppa}: residual {residual}");
        }
    }
}

#[test]
fn test_loss_making_project_still_returns_result() {
    let mut a = falcon_assumptions();
    a.ppa_price_per_mwh = dec!(5);
    a.merchant_tail_price_per_mwh = dec!(5);
    let result = run_model(&a, &falcon_stack(), &falcon_debt()).unwrap();
    assert!(result.npv < Decimal::ZERO);
    assert!(result.irr.rate().is_none());
    assert_ne!(result.irr.describe(), "");
}

#[test]
fn test_high_rate_long_tenor_debt_does_not_panic() {
    for years in [70u32, 100] {
        let mut a = falcon_assumptions();
        a.analysis_years = years;
        let d = DebtTerms {
            debt_rate: dec!(1.0),
            debt_tenor_years: years,
        };

        let result = run_model(&a, &falcon_stack(), &d).unwrap();
        assert_eq!(result.cash_flow_schedule.len(), years as usize);
        // Payment collapses to interest on the principal at this rate
        assert_close(
            result.annual_debt_service,
            result.debt_principal,
            dec!(0.01),
            &format!("{years}-year debt service"),
        );
        assert!(result.npv < Decimal::ZERO);
    }
}

#[test]
fn test_unrepresentable_project_size_is_an_error() {
    let mut a = falcon_assumptions();
    a.project_size_mw = dec!(100_000_000_000_000_000_000_000);
    match run_model(&a, &falcon_stack(), &falcon_debt()).unwrap_err() {
        SolarFinanceError::Overflow { context } => assert_eq!(context, "total CAPEX"),
        other => panic!("Expected Overflow, got: {other:?}"),
    }
}

#[test]
fn test_analysis_period_beyond_ceiling_rejected() {
    let mut a = falcon_assumptions();
    a.analysis_years = 4_000_000_000;
    match run_model(&a, &falcon_stack(), &falcon_debt()).unwrap_err() {
        SolarFinanceError::Validation(failure) => {
            assert_eq!(failure.fields(), vec!["analysis_years"]);
        }
        other => panic!("Expected Validation, got: {other:?}"),
    }
}

#[test]
fn test_missing_tenor_reported_alone() {
    let mut fields = field_map_from_json(&serde_json::json!({
        "project_name": "Falcon Solar",
        "project_size_mw": 120,
        "capex_per_watt": 1.12,
        "capacity_factor": 0.29,
        "ppa_price_per_mwh": 61,
        "opex_per_kw_year": 17,
        "annual_degradation_pct": 0.005,
        "merchant_tail_price_per_mwh": 44,
        "merchant_tail_start_year": 16,
        "analysis_years": 20,
        "discount_rate": 0.08,
        "debt_pct": 0.55,
        "tax_equity_pct": 0.25,
        "sponsor_equity_pct": 0.20,
        "debt_rate": 0.062,
        "debt_tenor_years": 15
    }))
    .unwrap();
    fields.remove("debt_tenor_years");

    let err = run_model_from_fields(&fields, &ModelConfig::default()).unwrap_err();
    match err {
        SolarFinanceError::Validation(failure) => {
            assert_eq!(failure.fields(), vec!["debt_tenor_years"]);
        }
        other => panic!("Expected Validation, got: {other:?}"),
    }
}

#[test]
fn test_envelope_metadata() {
    let input = SolarProjectInput {
        assumptions: falcon_assumptions(),
        capital_stack: falcon_stack(),
        debt_terms: falcon_debt(),
    };
    let output = model_solar_project(&input, &ModelConfig::default()).unwrap();
    assert_eq!(output.metadata.precision, "rust_decimal_128bit");
    assert_eq!(output.assumptions["project_name"], "Falcon Solar");
    assert!(output.warnings.is_empty());
    assert_eq!(output.result.capex, dec!(134_400_000));
}

#[test]
fn test_concurrent_runs_agree() {
    let handles: Vec<_> = (0..4)
        .map(|_| {
            std::thread::spawn(|| {
                run_model(&falcon_assumptions(), &falcon_stack(), &falcon_debt()).unwrap()
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(results.windows(2).all(|w| w[0] == w[1]));
}
