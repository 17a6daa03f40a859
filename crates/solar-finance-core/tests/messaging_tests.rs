#![cfg(feature = "messaging")]

use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use solar_finance_core::config::ModelConfig;
use solar_finance_core::messaging::{
    find_missing_fields, handle_message, parse_structured_message, Channel, ModelResponse,
};
use solar_finance_core::FieldIssue;

const FALCON_SMS: &str = "\
# Falcon Solar, sent from the field
project_name=Falcon Solar
project_size_mw=120
capex_per_watt=1.12
capacity_factor=0.29
ppa_price_per_mwh=61
opex_per_kw_year=17
annual_degradation_pct=0.005
merchant_tail_price_per_mwh=44
merchant_tail_start_year=16
analysis_years=20
discount_rate=0.08

debt_pct=0.55
tax_equity_pct=0.25
sponsor_equity_pct=0.20
debt_rate=0.062
debt_tenor_years=15
thanks!
";

#[test]
fn test_sms_round_trip_to_ok() {
    let response = handle_message(Channel::Sms, FALCON_SMS, &ModelConfig::default());
    match response {
        ModelResponse::Ok {
            channel,
            capex,
            sponsor_equity_investment,
            npv,
            ..
        } => {
            assert_eq!(channel, Channel::Sms);
            assert_eq!(capex, dec!(134_400_000));
            assert_eq!(sponsor_equity_investment, dec!(26_880_000));
            assert!((npv - dec!(57_409_036.95)).abs() < dec!(0.05));
        }
        other => panic!("Expected Ok, got: {other:?}"),
    }
}

#[test]
fn test_email_with_only_name_lists_everything_else() {
    let response = handle_message(Channel::Email, "project_name=Heron", &ModelConfig::default());
    match response {
        ModelResponse::NeedsInput { missing, issues, .. } => {
            assert_eq!(missing.len(), 15);
            assert_eq!(issues.len(), 15);
            assert_eq!(
                missing.capital_stack,
                vec!["debt_pct", "sponsor_equity_pct", "tax_equity_pct"]
            );
            assert!(issues.iter().all(|i| i.reason == "missing required field"));
        }
        other => panic!("Expected NeedsInput, got: {other:?}"),
    }
}

#[test]
fn test_issue_list_surfaced_exactly() {
    let body = FALCON_SMS
        .replace("capex_per_watt=1.12", "capex_per_watt=lots")
        .replace("sponsor_equity_pct=0.20", "sponsor_equity_pct=0.40");
    let response = handle_message(Channel::Whatsapp, &body, &ModelConfig::default());
    match response {
        ModelResponse::NeedsInput { missing, issues, .. } => {
            assert!(missing.is_empty());
            let fields: Vec<&str> = issues.iter().map(|i| i.field.as_str()).collect();
            assert_eq!(fields, vec!["capex_per_watt", "capital_stack"]);
            assert_eq!(
                issues[0],
                FieldIssue::new("capex_per_watt", "expected a number, got `lots`")
            );
        }
        other => panic!("Expected NeedsInput, got: {other:?}"),
    }
}

#[test]
fn test_long_horizon_reply_carries_note() {
    let body = FALCON_SMS.replace("analysis_years=20", "analysis_years=30");
    let response = handle_message(Channel::Sms, &body, &ModelConfig::default());
    assert!(response.is_ok());
    assert!(response.reply_text().contains("Note: Analysis period of 30 years"));
}

#[test]
fn test_oversized_horizon_asks_for_input() {
    let body = FALCON_SMS.replace("analysis_years=20", "analysis_years=4000000000");
    let response = handle_message(Channel::Sms, &body, &ModelConfig::default());
    match response {
        ModelResponse::NeedsInput { issues, .. } => {
            assert_eq!(
                issues,
                vec![FieldIssue::new(
                    "analysis_years",
                    "must not exceed 100, got 4000000000"
                )]
            );
        }
        other => panic!("Expected NeedsInput, got: {other:?}"),
    }
}

#[test]
fn test_unrepresentable_inputs_reply_with_error() {
    let body = FALCON_SMS.replace(
        "project_size_mw=120",
        "project_size_mw=100000000000000000000000",
    );
    let response = handle_message(Channel::Sms, &body, &ModelConfig::default());
    match response {
        ModelResponse::Error { message, .. } => {
            assert!(message.contains("overflow"), "unexpected message: {message}");
        }
        other => panic!("Expected Error, got: {other:?}"),
    }
}

#[test]
fn test_parser_keeps_unknown_keys() {
    let fields = parse_structured_message("sheet_title=Heron Q4\nproject_name=Heron\n");
    assert_eq!(fields["sheet_title"], "Heron Q4");
    assert_eq!(find_missing_fields(&fields).len(), 15);
}
