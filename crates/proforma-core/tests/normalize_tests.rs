use proforma_core::proforma::normalize::{normalize_form, FormDefaults, PropertyForm, Provenance};
use proforma_core::proforma::{analyze_form, IrrStatus};
use proforma_core::ProformaError;
use rust_decimal_macros::dec;

fn form_json(extra: &str) -> PropertyForm {
    let json = format!(
        r#"{{
            "address": "301 Walnut St", "city": "Cincinnati", "state": "OH",
            "zipCode": "45202", "offerPrice": 425000, "grossRents": 54000,
            "numberOfUnits": 4, "fairMarketValue": "",
            "firstMtgPrincipleBorrowed": 318750, "firstMtgInterestRate": 6.75,
            "firstMtgAmortizationPeriod": 30{extra}
        }}"#
    );
    serde_json::from_str(&json).unwrap()
}

#[test]
fn test_form_to_full_analysis() {
    let out = analyze_form(&form_json(""), &FormDefaults::default()).unwrap();
    let s = &out.result.summary;
    assert_eq!(out.result.projection.len(), 10);
    assert_eq!(s.real_purchase_price, dec!(425000));
    assert_eq!(s.cash_to_close, dec!(106250));
    // 54000 * 0.95 vacancy default
    assert_eq!(s.effective_gross_income, dec!(51300));
    assert_eq!(s.irr_status, IrrStatus::Converged);
}

#[test]
fn test_percent_fields_become_rates_once() {
    let normalized = normalize_form(
        &form_json(r#", "vacancyRate": "7", "managementRate": 8, "exitCostRate": 5"#),
        &FormDefaults::default(),
    )
    .unwrap();
    let req = normalized.request;
    assert_eq!(req.income.vacancy_rate, dec!(0.07));
    assert_eq!(req.expenses.management_rate, dec!(0.08));
    assert_eq!(req.projection.exit_cost_rate, dec!(0.05));
    assert_eq!(req.financing.first_mortgage.annual_rate, dec!(0.0675));
}

#[test]
fn test_blank_required_fields_all_reported() {
    let json = r#"{"address": "", "city": "  ", "state": "OH", "zipCode": null,
                   "offerPrice": "", "grossRents": 1000}"#;
    let form: PropertyForm = serde_json::from_str(json).unwrap();
    let err = normalize_form(&form, &FormDefaults::default()).unwrap_err();
    match &err {
        ProformaError::Validation { missing } => {
            assert_eq!(missing, &vec!["address", "city", "zipCode", "offerPrice"]);
        }
        other => panic!("Expected Validation, got {other:?}"),
    }
    assert!(err.to_string().contains("address, city, zipCode, offerPrice"));
}

#[test]
fn test_negative_amortization_rejected() {
    let json = r#"{"address": "1 A St", "city": "B", "state": "OH", "zipCode": "1",
                   "offerPrice": 1000, "grossRents": 100,
                   "firstMtgAmortizationPeriod": -30}"#;
    let form: PropertyForm = serde_json::from_str(json).unwrap();
    match normalize_form(&form, &FormDefaults::default()).unwrap_err() {
        ProformaError::InvalidInput { field, .. } => assert_eq!(field, "firstMtgAmortizationPeriod"),
        other => panic!("Expected InvalidInput, got {other:?}"),
    }
}

#[test]
fn test_provenance_side_channel() {
    let normalized = normalize_form(
        &form_json(r#", "holdYears": 7"#),
        &FormDefaults::default(),
    )
    .unwrap();
    assert_eq!(normalized.provenance["holdYears"], Provenance::Entered);
    assert_eq!(normalized.provenance["rentGrowthRate"], Provenance::Defaulted);
    assert_eq!(normalized.provenance["fairMarketValue"], Provenance::Defaulted);
    assert_eq!(normalized.request.projection.hold_years, 7);
}

#[test]
fn test_defaults_from_json_overrides() {
    let defaults: FormDefaults =
        serde_json::from_str(r#"{"vacancy_rate": "0.08", "hold_years": 5}"#).unwrap();
    assert_eq!(defaults.management_rate, dec!(0.10));
    let out = analyze_form(&form_json(""), &defaults).unwrap();
    assert_eq!(out.result.projection.len(), 5);
    assert_eq!(out.result.summary.vacancy_loss, dec!(4320));
}

fn rejected_field(extra: &str) -> String {
    match analyze_form(&form_json(extra), &FormDefaults::default()).unwrap_err() {
        ProformaError::InvalidInput { field, .. } => field,
        other => panic!("Expected InvalidInput, got {other:?}"),
    }
}

#[test]
fn test_very_long_hold_is_an_error() {
    assert_eq!(rejected_field(r#", "holdYears": 2000"#), "projection.hold_years");
}

#[test]
fn test_very_long_amortization_is_an_error() {
    let form: PropertyForm = serde_json::from_str(
        r#"{"address": "1 A St", "city": "B", "state": "OH", "zipCode": "1",
            "offerPrice": 300000, "grossRents": 24000,
            "firstMtgPrincipleBorrowed": 240000, "firstMtgInterestRate": 7,
            "firstMtgAmortizationPeriod": 1000}"#,
    )
    .unwrap();
    match analyze_form(&form, &FormDefaults::default()).unwrap_err() {
        ProformaError::InvalidInput { field, .. } => {
            assert_eq!(field, "financing.first_mortgage.amortization_years")
        }
        other => panic!("Expected InvalidInput, got {other:?}"),
    }
}

#[test]
fn test_runaway_appreciation_is_an_error() {
    assert_eq!(
        rejected_field(r#", "holdYears": 100, "annualAppreciationRate": 100"#),
        "property.annual_appreciation"
    );
}

#[test]
fn test_whole_numbers_as_text() {
    let normalized = normalize_form(
        &form_json(r#", "holdYears": "7", "firstMtgInterestOnlyYears": " 2 ""#),
        &FormDefaults::default(),
    )
    .unwrap();
    assert_eq!(normalized.request.projection.hold_years, 7);
    assert_eq!(normalized.request.financing.first_mortgage.interest_only_years, 2);
    assert_eq!(normalized.provenance["holdYears"], Provenance::Entered);
}
