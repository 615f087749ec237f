use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::Deserialize;

use proforma_core::proforma::amortization::{LoanYear, Mortgage};
use proforma_core::proforma::normalize::{FormDefaults, PropertyForm};
use proforma_core::proforma::request::{AnalysisRequest, MortgageTerms};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// A raw intake form with optional overrides for blank-field defaults.
#[derive(Deserialize)]
struct FormInput {
    form: PropertyForm,
    #[serde(default)]
    defaults: FormDefaults,
}

// ---------------------------------------------------------------------------
// Pro forma
// ---------------------------------------------------------------------------

#[napi]
pub fn analyze_property(input_json: String) -> NapiResult<String> {
    let input: AnalysisRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        proforma_core::proforma::analyze_property(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn analyze_form(input_json: String) -> NapiResult<String> {
    let input: FormInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = proforma_core::proforma::analyze_form(&input.form, &input.defaults)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn normalize_form(input_json: String) -> NapiResult<String> {
    let input: FormInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = proforma_core::proforma::normalize_form(&input.form, &input.defaults)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Financing
// ---------------------------------------------------------------------------

#[napi]
pub fn mortgage_payment(input_json: String) -> NapiResult<String> {
    let terms: MortgageTerms = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let mortgage = Mortgage::from_terms(&terms, "loan")
        .map_err(to_napi_error)?
        .ok_or_else(|| to_napi_error("principal must be greater than zero"))?;
    let schedule: Vec<LoanYear> = mortgage.schedule().collect();
    let total_interest: Decimal = schedule.iter().map(|y| y.interest).sum();
    let output = serde_json::json!({
        "monthly_payment": mortgage.monthly_payment_in_year(1),
        "amortizing_payment": mortgage.amortizing_payment(),
        "term_months": mortgage.term_months(),
        "total_interest": total_interest,
        "schedule": schedule,
    });
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[napi]
pub fn sensitivity(input_json: String) -> NapiResult<String> {
    let input: proforma_core::scenarios::SensitivityInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        proforma_core::scenarios::run_sensitivity(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
