use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::proforma::analysis::{analyze_year_one, year_one_warnings, YearOneMetrics};
use crate::proforma::exit::{compute_exit, ExitReturns, IrrStatus};
use crate::proforma::normalize::{normalize_form, FormDefaults, PropertyForm, Provenance};
use crate::proforma::projection::{project_years, year_one_row, YearRow};
use crate::proforma::request::AnalysisRequest;
use crate::types::{with_metadata, ComputationOutput, Money, Multiple, Rate};
use crate::ProformaResult;

const METHODOLOGY: &str =
    "Rental Pro Forma (Year-1 static analysis, monthly amortization, multi-year projection, exit IRR by bisection)";

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Flat map of every headline figure: Year-1 metrics plus exit returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub real_purchase_price: Money,
    pub cash_to_close: Money,
    pub total_income: Money,
    pub vacancy_loss: Money,
    pub effective_gross_income: Money,
    pub total_expenses: Money,
    pub noi: Money,
    pub annual_debt_service: Money,
    pub monthly_payment_first: Money,
    pub monthly_payment_second: Money,
    pub cash_flow: Money,
    pub monthly_profit: Money,
    pub cap_rate_purchase: Option<Rate>,
    pub cap_rate_fmv: Option<Rate>,
    pub dscr: Option<Multiple>,
    pub grm: Option<Multiple>,
    pub cash_on_cash: Option<Rate>,
    pub equity_roi: Option<Rate>,
    pub appreciation_roi: Option<Rate>,
    pub total_roi: Option<Rate>,
    pub forced_appreciation_roi: Option<Rate>,
    pub avg_rent_per_unit_monthly: Option<Money>,
    pub cash_flow_per_unit_monthly: Option<Money>,
    pub ltv_fmv: Option<Rate>,
    pub loan_to_purchase_price: Option<Rate>,
    pub sale_price_gross: Money,
    pub exit_costs: Money,
    pub loan_payoff: Money,
    pub sale_proceeds_net: Money,
    pub irr: Option<Rate>,
    pub irr_status: IrrStatus,
    pub equity_multiple: Option<Multiple>,
}

impl AnalysisSummary {
    pub fn new(y1: &YearOneMetrics, exit: &ExitReturns) -> Self {
        let op = &y1.operating;
        AnalysisSummary {
            real_purchase_price: y1.real_purchase_price,
            cash_to_close: y1.cash_to_close,
            total_income: op.total_income,
            vacancy_loss: op.vacancy_loss,
            effective_gross_income: op.effective_gross_income,
            total_expenses: op.total_expenses,
            noi: op.noi,
            annual_debt_service: y1.annual_debt_service,
            monthly_payment_first: y1.monthly_payment_first,
            monthly_payment_second: y1.monthly_payment_second,
            cash_flow: y1.cash_flow,
            monthly_profit: y1.monthly_profit,
            cap_rate_purchase: y1.cap_rate_purchase,
            cap_rate_fmv: y1.cap_rate_fmv,
            dscr: y1.dscr,
            grm: y1.grm,
            cash_on_cash: y1.cash_on_cash,
            equity_roi: y1.equity_roi,
            appreciation_roi: y1.appreciation_roi,
            total_roi: y1.total_roi,
            forced_appreciation_roi: y1.forced_appreciation_roi,
            avg_rent_per_unit_monthly: y1.avg_rent_per_unit_monthly,
            cash_flow_per_unit_monthly: y1.cash_flow_per_unit_monthly,
            ltv_fmv: y1.ltv_fmv,
            loan_to_purchase_price: y1.loan_to_purchase_price,
            sale_price_gross: exit.sale_price_gross,
            exit_costs: exit.exit_costs,
            loan_payoff: exit.loan_payoff,
            sale_proceeds_net: exit.sale_proceeds_net,
            irr: exit.irr,
            irr_status: exit.irr_status,
            equity_multiple: exit.equity_multiple,
        }
    }
}

/// Result of a full pro forma run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProFormaOutput {
    pub summary: AnalysisSummary,
    /// One row per year of the hold, ascending; empty for a zero-year hold
    pub projection: Vec<YearRow>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run the whole pro forma: Year-1 analysis, projection over the hold
/// period and the exit.
///
/// A zero-year hold yields no projection rows; its exit figures come from
/// the Year-1 row as a one-year hold.
pub fn analyze_property(req: &AnalysisRequest) -> ProformaResult<ComputationOutput<ProFormaOutput>> {
    let start = Instant::now();

    let y1 = analyze_year_one(req)?;
    let mut warnings = year_one_warnings(req, &y1);

    let projection = project_years(req, &y1)?;
    let fallback = if projection.is_empty() {
        Some(year_one_row(req, &y1)?)
    } else {
        None
    };
    let exit = compute_exit(
        &projection,
        fallback.as_ref(),
        y1.cash_to_close,
        req.projection.exit_cost_rate,
    )?;

    if exit.irr_status == IrrStatus::NoConvergence {
        warnings.push(
            "IRR not computable: no rate between -99% and 1000% sets NPV to zero".into(),
        );
    }
    if exit.sale_proceeds_net < Money::ZERO {
        warnings.push(format!(
            "Net sale proceeds are negative ({:.2}): loan payoff exceeds the sale price after costs",
            exit.sale_proceeds_net
        ));
    }

    let output = ProFormaOutput {
        summary: AnalysisSummary::new(&y1, &exit),
        projection,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        METHODOLOGY,
        &serde_json::json!({
            "address": req.property.address,
            "offer_price": req.property.offer_price.to_string(),
            "hold_years": req.projection.hold_years,
            "vacancy_rate": req.income.vacancy_rate.to_string(),
            "management_base": req.expenses.management_base,
            "rent_growth": req.projection.rent_growth.to_string(),
            "expense_growth": req.projection.expense_growth.to_string(),
            "appreciation": req.property.annual_appreciation.to_string(),
            "exit_cost_rate": req.projection.exit_cost_rate.to_string(),
            "exit_year": exit.exit_year,
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Normalize a raw form and run the pro forma on it.
///
/// Fields filled from `defaults` are listed under `defaulted_fields` in the
/// assumptions.
pub fn analyze_form(
    form: &PropertyForm,
    defaults: &FormDefaults,
) -> ProformaResult<ComputationOutput<ProFormaOutput>> {
    let normalized = normalize_form(form, defaults)?;
    let mut output = analyze_property(&normalized.request)?;

    let defaulted: Vec<&str> = normalized
        .provenance
        .iter()
        .filter(|(_, source)| **source == Provenance::Defaulted)
        .map(|(name, _)| name.as_str())
        .collect();
    if let Some(map) = output.assumptions.as_object_mut() {
        map.insert("defaulted_fields".into(), serde_json::json!(defaulted));
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proforma::request::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn duplex(hold_years: u32) -> AnalysisRequest {
        AnalysisRequest {
            property: PropertyInfo {
                address: "77 River Rd".into(),
                city: "Toledo".into(),
                state: "OH".into(),
                zip: "43604".into(),
                fair_market_value: Decimal::ZERO,
                offer_price: dec!(250000),
                number_of_units: 2,
                annual_appreciation: dec!(0.03),
            },
            purchase: PurchaseCosts {
                inspections: dec!(600),
                legal: dec!(1400),
                ..Default::default()
            },
            financing: Financing {
                first_mortgage: MortgageTerms {
                    principal: dec!(200000),
                    annual_rate: dec!(0.065),
                    amortization_years: 30,
                    interest_only_years: 0,
                },
                ..Default::default()
            },
            income: IncomeTerms {
                gross_rents: dec!(30000),
                parking: Decimal::ZERO,
                storage: Decimal::ZERO,
                laundry_vending: Decimal::ZERO,
                other_income: Decimal::ZERO,
                vacancy_rate: dec!(0.05),
            },
            expenses: OperatingExpenses {
                property_taxes: dec!(3500),
                insurance: dec!(1200),
                management_rate: dec!(0.08),
                ..Default::default()
            },
            projection: ProjectionParams {
                hold_years,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_full_run_shape() {
        let out = analyze_property(&duplex(10)).unwrap();
        assert_eq!(out.result.projection.len(), 10);
        assert_eq!(out.result.summary.real_purchase_price, dec!(252000));
        assert_eq!(out.result.summary.cash_to_close, dec!(52000));
        assert_eq!(out.result.summary.irr_status, IrrStatus::Converged);
        assert!(out.result.summary.irr.is_some());
        assert!(out.methodology.contains("Pro Forma"));
        assert_eq!(out.assumptions["hold_years"], 10);
    }

    #[test]
    fn test_zero_hold_matches_one_year_exit() {
        let zero = analyze_property(&duplex(0)).unwrap().result;
        let one = analyze_property(&duplex(1)).unwrap().result;
        assert!(zero.projection.is_empty());
        assert_eq!(zero.summary, one.summary);
    }

    #[test]
    fn test_idempotent() {
        let req = duplex(5);
        let a = analyze_property(&req).unwrap().result;
        let b = analyze_property(&req).unwrap().result;
        assert_eq!(a, b);
    }

    #[test]
    fn test_no_convergence_warns() {
        let mut req = duplex(1);
        // Sale cannot cover the loan: every flow is negative
        req.property.annual_appreciation = Decimal::ZERO;
        req.property.fair_market_value = dec!(100000);
        req.expenses.property_taxes = dec!(40000);
        let out = analyze_property(&req).unwrap();
        assert_eq!(out.result.summary.irr, None);
        assert_eq!(out.result.summary.irr_status, IrrStatus::NoConvergence);
        assert!(out.warnings.iter().any(|w| w.contains("IRR not computable")));
        assert!(out.warnings.iter().any(|w| w.contains("Net sale proceeds")));
    }

    #[test]
    fn test_analyze_form_lists_defaulted_fields() {
        let form = PropertyForm {
            address: "77 River Rd".to_string().into(),
            city: "Toledo".to_string().into(),
            state: "OH".to_string().into(),
            zip_code: "43604".to_string().into(),
            offer_price: dec!(250000).into(),
            gross_rents: dec!(30000).into(),
            ..Default::default()
        };
        let out = analyze_form(&form, &FormDefaults::default()).unwrap();
        let defaulted = out.assumptions["defaulted_fields"].as_array().unwrap();
        assert!(defaulted.iter().any(|f| f == "vacancyRate"));
        assert_eq!(out.result.projection.len(), 10);
    }
}
