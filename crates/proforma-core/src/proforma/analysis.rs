use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ProformaError;
use crate::proforma::amortization::{loan_year, Mortgage};
use crate::proforma::request::{AnalysisRequest, ManagementBase};
use crate::types::{ratio, Money, Multiple, Rate, MAX_AMOUNT, MAX_PROJECTED_AMOUNT};
use crate::ProformaResult;

/// Longest hold period accepted.
pub const MAX_HOLD_YEARS: u32 = 100;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The growing inputs of an operating statement for one year.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperatingBasis {
    pub gross_rents: Money,
    /// Parking, storage, laundry/vending and other income
    pub ancillary_income: Money,
    pub fixed_expenses: Money,
}

/// Income and expense stack for one year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OperatingStatement {
    pub total_income: Money,
    /// Vacancy and collection loss, as a positive amount
    pub vacancy_loss: Money,
    pub effective_gross_income: Money,
    pub management: Money,
    pub repairs: Money,
    pub fixed_expenses: Money,
    pub total_expenses: Money,
    pub noi: Money,
}

/// Purchase-level metrics computed from Year-1 inputs only.
///
/// Ratio metrics are `None` when their denominator is zero or not
/// meaningful (e.g. no debt service, no cash invested).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearOneMetrics {
    /// Real purchase price: offer price plus every one-time cost
    pub real_purchase_price: Money,
    pub cash_to_close: Money,
    pub operating: OperatingStatement,
    pub monthly_payment_first: Money,
    pub monthly_payment_second: Money,
    pub annual_debt_service: Money,
    /// NOI less debt service
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
    /// Starting value for appreciation: FMV, or RPP when FMV is unset
    pub value_basis: Money,
    pub principal_paid: Money,
}

// ---------------------------------------------------------------------------
// Operating statement
// ---------------------------------------------------------------------------

impl OperatingBasis {
    /// Year-1 basis straight from the request.
    pub fn from_request(req: &AnalysisRequest) -> Self {
        OperatingBasis {
            gross_rents: req.income.gross_rents,
            ancillary_income: req.income.ancillary(),
            fixed_expenses: req.expenses.fixed_total(),
        }
    }

    /// The following year's basis: income grows with rents, fixed lines
    /// with expenses.
    pub fn grown(&self, rent_growth: Rate, expense_growth: Rate) -> Self {
        let rent_factor = Decimal::ONE + rent_growth;
        OperatingBasis {
            gross_rents: self.gross_rents * rent_factor,
            ancillary_income: self.ancillary_income * rent_factor,
            fixed_expenses: self.fixed_expenses * (Decimal::ONE + expense_growth),
        }
    }

    /// Apply vacancy and the rate-based expense rules to this basis.
    pub fn statement(&self, req: &AnalysisRequest) -> OperatingStatement {
        let total_income = self.gross_rents + self.ancillary_income;
        let vacancy_loss = total_income * req.income.vacancy_rate;
        let effective_gross_income = total_income - vacancy_loss;

        let management_base = match req.expenses.management_base {
            ManagementBase::Egi => effective_gross_income,
            ManagementBase::GrossRents => self.gross_rents,
        };
        let management = req.expenses.management_rate * management_base.max(Decimal::ZERO);
        let repairs = req.expenses.repairs_rate * self.gross_rents;

        let total_expenses = self.fixed_expenses + management + repairs;

        OperatingStatement {
            total_income,
            vacancy_loss,
            effective_gross_income,
            management,
            repairs,
            fixed_expenses: self.fixed_expenses,
            total_expenses,
            noi: effective_gross_income - total_expenses,
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compute Year-1 purchase metrics.
///
/// Structural problems abort on the first one found, naming the field.
pub fn analyze_year_one(req: &AnalysisRequest) -> ProformaResult<YearOneMetrics> {
    validate_request(req)?;

    let rpp = req.property.offer_price + req.purchase.total();
    if rpp < Decimal::ZERO {
        return Err(ProformaError::invalid(
            "real_purchase_price",
            "Real purchase price cannot be negative",
        ));
    }

    let (first, second) = build_mortgages(req)?;
    let operating = OperatingBasis::from_request(req).statement(req);
    let noi = operating.noi;

    let monthly_payment_first = first.as_ref().map_or(Decimal::ZERO, |m| m.monthly_payment_in_year(1));
    let monthly_payment_second = second.as_ref().map_or(Decimal::ZERO, |m| m.monthly_payment_in_year(1));

    let first_y1 = loan_year(first.as_ref(), 1);
    let second_y1 = loan_year(second.as_ref(), 1);
    // Year-1 debt service is the schedule's first twelve payments
    let annual_debt_service = first_y1.debt_service + second_y1.debt_service;
    let principal_paid = first_y1.principal_paid + second_y1.principal_paid;

    let fin = &req.financing;
    let cash_to_close = rpp - fin.total_principal() + fin.other_monthly_financing_costs * dec!(12);
    // Returns on cash invested only make sense for positive cash in.
    let invested = if cash_to_close > Decimal::ZERO {
        Some(cash_to_close)
    } else {
        None
    };

    let fmv = req.property.fair_market_value;
    let has_fmv = fmv > Decimal::ZERO;
    let value_basis = if has_fmv { fmv } else { rpp };

    check_growth(req, operating.total_income, req.projection.rent_growth, "projection.rent_growth")?;
    check_growth(req, operating.fixed_expenses, req.projection.expense_growth, "projection.expense_growth")?;
    check_growth(req, value_basis, req.property.annual_appreciation, "property.annual_appreciation")?;

    let cash_flow = noi - annual_debt_service;
    let cash_on_cash = invested.and_then(|c| ratio(cash_flow, c));
    let equity_roi = invested.and_then(|c| ratio(principal_paid, c));
    let appreciation_roi = invested.and_then(|c| ratio(value_basis * req.property.annual_appreciation, c));
    let forced_appreciation_roi = match invested {
        Some(c) if has_fmv => ratio(fmv - rpp, c),
        _ => None,
    };
    let total_roi = invested.map(|_| {
        [cash_on_cash, equity_roi, appreciation_roi]
            .iter()
            .flatten()
            .copied()
            .sum::<Decimal>()
    });

    let units = Decimal::from(req.property.number_of_units);
    let per_unit = |amount: Money| ratio(amount, units);
    let gross_rents = req.income.gross_rents;

    Ok(YearOneMetrics {
        real_purchase_price: rpp,
        cash_to_close,
        operating,
        monthly_payment_first,
        monthly_payment_second,
        annual_debt_service,
        cash_flow,
        monthly_profit: cash_flow / dec!(12),
        cap_rate_purchase: ratio(noi, rpp),
        cap_rate_fmv: if has_fmv { ratio(noi, fmv) } else { None },
        dscr: ratio(noi, annual_debt_service),
        grm: ratio(rpp, gross_rents),
        cash_on_cash,
        equity_roi,
        appreciation_roi,
        total_roi,
        forced_appreciation_roi,
        avg_rent_per_unit_monthly: if gross_rents > Decimal::ZERO {
            per_unit(gross_rents / dec!(12))
        } else {
            None
        },
        cash_flow_per_unit_monthly: per_unit(cash_flow / dec!(12)),
        ltv_fmv: if has_fmv { ratio(fin.first_mortgage.principal, fmv) } else { None },
        loan_to_purchase_price: ratio(fin.first_mortgage.principal, req.property.offer_price),
        value_basis,
        principal_paid,
    })
}

/// Build the first and (optional) second mortgage from the request.
pub fn build_mortgages(req: &AnalysisRequest) -> ProformaResult<(Option<Mortgage>, Option<Mortgage>)> {
    let first = Mortgage::from_terms(&req.financing.first_mortgage, "financing.first_mortgage")?;
    let second = match req.financing.active_second() {
        Some(terms) => Mortgage::from_terms(terms, "financing.second_mortgage")?,
        None => None,
    };
    Ok((first, second))
}

/// Warnings for unusual Year-1 metrics.
pub fn year_one_warnings(req: &AnalysisRequest, y1: &YearOneMetrics) -> Vec<String> {
    let mut warnings = Vec::new();

    if let Some(dscr) = y1.dscr {
        if dscr < dec!(1.2) {
            warnings.push(format!(
                "DSCR of {:.2} is below 1.20x, lender covenant risk",
                dscr
            ));
        }
    }

    if let Some(ltv) = y1.ltv_fmv {
        if ltv > dec!(0.80) {
            warnings.push(format!(
                "LTV of {:.1}% exceeds 80%, high leverage",
                ltv * dec!(100)
            ));
        }
    }

    if req.income.vacancy_rate > dec!(0.15) {
        warnings.push(format!(
            "Vacancy rate {:.1}% exceeds 15%, above typical market norms",
            req.income.vacancy_rate * dec!(100)
        ));
    }

    if y1.cash_flow < Decimal::ZERO {
        warnings.push(format!(
            "Year 1 cash flow is negative ({:.2}): NOI does not cover debt service",
            y1.cash_flow
        ));
    }

    if y1.cash_to_close <= Decimal::ZERO {
        warnings.push(
            "Cash to close is not positive: cash-on-cash, equity multiple and IRR are not applicable"
                .into(),
        );
    }

    warnings
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_request(req: &AnalysisRequest) -> ProformaResult<()> {
    for (field, amount) in req.money_fields() {
        if amount < Decimal::ZERO {
            return Err(ProformaError::invalid(field, "Amount cannot be negative"));
        }
        if amount > MAX_AMOUNT {
            return Err(ProformaError::invalid(
                field,
                format!("Amount cannot exceed {MAX_AMOUNT}"),
            ));
        }
    }

    if req.projection.hold_years > MAX_HOLD_YEARS {
        return Err(ProformaError::invalid(
            "projection.hold_years",
            format!("Hold period cannot exceed {MAX_HOLD_YEARS} years"),
        ));
    }

    for (field, rate) in req.rate_fields() {
        if rate < Decimal::ZERO || rate > Decimal::ONE {
            return Err(ProformaError::invalid(
                field,
                "Rate must be a decimal between 0 and 1 (e.g. 0.05 for 5%)",
            ));
        }
    }

    Ok(())
}

/// Reject a Year-1 amount that compounds past [`MAX_PROJECTED_AMOUNT`]
/// by the end of the hold. A zero-year hold still sells after one year.
fn check_growth(req: &AnalysisRequest, base: Money, rate: Rate, field: &str) -> ProformaResult<()> {
    let years = req.projection.hold_years.max(1);
    let factor = Decimal::ONE + rate;
    let mut amount = base.abs();
    for _ in 0..years {
        amount = match amount.checked_mul(factor) {
            Some(next) if next <= MAX_PROJECTED_AMOUNT => next,
            _ => {
                return Err(ProformaError::invalid(
                    field,
                    format!("Compounds past {MAX_PROJECTED_AMOUNT} over a {years}-year hold"),
                ))
            }
        };
    }
    Ok(())
}
