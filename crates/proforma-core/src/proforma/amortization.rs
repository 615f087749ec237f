use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ProformaError;
use crate::proforma::request::MortgageTerms;
use crate::time_value;
use crate::types::{Money, Rate, MAX_AMOUNT};
use crate::ProformaResult;

const MONTHS_PER_YEAR: u32 = 12;

/// Longest loan term accepted, interest-only years included.
pub const MAX_AMORTIZATION_YEARS: u32 = 50;

/// A fixed-rate mortgage, optionally interest-only for its first years.
///
/// Payments are monthly. The interest-only period is part of the term; the
/// amortising payment retires the principal over the months left after it.
#[derive(Debug, Clone, PartialEq)]
pub struct Mortgage {
    principal: Money,
    monthly_rate: Rate,
    interest_only_months: u32,
    amortizing_months: u32,
    interest_only_payment: Money,
    amortizing_payment: Money,
}

/// One year of a mortgage's schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanYear {
    pub year: u32,
    pub opening_balance: Money,
    pub interest: Money,
    pub principal_paid: Money,
    pub debt_service: Money,
    pub closing_balance: Money,
}

impl Mortgage {
    /// Build a mortgage from its terms. `label` prefixes field names in
    /// errors (e.g. `financing.first_mortgage`).
    ///
    /// Returns `Ok(None)` for a loan with no principal.
    pub fn from_terms(terms: &MortgageTerms, label: &str) -> ProformaResult<Option<Self>> {
        if terms.principal < Decimal::ZERO {
            return Err(ProformaError::invalid(
                &format!("{label}.principal"),
                "Principal cannot be negative",
            ));
        }
        if terms.principal > MAX_AMOUNT {
            return Err(ProformaError::invalid(
                &format!("{label}.principal"),
                format!("Principal cannot exceed {MAX_AMOUNT}"),
            ));
        }
        if terms.principal.is_zero() {
            return Ok(None);
        }
        if terms.amortization_years == 0 {
            return Err(ProformaError::invalid(
                &format!("{label}.amortization_years"),
                "Amortization period must be at least 1 year",
            ));
        }
        if terms.amortization_years > MAX_AMORTIZATION_YEARS {
            return Err(ProformaError::invalid(
                &format!("{label}.amortization_years"),
                format!("Amortization period cannot exceed {MAX_AMORTIZATION_YEARS} years"),
            ));
        }
        if terms.interest_only_years >= terms.amortization_years {
            return Err(ProformaError::invalid(
                &format!("{label}.interest_only_years"),
                "Interest-only period must be shorter than the amortization period",
            ));
        }
        if terms.annual_rate < Decimal::ZERO || terms.annual_rate > Decimal::ONE {
            return Err(ProformaError::invalid(
                &format!("{label}.annual_rate"),
                "Interest rate must be a decimal between 0 and 1",
            ));
        }

        let monthly_rate = terms.annual_rate / dec!(12);
        let interest_only_months = terms.interest_only_years * MONTHS_PER_YEAR;
        let amortizing_months = terms.amortization_years * MONTHS_PER_YEAR - interest_only_months;
        let amortizing_payment = time_value::pmt(monthly_rate, amortizing_months, terms.principal)?;

        Ok(Some(Mortgage {
            principal: terms.principal,
            monthly_rate,
            interest_only_months,
            amortizing_months,
            interest_only_payment: terms.principal * monthly_rate,
            amortizing_payment,
        }))
    }

    pub fn principal(&self) -> Money {
        self.principal
    }

    /// Total life of the loan in months.
    pub fn term_months(&self) -> u32 {
        self.interest_only_months + self.amortizing_months
    }

    /// Scheduled payment for a 1-based month; zero once the term is over.
    pub fn payment_for_month(&self, month: u32) -> Money {
        if month == 0 || month > self.term_months() {
            Decimal::ZERO
        } else if month <= self.interest_only_months {
            self.interest_only_payment
        } else {
            self.amortizing_payment
        }
    }

    /// Payment in the first month of a 1-based year.
    pub fn monthly_payment_in_year(&self, year: u32) -> Money {
        self.payment_for_month((year.max(1) - 1) * MONTHS_PER_YEAR + 1)
    }

    /// The level amortising payment.
    pub fn amortizing_payment(&self) -> Money {
        self.amortizing_payment
    }

    /// Year-by-year schedule. The iterator ends when the loan's term does.
    pub fn schedule(&self) -> LoanSchedule {
        LoanSchedule {
            mortgage: self.clone(),
            balance: self.principal,
            month: 0,
        }
    }
}

impl LoanYear {
    /// A year with nothing owed and nothing paid.
    pub fn paid_off(year: u32) -> Self {
        LoanYear {
            year,
            opening_balance: Decimal::ZERO,
            interest: Decimal::ZERO,
            principal_paid: Decimal::ZERO,
            debt_service: Decimal::ZERO,
            closing_balance: Decimal::ZERO,
        }
    }
}

/// Iterator over the years of a [`Mortgage`], stepping the balance monthly.
#[derive(Debug, Clone)]
pub struct LoanSchedule {
    mortgage: Mortgage,
    balance: Money,
    month: u32,
}

impl Iterator for LoanSchedule {
    type Item = LoanYear;

    fn next(&mut self) -> Option<LoanYear> {
        if self.month >= self.mortgage.term_months() {
            return None;
        }

        let year = self.month / MONTHS_PER_YEAR + 1;
        let opening_balance = self.balance;
        let mut interest = Decimal::ZERO;
        let mut debt_service = Decimal::ZERO;

        for _ in 0..MONTHS_PER_YEAR {
            self.month += 1;
            let payment = self.mortgage.payment_for_month(self.month);
            debt_service += payment;

            let month_interest = self.balance * self.mortgage.monthly_rate;
            interest += month_interest;
            self.balance = self.balance + month_interest - payment;
            if self.balance <= Decimal::ZERO {
                self.balance = Decimal::ZERO;
            }
        }

        Some(LoanYear {
            year,
            opening_balance,
            interest,
            principal_paid: opening_balance - self.balance,
            debt_service,
            closing_balance: self.balance,
        })
    }
}

/// Closing balance and debt service of an optional loan in a given year.
///
/// Years past the loan's term report a zero balance and zero debt service.
pub(crate) fn loan_year(loan: Option<&Mortgage>, year: u32) -> LoanYear {
    loan.and_then(|m| m.schedule().nth(year.saturating_sub(1) as usize))
        .unwrap_or_else(|| LoanYear::paid_off(year))
}
