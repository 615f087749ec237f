use std::iter::FusedIterator;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ProformaError;
use crate::proforma::amortization::{LoanSchedule, LoanYear};
use crate::proforma::analysis::{build_mortgages, OperatingBasis, YearOneMetrics};
use crate::proforma::request::AnalysisRequest;
use crate::types::Money;
use crate::ProformaResult;

/// One projected year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearRow {
    pub year: u32,
    pub total_income: Money,
    /// Vacancy and collection loss, as a positive amount
    pub vacancy_loss: Money,
    pub effective_gross_income: Money,
    pub management: Money,
    pub repairs: Money,
    pub fixed_expenses: Money,
    pub total_expenses: Money,
    pub noi: Money,
    pub debt_service: Money,
    pub cash_flow_before_tax: Money,
    pub ending_balance_first: Money,
    pub ending_balance_second: Money,
    pub property_value: Money,
}

/// Year-by-year projection over a fixed horizon.
///
/// Each step grows the operating basis, advances both loan schedules by
/// twelve months and appreciates the property. Once exhausted it stays
/// exhausted.
#[derive(Debug, Clone)]
pub struct Projector<'a> {
    req: &'a AnalysisRequest,
    basis: OperatingBasis,
    first: Option<LoanSchedule>,
    second: Option<LoanSchedule>,
    property_value: Money,
    year: u32,
    horizon: u32,
}

impl<'a> Projector<'a> {
    pub fn new(
        req: &'a AnalysisRequest,
        year_one: &YearOneMetrics,
        horizon: u32,
    ) -> ProformaResult<Self> {
        let (first, second) = build_mortgages(req)?;
        Ok(Projector {
            req,
            basis: OperatingBasis::from_request(req),
            first: first.map(|m| m.schedule()),
            second: second.map(|m| m.schedule()),
            property_value: year_one.value_basis,
            year: 0,
            horizon,
        })
    }
}

fn advance(schedule: &mut Option<LoanSchedule>, year: u32) -> LoanYear {
    schedule
        .as_mut()
        .and_then(Iterator::next)
        .unwrap_or_else(|| LoanYear::paid_off(year))
}

impl Iterator for Projector<'_> {
    type Item = YearRow;

    fn next(&mut self) -> Option<YearRow> {
        if self.year >= self.horizon {
            return None;
        }
        self.year += 1;

        let params = &self.req.projection;
        if self.year > 1 {
            self.basis = self.basis.grown(params.rent_growth, params.expense_growth);
        }
        let op = self.basis.statement(self.req);

        let first = advance(&mut self.first, self.year);
        let second = advance(&mut self.second, self.year);
        let debt_service = first.debt_service + second.debt_service;

        self.property_value *= Decimal::ONE + self.req.property.annual_appreciation;

        Some(YearRow {
            year: self.year,
            total_income: op.total_income,
            vacancy_loss: op.vacancy_loss,
            effective_gross_income: op.effective_gross_income,
            management: op.management,
            repairs: op.repairs,
            fixed_expenses: op.fixed_expenses,
            total_expenses: op.total_expenses,
            noi: op.noi,
            debt_service,
            cash_flow_before_tax: op.noi - debt_service,
            ending_balance_first: first.closing_balance,
            ending_balance_second: second.closing_balance,
            property_value: self.property_value,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.horizon.saturating_sub(self.year) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Projector<'_> {}
impl FusedIterator for Projector<'_> {}

/// Project every year of the hold period. An empty vector for a zero-year hold.
pub fn project_years(
    req: &AnalysisRequest,
    year_one: &YearOneMetrics,
) -> ProformaResult<Vec<YearRow>> {
    Ok(Projector::new(req, year_one, req.projection.hold_years)?.collect())
}

/// The Year-1 row on its own. Exit figures fall back to it when the hold
/// period is zero; it is never part of the projection.
pub fn year_one_row(req: &AnalysisRequest, year_one: &YearOneMetrics) -> ProformaResult<YearRow> {
    Projector::new(req, year_one, 1)?
        .next()
        .ok_or_else(|| ProformaError::InsufficientData("No Year-1 row could be projected".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proforma::analysis::analyze_year_one;
    use crate::proforma::request::*;
    use rust_decimal_macros::dec;

    fn sample_request(hold_years: u32) -> AnalysisRequest {
        AnalysisRequest {
            property: PropertyInfo {
                address: "400 Oak Ave".into(),
                city: "Columbus".into(),
                state: "OH".into(),
                zip: "43215".into(),
                fair_market_value: dec!(420000),
                offer_price: dec!(400000),
                number_of_units: 4,
                annual_appreciation: dec!(0.03),
            },
            purchase: PurchaseCosts {
                repairs: dec!(15000),
                ..Default::default()
            },
            financing: Financing {
                first_mortgage: MortgageTerms {
                    principal: dec!(300000),
                    annual_rate: dec!(0.065),
                    amortization_years: 5,
                    interest_only_years: 0,
                },
                ..Default::default()
            },
            income: IncomeTerms {
                gross_rents: dec!(48000),
                parking: dec!(1200),
                storage: Decimal::ZERO,
                laundry_vending: Decimal::ZERO,
                other_income: Decimal::ZERO,
                vacancy_rate: dec!(0.05),
            },
            expenses: OperatingExpenses {
                property_taxes: dec!(6000),
                insurance: dec!(2000),
                management_rate: dec!(0.08),
                repairs_rate: dec!(0.05),
                ..Default::default()
            },
            projection: ProjectionParams {
                hold_years,
                rent_growth: dec!(0.03),
                expense_growth: dec!(0.02),
                exit_cost_rate: dec!(0.06),
            },
        }
    }

    fn project(req: &AnalysisRequest) -> Vec<YearRow> {
        let y1 = analyze_year_one(req).unwrap();
        project_years(req, &y1).unwrap()
    }

    #[test]
    fn test_row_count_and_order() {
        let rows = project(&sample_request(7));
        assert_eq!(rows.len(), 7);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.year, i as u32 + 1);
        }
    }

    #[test]
    fn test_zero_hold_is_empty() {
        assert!(project(&sample_request(0)).is_empty());
    }

    #[test]
    fn test_year_one_matches_static_analysis() {
        let req = sample_request(3);
        let y1 = analyze_year_one(&req).unwrap();
        let rows = project_years(&req, &y1).unwrap();
        assert_eq!(rows[0].noi, y1.operating.noi);
        assert_eq!(rows[0].debt_service, y1.annual_debt_service);
        assert_eq!(rows[0].cash_flow_before_tax, y1.cash_flow);
    }

    #[test]
    fn test_year_one_row_ignores_hold() {
        let req = sample_request(0);
        let y1 = analyze_year_one(&req).unwrap();
        let row = year_one_row(&req, &y1).unwrap();
        assert_eq!(row.year, 1);
        assert_eq!(row.noi, y1.operating.noi);
        assert_eq!(row, project(&sample_request(1))[0]);
    }

    #[test]
    fn test_growth_applied() {
        let rows = project(&sample_request(2));
        assert_eq!(rows[0].total_income, dec!(49200));
        assert_eq!(rows[1].total_income, dec!(49200) * dec!(1.03));
        assert_eq!(rows[1].fixed_expenses, dec!(8000) * dec!(1.02));
        // Repairs track year-2 gross rents
        assert_eq!(rows[1].repairs, dec!(0.05) * dec!(48000) * dec!(1.03));
    }

    #[test]
    fn test_income_strictly_increasing_with_rent_growth() {
        let mut req = sample_request(10);
        req.projection.expense_growth = Decimal::ZERO;
        let rows = project(&req);
        for pair in rows.windows(2) {
            assert!(pair[1].total_income > pair[0].total_income);
            assert!(pair[1].effective_gross_income > pair[0].effective_gross_income);
        }
    }

    #[test]
    fn test_debt_service_stops_after_term() {
        let rows = project(&sample_request(8));
        let ds = rows[0].debt_service;
        for row in &rows[..5] {
            assert_eq!(row.debt_service, ds);
        }
        assert!(rows[4].ending_balance_first < dec!(0.01));
        for row in &rows[5..] {
            assert_eq!(row.debt_service, Decimal::ZERO);
            assert_eq!(row.ending_balance_first, Decimal::ZERO);
            assert_eq!(row.cash_flow_before_tax, row.noi);
        }
    }

    #[test]
    fn test_property_value_compounds_from_fmv() {
        let rows = project(&sample_request(2));
        assert_eq!(rows[0].property_value, dec!(420000) * dec!(1.03));
        assert_eq!(rows[1].property_value, dec!(420000) * dec!(1.03) * dec!(1.03));
    }

    #[test]
    fn test_property_value_falls_back_to_rpp() {
        let mut req = sample_request(1);
        req.property.fair_market_value = Decimal::ZERO;
        let rows = project(&req);
        assert_eq!(rows[0].property_value, dec!(415000) * dec!(1.03));
    }

    #[test]
    fn test_second_mortgage_balance_tracked() {
        let mut req = sample_request(3);
        req.financing.second_mortgage = Some(MortgageTerms {
            principal: dec!(40000),
            annual_rate: dec!(0.08),
            amortization_years: 10,
            interest_only_years: 0,
        });
        let rows = project(&req);
        assert!(rows[0].ending_balance_second < dec!(40000));
        assert!(rows[2].ending_balance_second < rows[0].ending_balance_second);
    }

    #[test]
    fn test_projector_is_exact_size_and_fused() {
        let req = sample_request(3);
        let y1 = analyze_year_one(&req).unwrap();
        let mut projector = Projector::new(&req, &y1, 3).unwrap();
        assert_eq!(projector.len(), 3);
        assert!(projector.by_ref().take(3).count() == 3);
        assert!(projector.next().is_none());
        assert!(projector.next().is_none());
    }
}
