use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ProformaError;
use crate::proforma::projection::YearRow;
use crate::time_value::{self, IrrSolution};
use crate::types::{ratio, Money, Multiple, Rate};
use crate::ProformaResult;

/// How the IRR figure came out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrrStatus {
    Converged,
    /// No sign change in the bracket, or the iteration budget ran out
    NoConvergence,
    /// No positive cash invested, so there is no rate to solve for
    NotApplicable,
}

/// Sale of the property at the end of the hold and the resulting returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitReturns {
    pub exit_year: u32,
    pub sale_price_gross: Money,
    pub exit_costs: Money,
    /// Remaining first and second mortgage balances repaid from the sale
    pub loan_payoff: Money,
    /// May be negative when the loans exceed the sale price after costs
    pub sale_proceeds_net: Money,
    /// `[-cash_to_close, cf_1, ..., cf_N + sale_proceeds_net]`
    pub cash_flows: Vec<Money>,
    pub irr: Option<Rate>,
    pub irr_status: IrrStatus,
    pub equity_multiple: Option<Multiple>,
}

/// Sell at the end of the last row and compute IRR and equity multiple.
///
/// `fallback` stands in for the projection when `rows` is empty (a
/// zero-year hold). With neither there is nothing to sell.
pub fn compute_exit(
    rows: &[YearRow],
    fallback: Option<&YearRow>,
    cash_to_close: Money,
    exit_cost_rate: Rate,
) -> ProformaResult<ExitReturns> {
    let held: &[YearRow] = if rows.is_empty() {
        match fallback {
            Some(row) => std::slice::from_ref(row),
            None => {
                return Err(ProformaError::InsufficientData(
                    "Exit requires at least one projected year".into(),
                ))
            }
        }
    } else {
        rows
    };
    let last = &held[held.len() - 1];

    let sale_price_gross = last.property_value;
    let exit_costs = sale_price_gross * exit_cost_rate;
    let loan_payoff = last.ending_balance_first + last.ending_balance_second;
    let sale_proceeds_net = sale_price_gross - exit_costs - loan_payoff;

    let mut cash_flows = Vec::with_capacity(held.len() + 1);
    cash_flows.push(-cash_to_close);
    cash_flows.extend(held.iter().map(|r| r.cash_flow_before_tax));
    if let Some(terminal) = cash_flows.last_mut() {
        *terminal += sale_proceeds_net;
    }

    let (irr, irr_status, equity_multiple) = if cash_to_close > Decimal::ZERO {
        let inflows: Money = cash_flows[1..]
            .iter()
            .filter(|cf| **cf > Decimal::ZERO)
            .copied()
            .sum();
        let (irr, status) = match time_value::irr(&cash_flows)? {
            IrrSolution::Converged { rate, .. } => (Some(rate), IrrStatus::Converged),
            IrrSolution::NoRootInRange | IrrSolution::Exhausted { .. } => {
                (None, IrrStatus::NoConvergence)
            }
        };
        (irr, status, ratio(inflows, cash_to_close))
    } else {
        (None, IrrStatus::NotApplicable, None)
    };

    Ok(ExitReturns {
        exit_year: last.year,
        sale_price_gross,
        exit_costs,
        loan_payoff,
        sale_proceeds_net,
        cash_flows,
        irr,
        irr_status,
        equity_multiple,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn row(year: u32, cash_flow: Money, value: Money, balance: Money) -> YearRow {
        YearRow {
            year,
            total_income: Decimal::ZERO,
            vacancy_loss: Decimal::ZERO,
            effective_gross_income: Decimal::ZERO,
            management: Decimal::ZERO,
            repairs: Decimal::ZERO,
            fixed_expenses: Decimal::ZERO,
            total_expenses: Decimal::ZERO,
            noi: cash_flow,
            debt_service: Decimal::ZERO,
            cash_flow_before_tax: cash_flow,
            ending_balance_first: balance,
            ending_balance_second: Decimal::ZERO,
            property_value: value,
        }
    }

    #[test]
    fn test_sale_proceeds() {
        let rows = vec![
            row(1, dec!(5000), dec!(309000), dec!(237000)),
            row(2, dec!(5500), dec!(318270), dec!(234000)),
        ];
        let exit = compute_exit(&rows, None, dec!(60000), dec!(0.06)).unwrap();
        assert_eq!(exit.exit_year, 2);
        assert_eq!(exit.sale_price_gross, dec!(318270));
        assert_eq!(exit.exit_costs, dec!(19096.20));
        assert_eq!(exit.loan_payoff, dec!(234000));
        assert_eq!(exit.sale_proceeds_net, dec!(65173.80));
        assert_eq!(
            exit.cash_flows,
            vec![dec!(-60000), dec!(5000), dec!(5500) + dec!(65173.80)]
        );
    }

    #[test]
    fn test_irr_converges_on_typical_hold() {
        // Large outlay, modest yearly income, big terminal sale
        let mut rows: Vec<YearRow> = (1..=9)
            .map(|y| row(y, dec!(4000), dec!(0), dec!(0)))
            .collect();
        rows.push(row(10, dec!(4000), dec!(200000), dec!(80000)));
        let exit = compute_exit(&rows, None, dec!(60000), Decimal::ZERO).unwrap();
        assert_eq!(exit.irr_status, IrrStatus::Converged);
        let irr = exit.irr.unwrap();
        assert!(irr > Decimal::ZERO && irr < dec!(0.5), "IRR {irr}");
        let npv = time_value::npv(irr, &exit.cash_flows).unwrap();
        assert!(npv.abs() < dec!(1), "NPV at IRR was {npv}");
    }

    #[test]
    fn test_equity_multiple_counts_positive_flows_only() {
        let rows = vec![
            row(1, dec!(-2000), dec!(0), dec!(0)),
            row(2, dec!(3000), dec!(0), dec!(0)),
            row(3, dec!(1000), dec!(120000), dec!(0)),
        ];
        let exit = compute_exit(&rows, None, dec!(100000), Decimal::ZERO).unwrap();
        // (3000 + 121000) / 100000
        assert_eq!(exit.equity_multiple, Some(dec!(1.24)));
    }

    #[test]
    fn test_underwater_sale_no_convergence() {
        let rows = vec![row(1, dec!(-1000), dec!(100000), dec!(150000))];
        let exit = compute_exit(&rows, None, dec!(20000), Decimal::ZERO).unwrap();
        assert!(exit.sale_proceeds_net < Decimal::ZERO);
        assert_eq!(exit.irr, None);
        assert_eq!(exit.irr_status, IrrStatus::NoConvergence);
        assert_eq!(exit.equity_multiple, Some(Decimal::ZERO));
    }

    #[test]
    fn test_no_cash_invested_not_applicable() {
        let rows = vec![row(1, dec!(1000), dec!(100000), dec!(90000))];
        let exit = compute_exit(&rows, None, Decimal::ZERO, dec!(0.06)).unwrap();
        assert_eq!(exit.irr, None);
        assert_eq!(exit.irr_status, IrrStatus::NotApplicable);
        assert_eq!(exit.equity_multiple, None);
        assert_eq!(exit.sale_proceeds_net, dec!(4000));
    }

    #[test]
    fn test_fallback_row_used_for_zero_hold() {
        let fallback = row(1, dec!(6000), dec!(110000), dec!(0));
        let exit = compute_exit(&[], Some(&fallback), dec!(100000), Decimal::ZERO).unwrap();
        assert_eq!(exit.exit_year, 1);
        assert_eq!(exit.cash_flows, vec![dec!(-100000), dec!(116000)]);
        assert!((exit.irr.unwrap() - dec!(0.16)).abs() < dec!(0.00001));
    }

    #[test]
    fn test_fallback_ignored_when_rows_present() {
        let rows = vec![row(1, dec!(1000), dec!(50000), dec!(0))];
        let fallback = row(1, dec!(9999), dec!(99999), dec!(0));
        let exit = compute_exit(&rows, Some(&fallback), dec!(40000), Decimal::ZERO).unwrap();
        assert_eq!(exit.sale_price_gross, dec!(50000));
    }

    #[test]
    fn test_nothing_to_sell() {
        let err = compute_exit(&[], None, dec!(1000), Decimal::ZERO).unwrap_err();
        assert!(matches!(err, ProformaError::InsufficientData(_)));
    }

    #[test]
    fn test_irr_status_serializes_snake_case() {
        let json = serde_json::to_string(&IrrStatus::NoConvergence).unwrap();
        assert_eq!(json, "\"no_convergence\"");
    }
}
