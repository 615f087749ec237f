use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use proforma_core::proforma::amortization::{LoanYear, Mortgage};
use proforma_core::proforma::request::MortgageTerms;
use proforma_core::time_value::{self, IrrSolution};

/// Arguments for the mortgage payment calculator
#[derive(Args)]
pub struct PaymentArgs {
    /// Loan principal
    #[arg(long)]
    pub principal: Decimal,

    /// Annual interest rate as a decimal (0.07 = 7%)
    #[arg(long)]
    pub rate: Decimal,

    /// Loan term in years
    #[arg(long, default_value_t = 30)]
    pub years: u32,

    /// Leading interest-only years within the term
    #[arg(long, default_value_t = 0)]
    pub interest_only_years: u32,

    /// Include the year-by-year amortization schedule
    #[arg(long)]
    pub schedule: bool,
}

pub fn run_payment(args: PaymentArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let terms = MortgageTerms {
        principal: args.principal,
        annual_rate: args.rate,
        amortization_years: args.years,
        interest_only_years: args.interest_only_years,
    };
    let mortgage =
        Mortgage::from_terms(&terms, "loan")?.ok_or("--principal must be greater than zero")?;

    let schedule: Vec<LoanYear> = mortgage.schedule().collect();
    let total_paid: Decimal = schedule.iter().map(|y| y.debt_service).sum();
    let total_interest: Decimal = schedule.iter().map(|y| y.interest).sum();

    let mut out = json!({
        "monthly_payment": mortgage.monthly_payment_in_year(1),
        "amortizing_payment": mortgage.amortizing_payment(),
        "term_months": mortgage.term_months(),
        "total_paid": total_paid,
        "total_interest": total_interest,
    });
    if args.schedule {
        out["schedule"] = serde_json::to_value(&schedule)?;
    }
    Ok(json!({ "result": out }))
}

/// Arguments for the IRR calculator
#[derive(Args)]
pub struct IrrArgs {
    /// Periodic cash flows, first is the outlay (comma-separated, e.g. "-100,30,30,130")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    pub cash_flows: Vec<Decimal>,
}

pub fn run_irr(args: IrrArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let solution = time_value::irr(&args.cash_flows)?;
    tracing::debug!(?solution, "irr solved");

    let out = match solution {
        IrrSolution::Converged { rate, iterations } => json!({
            "irr": rate,
            "status": "converged",
            "iterations": iterations,
            "npv_at_irr": time_value::npv(rate, &args.cash_flows).ok(),
        }),
        IrrSolution::NoRootInRange => json!({
            "irr": Value::Null,
            "status": "no_convergence",
            "reason": "NPV does not change sign between -99% and 1000%",
        }),
        IrrSolution::Exhausted { best } => json!({
            "irr": Value::Null,
            "status": "no_convergence",
            "reason": format!("Iteration budget exhausted near {best}"),
        }),
    };
    Ok(json!({ "result": out }))
}
