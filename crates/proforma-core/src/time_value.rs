use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::ProformaError;
use crate::types::{Money, Rate};
use crate::ProformaResult;

/// Convergence tolerance on the rate for the IRR solver.
pub const IRR_TOLERANCE: Decimal = dec!(0.000001);
/// Iteration cap for the IRR solver. Bisection over the full bracket
/// reaches [`IRR_TOLERANCE`] in about 24 steps, so the cap only guards
/// against a non-terminating loop.
pub const MAX_IRR_ITERATIONS: u32 = 200;
/// Lower end of the IRR search bracket (-99%).
pub const IRR_LOWER_BOUND: Rate = dec!(-0.99);
/// Upper end of the IRR search bracket (+1000%).
pub const IRR_UPPER_BOUND: Rate = dec!(10.0);

/// Outcome of the IRR root search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrrSolution {
    Converged { rate: Rate, iterations: u32 },
    /// NPV has the same sign at both ends of the bracket.
    NoRootInRange,
    /// The bracket was still wider than the tolerance when the iteration
    /// cap was hit. Unreachable with the current bracket and tolerance.
    Exhausted { best: Rate },
}

impl IrrSolution {
    pub fn rate(&self) -> Option<Rate> {
        match self {
            IrrSolution::Converged { rate, .. } => Some(*rate),
            _ => None,
        }
    }
}

/// Net Present Value of a series of cash flows
pub fn npv(rate: Rate, cash_flows: &[Money]) -> ProformaResult<Money> {
    if rate <= dec!(-1) {
        return Err(ProformaError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    let mut result = Decimal::ZERO;
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = discount
                .checked_mul(one_plus_r)
                .ok_or_else(|| npv_overflow(t))?;
        }
        if discount.is_zero() {
            return Err(ProformaError::DivisionByZero {
                context: format!("NPV discount factor at period {t}"),
            });
        }
        result = cf
            .checked_div(discount)
            .and_then(|pv| result.checked_add(pv))
            .ok_or_else(|| npv_overflow(t))?;
    }

    Ok(result)
}

fn npv_overflow(period: usize) -> ProformaError {
    ProformaError::invalid(
        "rate",
        format!("NPV exceeds the representable range at period {period}"),
    )
}

/// Level payment that fully amortises `principal` over `nper` periods at
/// `rate` per period: `P·r / (1 − (1+r)^−n)`, or `P/n` when `rate` is zero.
///
/// Returned as a positive amount.
pub fn pmt(rate: Rate, nper: u32, principal: Money) -> ProformaResult<Money> {
    if nper == 0 {
        return Err(ProformaError::InvalidInput {
            field: "nper".into(),
            reason: "Number of periods must be > 0".into(),
        });
    }

    if rate.is_zero() {
        return Ok(principal / Decimal::from(nper));
    }

    // (1 + r)^n via iterative multiplication
    let one_plus_r = Decimal::ONE + rate;
    let overflow = || ProformaError::invalid("nper", "Compounded rate exceeds the representable range");
    let mut compound = Decimal::ONE;
    for _ in 0..nper {
        compound = compound.checked_mul(one_plus_r).ok_or_else(overflow)?;
    }

    let denominator = compound - Decimal::ONE;
    if denominator.is_zero() {
        return Err(ProformaError::DivisionByZero {
            context: "PMT annuity factor".into(),
        });
    }

    // Payment per unit of principal first, so a large principal never
    // meets the raw compound factor
    rate.checked_mul(compound)
        .map(|scaled| scaled / denominator)
        .and_then(|per_unit| principal.checked_mul(per_unit))
        .ok_or_else(overflow)
}

/// Internal Rate of Return by bisection over [`IRR_LOWER_BOUND`, `IRR_UPPER_BOUND`].
///
/// Never fails on non-convergence: the caller gets an [`IrrSolution`] and
/// decides how to report it.
pub fn irr(cash_flows: &[Money]) -> ProformaResult<IrrSolution> {
    if cash_flows.len() < 2 {
        return Err(ProformaError::InsufficientData(
            "IRR requires at least 2 cash flows".into(),
        ));
    }
    // Every partial NPV sum is bounded by the sum of magnitudes
    if cash_flows
        .iter()
        .try_fold(Decimal::ZERO, |acc, cf| acc.checked_add(cf.abs()))
        .is_none()
    {
        return Err(ProformaError::invalid(
            "cash_flows",
            "Cash flows exceed the representable range",
        ));
    }

    let mut lo = IRR_LOWER_BOUND;
    let mut hi = IRR_UPPER_BOUND;
    let f_lo = npv_sign(lo, cash_flows);
    let f_hi = npv_sign(hi, cash_flows);

    if f_lo == 0 {
        return Ok(IrrSolution::Converged { rate: lo, iterations: 0 });
    }
    if f_hi == 0 {
        return Ok(IrrSolution::Converged { rate: hi, iterations: 0 });
    }
    if f_lo == f_hi {
        return Ok(IrrSolution::NoRootInRange);
    }

    for i in 1..=MAX_IRR_ITERATIONS {
        let mid = (lo + hi) / dec!(2);
        let f_mid = npv_sign(mid, cash_flows);

        if f_mid == 0 || (hi - lo) / dec!(2) < IRR_TOLERANCE {
            return Ok(IrrSolution::Converged {
                rate: mid,
                iterations: i,
            });
        }

        if f_mid == f_lo {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    Ok(IrrSolution::Exhausted {
        best: (lo + hi) / dec!(2),
    })
}

/// Sign of NPV(rate) without overflowing at either end of the bracket.
///
/// For `rate >= 0` the flows are discounted to t=0. For negative rates the
/// discount factors exceed one and explode, so the flows are compounded to
/// the horizon instead. Both sums differ by the positive factor `(1+r)^N`
/// and therefore share sign and roots.
fn npv_sign(rate: Rate, cash_flows: &[Money]) -> i8 {
    let one_plus_r = Decimal::ONE + rate;
    let mut total = Decimal::ZERO;

    if rate >= Decimal::ZERO {
        let mut factor = Decimal::ONE;
        for cf in cash_flows {
            total += *cf * factor;
            factor /= one_plus_r;
        }
    } else {
        let mut factor = Decimal::ONE;
        for cf in cash_flows.iter().rev() {
            total += *cf * factor;
            factor *= one_plus_r;
        }
    }

    if total.is_zero() {
        0
    } else if total.is_sign_positive() {
        1
    } else {
        -1
    }
}
