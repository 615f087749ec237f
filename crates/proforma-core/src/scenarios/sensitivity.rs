use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::ProformaError;
use crate::proforma::pipeline::{analyze_property, AnalysisSummary};
use crate::proforma::request::AnalysisRequest;
use crate::types::*;
use crate::ProformaResult;

/// Upper bound on sweep points per axis.
const MAX_SWEEP_VALUES: usize = 101;

/// Request field a sensitivity axis varies. Rates are decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepField {
    OfferPrice,
    GrossRents,
    VacancyRate,
    /// First-mortgage annual rate
    InterestRate,
    RentGrowth,
    ExpenseGrowth,
    Appreciation,
    ExitCostRate,
    HoldYears,
}

/// Summary figure reported in each cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMetric {
    Irr,
    CashOnCash,
    Dscr,
    Noi,
    CapRate,
    EquityMultiple,
    SaleProceedsNet,
}

/// One axis of the grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityVariable {
    pub field: SweepField,
    pub min: Decimal,
    pub max: Decimal,
    pub step: Decimal,
}

/// Input for 2-way sensitivity analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityInput {
    /// Base case request; each cell overrides the two swept fields
    pub base: AnalysisRequest,
    pub variable_1: SensitivityVariable,
    pub variable_2: SensitivityVariable,
    pub output_metric: OutputMetric,
}

/// Output of 2-way sensitivity analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityOutput {
    pub variable_1: SweepField,
    pub variable_2: SweepField,
    pub variable_1_values: Vec<Decimal>,
    pub variable_2_values: Vec<Decimal>,
    pub output_metric: OutputMetric,
    /// Matrix[i][j] = metric when variable_1 = variable_1_values[i] and
    /// variable_2 = variable_2_values[j]; `None` where the metric is not
    /// applicable or the run failed
    pub matrix: Vec<Vec<Option<Decimal>>>,
    /// Metric for the unmodified base request
    pub base_case_value: Option<Decimal>,
    /// Grid cell closest to the base request's own values (row, col)
    pub base_case_position: (usize, usize),
}

impl SweepField {
    /// Current value of this field in `req`.
    pub fn current(self, req: &AnalysisRequest) -> Decimal {
        match self {
            SweepField::OfferPrice => req.property.offer_price,
            SweepField::GrossRents => req.income.gross_rents,
            SweepField::VacancyRate => req.income.vacancy_rate,
            SweepField::InterestRate => req.financing.first_mortgage.annual_rate,
            SweepField::RentGrowth => req.projection.rent_growth,
            SweepField::ExpenseGrowth => req.projection.expense_growth,
            SweepField::Appreciation => req.property.annual_appreciation,
            SweepField::ExitCostRate => req.projection.exit_cost_rate,
            SweepField::HoldYears => Decimal::from(req.projection.hold_years),
        }
    }

    /// Overwrite this field in `req`.
    pub fn apply(self, req: &mut AnalysisRequest, value: Decimal) -> ProformaResult<()> {
        match self {
            SweepField::OfferPrice => req.property.offer_price = value,
            SweepField::GrossRents => req.income.gross_rents = value,
            SweepField::VacancyRate => req.income.vacancy_rate = value,
            SweepField::InterestRate => req.financing.first_mortgage.annual_rate = value,
            SweepField::RentGrowth => req.projection.rent_growth = value,
            SweepField::ExpenseGrowth => req.projection.expense_growth = value,
            SweepField::Appreciation => req.property.annual_appreciation = value,
            SweepField::ExitCostRate => req.projection.exit_cost_rate = value,
            SweepField::HoldYears => {
                req.projection.hold_years = whole_years(value).ok_or_else(|| {
                    ProformaError::invalid("hold_years", "Hold period must be a whole number of years")
                })?;
            }
        }
        Ok(())
    }
}

impl OutputMetric {
    pub fn read(self, summary: &AnalysisSummary) -> Option<Decimal> {
        match self {
            OutputMetric::Irr => summary.irr,
            OutputMetric::CashOnCash => summary.cash_on_cash,
            OutputMetric::Dscr => summary.dscr,
            OutputMetric::Noi => Some(summary.noi),
            OutputMetric::CapRate => summary.cap_rate_purchase,
            OutputMetric::EquityMultiple => summary.equity_multiple,
            OutputMetric::SaleProceedsNet => Some(summary.sale_proceeds_net),
        }
    }
}

fn whole_years(value: Decimal) -> Option<u32> {
    if value.fract().is_zero() {
        value.to_u32()
    } else {
        None
    }
}

/// Generate the sweep values for a sensitivity variable from min to max with step.
fn generate_sweep_values(var: &SensitivityVariable) -> ProformaResult<Vec<Decimal>> {
    let field = format!("variable:{}", serde_json::to_string(&var.field)?.trim_matches('"'));
    if var.step <= Decimal::ZERO {
        return Err(ProformaError::invalid(&field, "Step must be positive"));
    }
    if var.min > var.max {
        return Err(ProformaError::invalid(&field, "Min must be <= max"));
    }
    if var.field == SweepField::HoldYears
        && (whole_years(var.min).is_none() || whole_years(var.step).is_none())
    {
        return Err(ProformaError::invalid(
            &field,
            "Hold years must sweep whole, non-negative years",
        ));
    }

    let mut values = Vec::new();
    let mut current = var.min;
    while current <= var.max {
        if values.len() == MAX_SWEEP_VALUES {
            return Err(ProformaError::invalid(
                &field,
                format!("Sweep exceeds {MAX_SWEEP_VALUES} values; widen the step"),
            ));
        }
        values.push(current);
        current += var.step;
    }
    // Ensure max is included if step doesn't land exactly on it
    if let Some(&last) = values.last() {
        if last < var.max && var.field != SweepField::HoldYears {
            values.push(var.max);
        }
    }

    Ok(values)
}

/// Find the closest index to a target value in a sorted list.
fn closest_index(values: &[Decimal], target: Decimal) -> usize {
    values
        .iter()
        .enumerate()
        .min_by_key(|(_, v)| (**v - target).abs())
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Re-run the pro forma over a grid of two swept request fields.
///
/// A cell whose run fails, or whose metric is not applicable, is `None`
/// and adds a warning. The base request itself must be valid.
pub fn run_sensitivity(input: &SensitivityInput) -> ProformaResult<ComputationOutput<SensitivityOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.variable_1.field == input.variable_2.field {
        return Err(ProformaError::invalid(
            "variable_2",
            "The two sweep variables must be different fields",
        ));
    }

    let v1_values = generate_sweep_values(&input.variable_1)?;
    let v2_values = generate_sweep_values(&input.variable_2)?;

    let base_summary = analyze_property(&input.base)?.result.summary;
    let base_case_value = input.output_metric.read(&base_summary);

    let mut matrix = Vec::with_capacity(v1_values.len());
    for v1 in &v1_values {
        let mut row = Vec::with_capacity(v2_values.len());
        for v2 in &v2_values {
            match evaluate_cell(input, *v1, *v2) {
                Ok(Some(val)) => row.push(Some(val)),
                Ok(None) => {
                    warnings.push(format!("Metric not applicable at ({v1}, {v2})"));
                    row.push(None);
                }
                Err(e) => {
                    warnings.push(format!("Evaluation failed at ({v1}, {v2}): {e}"));
                    row.push(None);
                }
            }
        }
        matrix.push(row);
    }

    let base_row = closest_index(&v1_values, input.variable_1.field.current(&input.base));
    let base_col = closest_index(&v2_values, input.variable_2.field.current(&input.base));

    let output = SensitivityOutput {
        variable_1: input.variable_1.field,
        variable_2: input.variable_2.field,
        variable_1_values: v1_values,
        variable_2_values: v2_values,
        output_metric: input.output_metric,
        matrix,
        base_case_value,
        base_case_position: (base_row, base_col),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "2-Way Sensitivity Analysis (Pro Forma)",
        &serde_json::json!({
            "variable_1": input.variable_1.field,
            "variable_2": input.variable_2.field,
            "output_metric": input.output_metric,
            "hold_years": input.base.projection.hold_years,
        }),
        warnings,
        elapsed,
        output,
    ))
}

fn evaluate_cell(input: &SensitivityInput, v1: Decimal, v2: Decimal) -> ProformaResult<Option<Decimal>> {
    let mut req = input.base.clone();
    input.variable_1.field.apply(&mut req, v1)?;
    input.variable_2.field.apply(&mut req, v2)?;
    let out = analyze_property(&req)?;
    Ok(input.output_metric.read(&out.result.summary))
}
