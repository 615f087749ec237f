use clap::Args;
use serde_json::Value;

use proforma_core::proforma::request::AnalysisRequest;
use proforma_core::scenarios::sensitivity::{
    self, OutputMetric, SensitivityInput, SensitivityVariable, SweepField,
};

use crate::input;

/// Arguments for sensitivity analysis
#[derive(Args)]
pub struct SensitivityArgs {
    /// Path to a full JSON sensitivity input (overrides the flags below)
    #[arg(long)]
    pub input: Option<String>,

    /// Path to the base case analysis request
    #[arg(long)]
    pub base: Option<String>,

    /// First variable in format field:min:max:step
    /// (e.g. "interest_rate:0.05:0.08:0.005")
    #[arg(long)]
    pub var1: Option<String>,

    /// Second variable in format field:min:max:step
    #[arg(long)]
    pub var2: Option<String>,

    /// Output metric: irr, cash_on_cash, dscr, noi, cap_rate, equity_multiple, sale_proceeds_net
    #[arg(long, default_value = "irr")]
    pub metric: String,
}

fn parse_enum<T: serde::de::DeserializeOwned>(
    name: &str,
    kind: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    serde_json::from_value(Value::String(name.to_string()))
        .map_err(|_| format!("Unknown {kind} '{name}'").into())
}

fn parse_sens_var(raw: &str) -> Result<SensitivityVariable, Box<dyn std::error::Error>> {
    let parts: Vec<&str> = raw.split(':').collect();
    if parts.len() != 4 {
        return Err(format!(
            "Sensitivity variable must be field:min:max:step, got '{}'",
            raw
        )
        .into());
    }
    let field: SweepField = parse_enum(parts[0], "sweep field")?;
    Ok(SensitivityVariable {
        field,
        min: parts[1].parse()?,
        max: parts[2].parse()?,
        step: parts[3].parse()?,
    })
}

pub fn run_sensitivity(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let sens_input: SensitivityInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else {
        let base: AnalysisRequest = input::read_input(args.base.as_deref(), "a base analysis request")?;
        let var1 = args.var1.as_deref().ok_or("--var1 is required (or provide --input)")?;
        let var2 = args.var2.as_deref().ok_or("--var2 is required (or provide --input)")?;
        SensitivityInput {
            base,
            variable_1: parse_sens_var(var1)?,
            variable_2: parse_sens_var(var2)?,
            output_metric: parse_enum::<OutputMetric>(&args.metric, "metric")?,
        }
    };

    let result = sensitivity::run_sensitivity(&sens_input)?;
    tracing::info!(
        rows = result.result.variable_1_values.len(),
        cols = result.result.variable_2_values.len(),
        failed = result.warnings.len(),
        "sensitivity grid evaluated"
    );
    Ok(serde_json::to_value(result)?)
}
