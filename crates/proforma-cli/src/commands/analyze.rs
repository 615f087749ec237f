use clap::Args;
use serde_json::Value;

use proforma_core::proforma::normalize::{self, FormDefaults, PropertyForm};
use proforma_core::proforma::pipeline;
use proforma_core::proforma::request::AnalysisRequest;

use crate::input;

/// Arguments for a pro forma run on a normalized request
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Path to JSON analysis request (decimal rates, snake_case fields)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for commands that take a raw intake form
#[derive(Args)]
pub struct FormArgs {
    /// Path to JSON intake form (camelCase UI fields, percents as whole numbers)
    #[arg(long)]
    pub input: Option<String>,

    /// JSON or YAML file overriding the defaults used for blank fields
    #[arg(long)]
    pub defaults: Option<String>,
}

fn load_defaults(path: Option<&str>) -> Result<FormDefaults, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            tracing::debug!(path, "loading form defaults");
            input::file::read_config(path)
        }
        None => Ok(FormDefaults::default()),
    }
}

fn log_warnings(warnings: &[String]) {
    for w in warnings {
        tracing::warn!("{w}");
    }
}

pub fn run_analyze(args: AnalyzeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: AnalysisRequest = input::read_input(args.input.as_deref(), "an analysis request")?;
    tracing::info!(
        address = %request.property.address,
        hold_years = request.projection.hold_years,
        "running pro forma"
    );
    let result = pipeline::analyze_property(&request)?;
    log_warnings(&result.warnings);
    tracing::debug!(elapsed_us = result.metadata.computation_time_us, "pro forma complete");
    Ok(serde_json::to_value(result)?)
}

pub fn run_analyze_form(args: FormArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let form: PropertyForm = input::read_input(args.input.as_deref(), "an intake form")?;
    let defaults = load_defaults(args.defaults.as_deref())?;
    let result = pipeline::analyze_form(&form, &defaults)?;
    log_warnings(&result.warnings);
    Ok(serde_json::to_value(result)?)
}

pub fn run_normalize(args: FormArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let form: PropertyForm = input::read_input(args.input.as_deref(), "an intake form")?;
    let defaults = load_defaults(args.defaults.as_deref())?;
    let normalized = normalize::normalize_form(&form, &defaults)?;
    tracing::debug!(fields = normalized.provenance.len(), "form normalized");
    Ok(serde_json::to_value(normalized)?)
}
