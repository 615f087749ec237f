mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::analyze::{AnalyzeArgs, FormArgs};
use commands::sensitivity::SensitivityArgs;
use commands::tools::{IrrArgs, PaymentArgs};

/// Rental property pro forma analysis
#[derive(Parser)]
#[command(
    name = "proforma",
    version,
    about = "Rental property pro forma analysis",
    long_about = "A CLI for rental property underwriting with decimal precision. \
                  Normalizes intake forms, computes Year-1 purchase metrics, projects \
                  income, debt and value over the hold period, and reports exit IRR \
                  and equity multiple."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log progress to stderr (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pro forma on a normalized analysis request
    Analyze(AnalyzeArgs),
    /// Normalize a raw intake form and run the full pro forma on it
    AnalyzeForm(FormArgs),
    /// Normalize a raw intake form into an analysis request
    Normalize(FormArgs),
    /// Monthly mortgage payment and annual amortization schedule
    Payment(PaymentArgs),
    /// Internal rate of return of a cash flow series
    Irr(IrrArgs),
    /// Two-way sensitivity grid over the pro forma
    Sensitivity(SensitivityArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Analyze(args) => commands::analyze::run_analyze(args),
        Commands::AnalyzeForm(args) => commands::analyze::run_analyze_form(args),
        Commands::Normalize(args) => commands::analyze::run_normalize(args),
        Commands::Payment(args) => commands::tools::run_payment(args),
        Commands::Irr(args) => commands::tools::run_irr(args),
        Commands::Sensitivity(args) => commands::sensitivity::run_sensitivity(args),
        Commands::Version => {
            println!("proforma {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
