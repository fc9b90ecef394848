mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::debt::{AmortizationArgs, DebtServiceArgs, SizeDebtArgs};
use commands::underwriting::{SensitivityArgs, UnderwriteArgs};
use commands::waterfall::WaterfallArgs;

/// Commercial real-estate underwriting and waterfall calculations
#[derive(Parser)]
#[command(
    name = "uwa",
    version,
    about = "Commercial real-estate underwriting and waterfall calculations",
    long_about = "A CLI for underwriting commercial real-estate deals with decimal \
                  precision. Projects annual cash flows, derives cap rate, DSCR, IRR \
                  and equity multiple, runs sensitivity analysis, sizes debt to a \
                  target DSCR and distributes cash through GP/LP waterfalls. \
                  Set UWA_LOG (e.g. UWA_LOG=debug) to control diagnostics on stderr."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Underwrite a deal: ledger, return metrics and sensitivity
    Underwrite(UnderwriteArgs),
    /// One-at-a-time IRR sensitivity for a deal
    Sensitivity(SensitivityArgs),
    /// Monthly payment and annual debt service for a loan
    DebtService(DebtServiceArgs),
    /// Year-by-year amortization schedule
    Amortization(AmortizationArgs),
    /// Size the maximum loan for a target DSCR
    SizeDebt(SizeDebtArgs),
    /// Distribute cash flows through GP/LP hurdle tiers
    Waterfall(WaterfallArgs),
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

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("UWA_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Underwrite(args) => commands::underwriting::run_underwrite(args),
        Commands::Sensitivity(args) => commands::underwriting::run_sensitivity(args),
        Commands::DebtService(args) => commands::debt::run_debt_service(args),
        Commands::Amortization(args) => commands::debt::run_amortization(args),
        Commands::SizeDebt(args) => commands::debt::run_size_debt(args),
        Commands::Waterfall(args) => commands::waterfall::run_waterfall(args),
        Commands::Version => {
            println!("uwa {}", env!("CARGO_PKG_VERSION"));
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
