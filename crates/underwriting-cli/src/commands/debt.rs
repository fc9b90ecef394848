use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use underwriting_core::debt_sizing::{size_debt, DebtSizingInput};
use underwriting_core::percent_to_rate;
use underwriting_core::underwriting::debt_service::{
    amortization_schedule, calculate_debt_service, LoanInput,
};

use crate::input;

/// Loan terms. Rate flags are percentages (6.5 = 6.5%); `--input` files carry
/// the engine's decimal rates.
#[derive(Args)]
pub struct LoanArgs {
    /// Path to JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Loan principal
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Annual interest rate (%)
    #[arg(long)]
    pub annual_rate: Option<Decimal>,

    /// Amortization in years
    #[arg(long, default_value = "30")]
    pub amortization_years: u32,

    /// Term in years (balloon at maturity)
    #[arg(long)]
    pub term_years: Option<u32>,
}

impl LoanArgs {
    fn to_input(&self) -> Result<LoanInput, Box<dyn std::error::Error>> {
        match input::load::<LoanInput>(self.input.as_deref())? {
            Some(loan) => Ok(loan),
            None => self.input_from_flags(),
        }
    }

    fn input_from_flags(&self) -> Result<LoanInput, Box<dyn std::error::Error>> {
        Ok(LoanInput {
            principal: self
                .principal
                .ok_or("--principal is required (or provide --input)")?,
            annual_rate: self
                .annual_rate
                .map(percent_to_rate)
                .ok_or("--annual-rate is required (or provide --input)")?,
            amortization_years: self.amortization_years,
            term_years: self.term_years,
        })
    }
}

/// Arguments for debt service
#[derive(Args)]
pub struct DebtServiceArgs {
    #[command(flatten)]
    pub loan: LoanArgs,
}

/// Arguments for an amortization schedule
#[derive(Args)]
pub struct AmortizationArgs {
    #[command(flatten)]
    pub loan: LoanArgs,
}

/// Arguments for DSCR-based debt sizing. Rate flags are percentages.
#[derive(Args)]
pub struct SizeDebtArgs {
    /// Path to JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Stabilized annual NOI
    #[arg(long)]
    pub noi: Option<Decimal>,

    /// Minimum DSCR (e.g. 1.25)
    #[arg(long, default_value = "1.25")]
    pub target_dscr: Decimal,

    /// Annual interest rate (%)
    #[arg(long)]
    pub annual_rate: Option<Decimal>,

    /// Amortization in years
    #[arg(long, default_value = "30")]
    pub amortization_years: u32,

    /// Purchase price, needed for --max-ltv
    #[arg(long)]
    pub purchase_price: Option<Decimal>,

    /// Maximum loan-to-value (%)
    #[arg(long)]
    pub max_ltv: Option<Decimal>,

    /// Minimum debt yield (%)
    #[arg(long)]
    pub min_debt_yield: Option<Decimal>,
}

pub fn run_debt_service(args: DebtServiceArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let loan = args.loan.to_input()?;
    let result = calculate_debt_service(&loan)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_amortization(args: AmortizationArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let loan = args.loan.to_input()?;
    let result = amortization_schedule(&loan)?;
    Ok(serde_json::to_value(result)?)
}

impl SizeDebtArgs {
    fn to_input(&self) -> Result<DebtSizingInput, Box<dyn std::error::Error>> {
        match input::load::<DebtSizingInput>(self.input.as_deref())? {
            Some(data) => Ok(data),
            None => self.input_from_flags(),
        }
    }

    fn input_from_flags(&self) -> Result<DebtSizingInput, Box<dyn std::error::Error>> {
        Ok(DebtSizingInput {
            noi: self.noi.ok_or("--noi is required (or provide --input)")?,
            target_dscr: self.target_dscr,
            annual_rate: self
                .annual_rate
                .map(percent_to_rate)
                .ok_or("--annual-rate is required (or provide --input)")?,
            amortization_years: self.amortization_years,
            purchase_price: self.purchase_price,
            max_ltv: self.max_ltv.map(percent_to_rate),
            min_debt_yield: self.min_debt_yield.map(percent_to_rate),
        })
    }
}

pub fn run_size_debt(args: SizeDebtArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let result = size_debt(&args.to_input()?)?;
    Ok(serde_json::to_value(result)?)
}
