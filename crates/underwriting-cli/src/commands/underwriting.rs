use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;

use underwriting_core::underwriting::sensitivity::calculate_sensitivity;
use underwriting_core::underwriting::{normalize, underwrite_raw, IrrMethod, RawUnderwritingInput};
use underwriting_core::ComputationOutput;

use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum IrrMethodArg {
    /// Total profit / holding period / equity
    Average,
    /// Newton-Raphson root of the equity cash flows
    Newton,
}

impl From<IrrMethodArg> for IrrMethod {
    fn from(arg: IrrMethodArg) -> Self {
        match arg {
            IrrMethodArg::Average => IrrMethod::AverageAnnualReturn,
            IrrMethodArg::Newton => IrrMethod::NewtonRaphson,
        }
    }
}

/// Deal assumptions. Rates are percentages (6.5 = 6.5%).
#[derive(Args)]
pub struct DealArgs {
    /// Path to JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Acquisition price
    #[arg(long)]
    pub purchase_price: Option<Decimal>,

    /// Annual rent per square foot
    #[arg(long)]
    pub rent_per_sf: Option<Decimal>,

    /// Rentable square footage
    #[arg(long, alias = "sf")]
    pub square_footage: Option<Decimal>,

    /// Vacancy and credit loss (%)
    #[arg(long)]
    pub vacancy_rate: Option<Decimal>,

    /// Operating expense per square foot
    #[arg(long)]
    pub opex_per_sf: Option<Decimal>,

    /// Other annual income
    #[arg(long)]
    pub other_income: Option<Decimal>,

    /// Exit cap rate (%)
    #[arg(long)]
    pub exit_cap_rate: Option<Decimal>,

    /// NOI growth (%)
    #[arg(long, allow_hyphen_values = true)]
    pub noi_growth_rate: Option<Decimal>,

    /// Rent growth (%), defaults to NOI growth
    #[arg(long, allow_hyphen_values = true)]
    pub rent_growth_rate: Option<Decimal>,

    /// Expense growth (%)
    #[arg(long, allow_hyphen_values = true)]
    pub expense_growth_rate: Option<Decimal>,

    /// Holding period in years
    #[arg(long, alias = "hold")]
    pub holding_period_years: Option<u32>,

    /// Loan amount
    #[arg(long)]
    pub loan_amount: Option<Decimal>,

    /// Loan interest rate (%)
    #[arg(long)]
    pub interest_rate: Option<Decimal>,

    /// Amortization in years
    #[arg(long)]
    pub amortization_years: Option<u32>,

    /// Loan term in years
    #[arg(long)]
    pub loan_term_years: Option<u32>,

    /// Origination fee (% of loan)
    #[arg(long)]
    pub loan_fee_rate: Option<Decimal>,

    /// IRR method
    #[arg(long, value_enum)]
    pub irr_method: Option<IrrMethodArg>,
}

impl DealArgs {
    fn to_raw(&self) -> Result<RawUnderwritingInput, Box<dyn std::error::Error>> {
        if let Some(raw) = input::load::<RawUnderwritingInput>(self.input.as_deref())? {
            return Ok(raw);
        }
        Ok(RawUnderwritingInput {
            purchase_price: self
                .purchase_price
                .ok_or("--purchase-price is required (or provide --input)")?,
            rent_per_sf: self
                .rent_per_sf
                .ok_or("--rent-per-sf is required (or provide --input)")?,
            square_footage: self
                .square_footage
                .ok_or("--square-footage is required (or provide --input)")?,
            vacancy_rate: self.vacancy_rate,
            opex_per_sf: self.opex_per_sf,
            other_income: self.other_income,
            exit_cap_rate: self.exit_cap_rate,
            noi_growth_rate: self.noi_growth_rate,
            rent_growth_rate: self.rent_growth_rate,
            expense_growth_rate: self.expense_growth_rate,
            holding_period_years: self.holding_period_years,
            loan_amount: self.loan_amount,
            interest_rate: self.interest_rate,
            amortization_years: self.amortization_years,
            loan_term_years: self.loan_term_years,
            loan_fee_rate: self.loan_fee_rate,
            irr_method: self.irr_method.map(IrrMethod::from),
            ..Default::default()
        })
    }
}

/// Arguments for a full underwriting run
#[derive(Args)]
pub struct UnderwriteArgs {
    #[command(flatten)]
    pub deal: DealArgs,

    /// Skip the sensitivity analysis
    #[arg(long)]
    pub no_sensitivity: bool,
}

/// Arguments for a standalone sensitivity run
#[derive(Args)]
pub struct SensitivityArgs {
    #[command(flatten)]
    pub deal: DealArgs,
}

pub fn run_underwrite(args: UnderwriteArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut raw = args.deal.to_raw()?;
    if args.no_sensitivity {
        raw.include_sensitivity = Some(false);
    }
    let result = underwrite_raw(&raw)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_sensitivity(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let raw = args.deal.to_raw()?;
    let output = calculate_sensitivity(&normalize(&raw)?)?;
    let report = ComputationOutput {
        result: output.result.to_report(),
        methodology: output.methodology,
        assumptions: output.assumptions,
        warnings: output.warnings,
        metadata: output.metadata,
    };
    Ok(serde_json::to_value(report)?)
}
