use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use underwriting_core::waterfall::{calculate_waterfall, WaterfallInput, WaterfallTier};
use underwriting_core::percent_to_rate;

use crate::input;

/// Arguments for a GP/LP waterfall
#[derive(Args)]
pub struct WaterfallArgs {
    /// Path to JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Tier as hurdle%:gp%:lp% (e.g. "8:0:100"); repeat in position order
    #[arg(long = "tier")]
    pub tiers: Vec<String>,

    /// LP capital contributed at close
    #[arg(long)]
    pub lp_investment: Option<Decimal>,

    /// GP share of total equity (%)
    #[arg(long)]
    pub gp_coinvest: Option<Decimal>,

    /// Comma-separated yearly cash flows, exit proceeds in the final year
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub cash_flows: Vec<Decimal>,

    /// Exit year (defaults to the number of cash flows)
    #[arg(long)]
    pub exit_year: Option<u32>,
}

/// Parse "hurdle%:gp%:lp%" into a tier at `position`.
fn parse_tier(position: u32, spec: &str) -> Result<WaterfallTier, Box<dyn std::error::Error>> {
    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() != 3 {
        return Err(format!("Tier must be hurdle:gp:lp, got '{}'", spec).into());
    }
    let hurdle_pct: Decimal = parts[0].trim().parse()?;
    Ok(WaterfallTier::new(
        position,
        percent_to_rate(hurdle_pct),
        parts[1].trim().parse()?,
        parts[2].trim().parse()?,
    ))
}

impl WaterfallArgs {
    fn to_input(&self) -> Result<WaterfallInput, Box<dyn std::error::Error>> {
        match input::load::<WaterfallInput>(self.input.as_deref())? {
            Some(data) => Ok(data),
            None => self.input_from_flags(),
        }
    }

    fn input_from_flags(&self) -> Result<WaterfallInput, Box<dyn std::error::Error>> {
        if self.tiers.is_empty() {
            return Err("at least one --tier is required (or provide --input)".into());
        }
        let tiers = self
            .tiers
            .iter()
            .enumerate()
            .map(|(i, spec)| parse_tier(i as u32 + 1, spec))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(WaterfallInput {
            tiers,
            lp_investment: self
                .lp_investment
                .ok_or("--lp-investment is required (or provide --input)")?,
            gp_coinvest_fraction: self.gp_coinvest.map(percent_to_rate),
            cash_flows: self.cash_flows.clone(),
            exit_year: self.exit_year.unwrap_or(self.cash_flows.len() as u32),
        })
    }
}

pub fn run_waterfall(args: WaterfallArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let result = calculate_waterfall(&args.to_input()?)?;
    Ok(serde_json::to_value(result)?)
}
