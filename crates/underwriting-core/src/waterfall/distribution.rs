use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::tiers::{ordered_tiers, HurdleBalances, WaterfallTier};
use crate::error::UnderwritingError;
use crate::time_value;
use crate::types::*;
use crate::EngineResult;

/// Longest hold a waterfall will distribute over.
pub const MAX_WATERFALL_YEARS: u32 = 100;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Input for a multi-tier GP/LP distribution of a deal's cash flows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterfallInput {
    pub tiers: Vec<WaterfallTier>,
    /// Capital contributed by the limited partners at close
    pub lp_investment: Money,
    /// GP share of total equity (decimal, default 0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_coinvest_fraction: Option<Rate>,
    /// Aggregate cash flow for years 1..n; the exit year includes sale proceeds.
    /// Negative years are treated as capital calls.
    pub cash_flows: Vec<Money>,
    /// Final year of the hold (1-based)
    pub exit_year: u32,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Cash routed through one tier in one year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierAllocation {
    pub position: u32,
    pub hurdle_rate: Rate,
    pub amount: Money,
    pub to_gp: Money,
    pub to_lp: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaterfallYear {
    pub year: u32,
    pub total_cash_flow: Money,
    pub gp_distribution: Money,
    pub lp_distribution: Money,
    /// GP share of the year's cash (0–100)
    pub gp_pct: Percent,
    /// LP share of the year's cash (0–100)
    pub lp_pct: Percent,
    /// Position of the highest tier that received cash this year
    pub active_tier: Option<u32>,
    pub tier_allocations: Vec<TierAllocation>,
}

/// Per-tier totals over the whole hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierSummary {
    pub position: u32,
    pub hurdle_rate: Rate,
    pub gp_split: Percent,
    pub lp_split: Percent,
    pub distributed: Money,
    pub to_gp: Money,
    pub to_lp: Money,
    /// True when investors earned this tier's hurdle by the exit year
    pub hurdle_met: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyReturns {
    /// Initial capital plus capital calls
    pub contributed: Money,
    /// Cash received in distribution years
    pub distributed: Money,
    pub net_profit: Money,
    pub irr: SolvedIrr,
    pub irr_pct: Percent,
    /// Distributed / contributed (0 when nothing was contributed)
    pub multiple: Multiple,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaterfallCalculationResult {
    pub years: Vec<WaterfallYear>,
    pub tiers: Vec<TierSummary>,
    pub total_cash_flow: Money,
    pub total_gp: Money,
    pub total_lp: Money,
    pub gp_pct_of_total: Percent,
    pub lp_pct_of_total: Percent,
    pub gp: PartyReturns,
    pub lp: PartyReturns,
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

/// Distribute a yearly cash-flow series through hurdle tiers.
///
/// Each year first pays investors 100% of cash until the lowest tier's
/// balance (unreturned capital plus accrued preferred return) is cleared.
/// Cash then cascades in ascending hurdle order: a tier's split governs cash
/// until its compounding hurdle balance is exhausted by investor
/// distributions, and only then does cash reach the next tier. The last tier
/// takes all residual cash.
pub fn calculate_waterfall(
    input: &WaterfallInput,
) -> EngineResult<ComputationOutput<WaterfallCalculationResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let tiers = ordered_tiers(&input.tiers)?;
    validate_input(input)?;

    let coinvest = input.gp_coinvest_fraction.unwrap_or(Decimal::ZERO);
    let total_equity = input.lp_investment / (Decimal::ONE - coinvest);
    let gp_investment = total_equity - input.lp_investment;

    let horizon = input.exit_year as usize;
    if input.cash_flows.len() > horizon {
        warnings.push(format!(
            "{} cash flow(s) after exit year {} ignored",
            input.cash_flows.len() - horizon,
            input.exit_year
        ));
    }

    let mut balances = HurdleBalances::new(&tiers, total_equity);
    let mut summaries: Vec<TierSummary> = tiers
        .iter()
        .map(|t| TierSummary {
            position: t.position,
            hurdle_rate: t.hurdle_rate,
            gp_split: t.gp_split,
            lp_split: t.lp_split,
            distributed: Decimal::ZERO,
            to_gp: Decimal::ZERO,
            to_lp: Decimal::ZERO,
            hurdle_met: false,
        })
        .collect();

    let mut years = Vec::with_capacity(horizon);
    let mut gp = PartyLedger::new(gp_investment);
    let mut lp = PartyLedger::new(input.lp_investment);

    for (i, &cash) in input.cash_flows.iter().take(horizon).enumerate() {
        balances.accrue_year()?;

        let year = if cash < Decimal::ZERO {
            // Capital call, funded pro rata to equity
            let call = -cash;
            balances.contribute(call)?;
            let gp_share = cash * coinvest;
            let lp_share = cash - gp_share;
            gp.record(gp_share);
            lp.record(lp_share);
            WaterfallYear {
                year: i as u32 + 1,
                total_cash_flow: cash,
                gp_distribution: gp_share,
                lp_distribution: lp_share,
                gp_pct: share_pct(gp_share, cash),
                lp_pct: share_pct(lp_share, cash),
                active_tier: None,
                tier_allocations: Vec::new(),
            }
        } else {
            let allocations =
                allocate_year(cash, &tiers, coinvest, &mut balances, &mut summaries)?;
            let gp_total: Money = allocations.iter().map(|a| a.to_gp).sum();
            let lp_total: Money = allocations.iter().map(|a| a.to_lp).sum();
            gp.record(gp_total);
            lp.record(lp_total);
            WaterfallYear {
                year: i as u32 + 1,
                total_cash_flow: cash,
                gp_distribution: gp_total,
                lp_distribution: lp_total,
                gp_pct: share_pct(gp_total, cash),
                lp_pct: share_pct(lp_total, cash),
                active_tier: allocations.last().map(|a| a.position),
                tier_allocations: allocations,
            }
        };
        years.push(year);
    }

    for (idx, summary) in summaries.iter_mut().enumerate() {
        summary.hurdle_met = balances.is_satisfied(idx);
    }
    if let Some(first) = summaries.first() {
        if !first.hurdle_met {
            warnings.push(format!(
                "Investors did not reach the lowest hurdle ({}) by exit",
                rate_label(first.hurdle_rate)
            ));
        }
    }

    let total_cash_flow: Money = years.iter().map(|y| y.total_cash_flow).sum();
    let total_gp: Money = years.iter().map(|y| y.gp_distribution).sum();
    let total_lp: Money = years.iter().map(|y| y.lp_distribution).sum();

    let output = WaterfallCalculationResult {
        gp_pct_of_total: share_pct(total_gp, total_cash_flow),
        lp_pct_of_total: share_pct(total_lp, total_cash_flow),
        gp: gp.finish("GP", &mut warnings),
        lp: lp.finish("LP", &mut warnings),
        years,
        tiers: summaries,
        total_cash_flow,
        total_gp,
        total_lp,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Multi-Tier GP/LP Waterfall (hurdle balance exhaustion, pro-rata investor share)",
        &serde_json::json!({
            "lp_investment": input.lp_investment.to_string(),
            "gp_coinvest_fraction": coinvest.to_string(),
            "exit_year": input.exit_year,
            "tiers": tiers,
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Route one year's cash through the tiers.
///
/// The preferred-return step is reported against the lowest tier and merged
/// with any split cash that tier also receives.
fn allocate_year(
    cash: Money,
    tiers: &[WaterfallTier],
    coinvest: Rate,
    balances: &mut HurdleBalances,
    summaries: &mut [TierSummary],
) -> EngineResult<Vec<TierAllocation>> {
    let mut remaining = cash;
    let mut routed: Vec<(usize, Money, Money)> = Vec::new();
    let last = tiers.len() - 1;

    let preferred = remaining.min(balances.outstanding(0).max(Decimal::ZERO));
    if preferred > Decimal::ZERO {
        balances.distribute(preferred)?;
        remaining -= preferred;
        routed.push((0, preferred, preferred));
    }

    for (idx, tier) in tiers.iter().enumerate() {
        if remaining <= Decimal::ZERO {
            break;
        }
        if idx < last && balances.is_satisfied(idx) {
            continue;
        }

        let lp_fraction = tier.lp_fraction();
        let amount = if idx == last || lp_fraction.is_zero() {
            // Final tier, or a tier investors can never satisfy
            remaining
        } else {
            remaining.min(balances.outstanding(idx) / lp_fraction)
        };

        let investor = amount * lp_fraction;
        balances.distribute(investor)?;
        remaining -= amount;

        match routed.last_mut() {
            Some((prev, prev_amount, prev_investor)) if *prev == idx => {
                *prev_amount += amount;
                *prev_investor += investor;
            }
            _ => routed.push((idx, amount, investor)),
        }

        if lp_fraction.is_zero() {
            break;
        }
    }

    let allocations = routed
        .into_iter()
        .map(|(idx, amount, investor)| {
            let gp_coinvest = investor * coinvest;
            let allocation = TierAllocation {
                position: tiers[idx].position,
                hurdle_rate: tiers[idx].hurdle_rate,
                amount,
                to_gp: amount - investor + gp_coinvest,
                to_lp: investor - gp_coinvest,
            };
            let summary = &mut summaries[idx];
            summary.distributed += allocation.amount;
            summary.to_gp += allocation.to_gp;
            summary.to_lp += allocation.to_lp;
            allocation
        })
        .collect();

    Ok(allocations)
}

fn validate_input(input: &WaterfallInput) -> EngineResult<()> {
    if input.lp_investment <= Decimal::ZERO {
        return Err(UnderwritingError::invalid(
            "lp_investment",
            "LP investment must be positive",
        ));
    }
    if let Some(g) = input.gp_coinvest_fraction {
        if g < Decimal::ZERO || g >= Decimal::ONE {
            return Err(UnderwritingError::invalid(
                "gp_coinvest_fraction",
                "GP co-invest fraction must be in [0, 1)",
            ));
        }
    }
    if input.cash_flows.is_empty() {
        return Err(UnderwritingError::invalid(
            "cash_flows",
            "At least one year of cash flow is required",
        ));
    }
    let last_year = input.cash_flows.len().min(MAX_WATERFALL_YEARS as usize);
    if input.exit_year == 0 || input.exit_year as usize > last_year {
        return Err(UnderwritingError::invalid(
            "exit_year",
            format!("Exit year must be between 1 and {last_year}"),
        ));
    }
    Ok(())
}

/// `part` as a 0–100 share of `whole`; zero when `whole` is zero.
fn share_pct(part: Money, whole: Money) -> Percent {
    if whole.is_zero() {
        Decimal::ZERO
    } else {
        rate_to_percent(part / whole)
    }
}

/// Running contributions and distributions for one party.
struct PartyLedger {
    flows: Vec<Money>,
    contributed: Money,
    distributed: Money,
}

impl PartyLedger {
    fn new(initial: Money) -> Self {
        PartyLedger {
            flows: vec![-initial],
            contributed: initial,
            distributed: Decimal::ZERO,
        }
    }

    fn record(&mut self, amount: Money) {
        if amount < Decimal::ZERO {
            self.contributed -= amount;
        } else {
            self.distributed += amount;
        }
        self.flows.push(amount);
    }

    fn finish(self, party: &str, warnings: &mut Vec<String>) -> PartyReturns {
        let irr = if self.contributed.is_zero() {
            SolvedIrr::not_converged(Decimal::ZERO, 0)
        } else {
            time_value::solve_irr(&self.flows, &format!("{party} IRR"), warnings)
        };
        let multiple = if self.contributed.is_zero() {
            Decimal::ZERO
        } else {
            self.distributed / self.contributed
        };
        PartyReturns {
            contributed: self.contributed,
            distributed: self.distributed,
            net_profit: self.distributed - self.contributed,
            irr_pct: rate_to_percent(irr.rate),
            irr,
            multiple,
        }
    }
}
