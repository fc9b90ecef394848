use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::UnderwritingError;
use crate::types::*;
use crate::EngineResult;

/// One rung of a GP/LP promote structure.
///
/// The tier's split governs cash until investors have earned `hurdle_rate`
/// (annually compounded) on their capital; after that cash cascades to the
/// next tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaterfallTier {
    /// Ordinal position, used to break ties between equal hurdles
    pub position: u32,
    /// Annualized preferred return (decimal)
    pub hurdle_rate: Rate,
    /// GP promote share (0–100)
    pub gp_split: Percent,
    /// Investor share (0–100), paid pro rata to contributed capital
    pub lp_split: Percent,
}

impl WaterfallTier {
    pub fn new(position: u32, hurdle_rate: Rate, gp_split: Percent, lp_split: Percent) -> Self {
        WaterfallTier {
            position,
            hurdle_rate,
            gp_split,
            lp_split,
        }
    }

    /// Investor share as a decimal fraction.
    pub fn lp_fraction(&self) -> Rate {
        percent_to_rate(self.lp_split)
    }

    pub fn validate(&self, index: usize) -> EngineResult<()> {
        let field = |name: &str| format!("tiers[{index}].{name}");
        for (name, split) in [("gp_split", self.gp_split), ("lp_split", self.lp_split)] {
            if split < Decimal::ZERO || split > dec!(100) {
                return Err(UnderwritingError::InvalidInput {
                    field: field(name),
                    reason: "Split must be between 0 and 100".into(),
                });
            }
        }
        if self.gp_split + self.lp_split != dec!(100) {
            return Err(UnderwritingError::InvalidInput {
                field: field("gp_split"),
                reason: format!(
                    "GP split ({}) and LP split ({}) must sum to 100",
                    self.gp_split, self.lp_split
                ),
            });
        }
        if self.hurdle_rate < Decimal::ZERO {
            return Err(UnderwritingError::InvalidInput {
                field: field("hurdle_rate"),
                reason: "Hurdle rate cannot be negative".into(),
            });
        }
        Ok(())
    }
}

/// Validate every tier and return them in consumption order: ascending
/// hurdle, then ascending position. Input order breaks any remaining tie.
pub fn ordered_tiers(tiers: &[WaterfallTier]) -> EngineResult<Vec<WaterfallTier>> {
    if tiers.is_empty() {
        return Err(UnderwritingError::invalid(
            "tiers",
            "At least one waterfall tier is required",
        ));
    }
    for (i, tier) in tiers.iter().enumerate() {
        tier.validate(i)?;
    }

    let mut ordered = tiers.to_vec();
    ordered.sort_by(|a, b| {
        a.hurdle_rate
            .cmp(&b.hurdle_rate)
            .then(a.position.cmp(&b.position))
    });
    Ok(ordered)
}

/// Unreturned capital plus accrued preferred return, one per tier.
///
/// Balances are signed: a balance at or below zero means investors have
/// already earned that tier's hurdle.
#[derive(Debug, Clone)]
pub(crate) struct HurdleBalances {
    rates: Vec<Rate>,
    balances: Vec<Money>,
}

impl HurdleBalances {
    pub(crate) fn new(tiers: &[WaterfallTier], capital: Money) -> Self {
        HurdleBalances {
            rates: tiers.iter().map(|t| t.hurdle_rate).collect(),
            balances: vec![capital; tiers.len()],
        }
    }

    /// Accrue one year of preferred return on outstanding balances.
    pub(crate) fn accrue_year(&mut self) -> EngineResult<()> {
        for (balance, rate) in self.balances.iter_mut().zip(&self.rates) {
            if *balance > Decimal::ZERO {
                *balance = balance
                    .checked_mul(Decimal::ONE + *rate)
                    .ok_or_else(|| UnderwritingError::out_of_range("tiers", "Hurdle balance"))?;
            }
        }
        Ok(())
    }

    pub(crate) fn contribute(&mut self, amount: Money) -> EngineResult<()> {
        self.shift(amount)
    }

    pub(crate) fn distribute(&mut self, investor_amount: Money) -> EngineResult<()> {
        self.shift(-investor_amount)
    }

    fn shift(&mut self, delta: Money) -> EngineResult<()> {
        for balance in &mut self.balances {
            *balance = balance
                .checked_add(delta)
                .ok_or_else(|| UnderwritingError::out_of_range("cash_flows", "Hurdle balance"))?;
        }
        Ok(())
    }

    pub(crate) fn outstanding(&self, tier_index: usize) -> Money {
        self.balances[tier_index]
    }

    pub(crate) fn is_satisfied(&self, tier_index: usize) -> bool {
        self.balances[tier_index] <= Decimal::ZERO
    }
}
