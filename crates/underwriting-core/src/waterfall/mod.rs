pub mod distribution;
pub mod tiers;

pub use distribution::{
    calculate_waterfall, PartyReturns, TierAllocation, TierSummary, WaterfallCalculationResult,
    WaterfallInput, WaterfallYear,
};
pub use tiers::{ordered_tiers, WaterfallTier};
