use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Percentages on the 0–100 scale. Only used at the engine boundary.
pub type Percent = Decimal;

/// Multiples (e.g., 1.8x equity multiple)
pub type Multiple = Decimal;

/// Convert a boundary percentage (6.5) into an internal rate (0.065).
pub fn percent_to_rate(pct: Percent) -> Rate {
    pct / dec!(100)
}

/// Convert an internal rate (0.065) into a boundary percentage (6.5).
pub fn rate_to_percent(rate: Rate) -> Percent {
    rate * dec!(100)
}

/// Human-readable label for a rate, e.g. `0.065` -> `"6.5%"`.
pub fn rate_label(rate: Rate) -> String {
    let pct = rate_to_percent(rate)
        .round_dp_with_strategy(1, rust_decimal::RoundingStrategy::MidpointAwayFromZero);
    format!("{pct:.1}%")
}

/// Result of an IRR solve that never fails hard.
///
/// When the solver cannot converge `converged` is false and `rate` holds the
/// last iterate (or zero when no iterate exists).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolvedIrr {
    pub rate: Rate,
    pub converged: bool,
    pub iterations: u32,
}

impl SolvedIrr {
    pub fn not_converged(rate: Rate, iterations: u32) -> Self {
        SolvedIrr {
            rate,
            converged: false,
            iterations,
        }
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    for w in &warnings {
        tracing::warn!(methodology, warning = %w, "computation warning");
    }
    tracing::debug!(methodology, elapsed_us, "computation finished");

    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_conversion() {
        assert_eq!(percent_to_rate(dec!(6.5)), dec!(0.065));
        assert_eq!(rate_to_percent(dec!(0.065)), dec!(6.500));
    }

    #[test]
    fn test_rate_label() {
        assert_eq!(rate_label(dec!(0.065)), "6.5%");
        assert_eq!(rate_label(dec!(0.07)), "7.0%");
        assert_eq!(rate_label(dec!(0.1)), "10.0%");
    }
}
