use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::UnderwritingError;
use crate::time_value;
use crate::types::*;
use crate::underwriting::debt_service::{annual_debt_service, MAX_AMORTIZATION_YEARS};
use crate::underwriting::metrics::NO_DEBT_DSCR;
use crate::EngineResult;

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtSizingInput {
    /// Stabilized annual net operating income
    pub noi: Money,
    /// Minimum DSCR the lender will accept (e.g. 1.25)
    pub target_dscr: Multiple,
    /// Annual nominal interest rate (decimal)
    pub annual_rate: Rate,
    pub amortization_years: u32,
    /// Needed for the LTV constraint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_price: Option<Money>,
    /// Maximum loan-to-value (decimal)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_ltv: Option<Rate>,
    /// Minimum NOI / loan amount (decimal)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_debt_yield: Option<Rate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtSizingOutput {
    pub max_loan_by_dscr: Money,
    pub max_loan_by_ltv: Option<Money>,
    pub max_loan_by_debt_yield: Option<Money>,
    /// The constraint that produces the smallest loan
    pub binding_constraint: String,
    pub max_loan: Money,
    /// NOI / target DSCR
    pub max_annual_debt_service: Money,
    pub monthly_payment: Money,
    pub annual_debt_service: Money,
    pub implied_dscr: Multiple,
    pub implied_ltv: Option<Rate>,
    pub implied_debt_yield: Rate,
}

// ---------------------------------------------------------------------------
// Core math
// ---------------------------------------------------------------------------

/// Largest principal whose level payment fits within `max_annual_debt_service`.
///
/// Inverse of the mortgage constant: PV of the monthly payment over
/// amortization × 12 months at rate/12. A zero rate reduces to payment × n.
pub fn max_loan_for_debt_service(
    max_annual_debt_service: Money,
    annual_rate: Rate,
    amortization_years: u32,
) -> EngineResult<Money> {
    if max_annual_debt_service <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }
    let monthly = max_annual_debt_service / dec!(12);
    time_value::pv(
        annual_rate / dec!(12),
        amortization_years * 12,
        -monthly,
        Decimal::ZERO,
    )
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Size the maximum loan for a target DSCR, optionally capped by LTV and
/// debt yield, and report the binding constraint.
pub fn size_debt(input: &DebtSizingInput) -> EngineResult<ComputationOutput<DebtSizingOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_input(input)?;

    if input.noi <= Decimal::ZERO {
        warnings.push("NOI is not positive; no debt can be supported".into());
    }

    // -- By DSCR --------------------------------------------------------------
    let max_annual_debt_service = (input.noi / input.target_dscr).max(Decimal::ZERO);
    let max_by_dscr = max_loan_for_debt_service(
        max_annual_debt_service,
        input.annual_rate,
        input.amortization_years,
    )?;

    // -- By LTV ---------------------------------------------------------------
    let max_by_ltv = match (input.max_ltv, input.purchase_price) {
        (Some(ltv), Some(price)) => Some(price * ltv),
        (Some(_), None) => {
            warnings.push("max_ltv given without purchase_price; LTV constraint ignored".into());
            None
        }
        _ => None,
    };

    // -- By debt yield ----------------------------------------------------------
    // debt yield = NOI / loan >= min  =>  loan <= NOI / min
    let max_by_debt_yield = input
        .min_debt_yield
        .map(|dy| (input.noi / dy).max(Decimal::ZERO));

    // -- Binding constraint -----------------------------------------------------
    let mut binding_name = "target_dscr";
    let mut max_loan = max_by_dscr;
    if let Some(v) = max_by_ltv {
        if v < max_loan {
            binding_name = "max_ltv";
            max_loan = v;
        }
    }
    if let Some(v) = max_by_debt_yield {
        if v < max_loan {
            binding_name = "min_debt_yield";
            max_loan = v;
        }
    }

    let ads = annual_debt_service(max_loan, input.annual_rate, input.amortization_years)?;
    let implied_dscr = if ads.is_zero() {
        NO_DEBT_DSCR
    } else {
        input.noi / ads
    };
    let implied_ltv = match input.purchase_price {
        Some(price) if !price.is_zero() => Some(max_loan / price),
        _ => None,
    };
    let implied_debt_yield = if max_loan.is_zero() {
        Decimal::ZERO
    } else {
        input.noi / max_loan
    };

    let output = DebtSizingOutput {
        max_loan_by_dscr: max_by_dscr,
        max_loan_by_ltv: max_by_ltv,
        max_loan_by_debt_yield: max_by_debt_yield,
        binding_constraint: binding_name.to_string(),
        max_loan,
        max_annual_debt_service,
        monthly_payment: ads / dec!(12),
        annual_debt_service: ads,
        implied_dscr,
        implied_ltv,
        implied_debt_yield,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "DSCR Debt Sizing (inverse level-payment amortization)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn validate_input(input: &DebtSizingInput) -> EngineResult<()> {
    if input.target_dscr <= Decimal::ZERO {
        return Err(UnderwritingError::invalid(
            "target_dscr",
            "Target DSCR must be positive",
        ));
    }
    if input.annual_rate < Decimal::ZERO {
        return Err(UnderwritingError::invalid(
            "annual_rate",
            "Interest rate cannot be negative",
        ));
    }
    if input.amortization_years == 0 || input.amortization_years > MAX_AMORTIZATION_YEARS {
        return Err(UnderwritingError::invalid(
            "amortization_years",
            format!("Amortization must be between 1 and {MAX_AMORTIZATION_YEARS} years"),
        ));
    }
    if let Some(price) = input.purchase_price {
        if price <= Decimal::ZERO {
            return Err(UnderwritingError::invalid(
                "purchase_price",
                "Purchase price must be positive",
            ));
        }
    }
    if let Some(ltv) = input.max_ltv {
        if ltv <= Decimal::ZERO || ltv > Decimal::ONE {
            return Err(UnderwritingError::invalid(
                "max_ltv",
                "Max LTV must be in (0, 1]",
            ));
        }
    }
    if let Some(dy) = input.min_debt_yield {
        if dy <= Decimal::ZERO {
            return Err(UnderwritingError::invalid(
                "min_debt_yield",
                "Min debt yield must be positive",
            ));
        }
    }
    Ok(())
}
