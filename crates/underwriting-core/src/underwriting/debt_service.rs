use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::UnderwritingError;
use crate::time_value;
use crate::types::*;
use crate::EngineResult;

/// Longest amortization accepted anywhere in the engine.
pub const MAX_AMORTIZATION_YEARS: u32 = 50;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A level-payment, fully amortizing mortgage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanInput {
    pub principal: Money,
    /// Annual nominal interest rate (decimal)
    pub annual_rate: Rate,
    pub amortization_years: u32,
    /// Maturity in years; the schedule stops here and the remainder balloons
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term_years: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtServiceOutput {
    pub monthly_payment: Money,
    pub annual_debt_service: Money,
    pub total_payments: u32,
    /// Balance due at maturity when the term is shorter than amortization
    pub balloon_balance: Money,
}

/// One year of an amortization schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationYear {
    pub year: u32,
    pub opening_balance: Money,
    pub interest: Money,
    pub principal: Money,
    pub closing_balance: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationScheduleOutput {
    pub monthly_payment: Money,
    pub annual_debt_service: Money,
    pub years: Vec<AmortizationYear>,
    pub total_interest: Money,
    pub total_principal: Money,
    pub balloon_balance: Money,
}

// ---------------------------------------------------------------------------
// Core math
// ---------------------------------------------------------------------------

/// Level monthly payment: P · r(1+r)ⁿ / ((1+r)ⁿ − 1) with r = rate/12, n = years·12.
///
/// A zero principal short-circuits to zero so the 0/0 case never arises.
pub fn monthly_payment(
    principal: Money,
    annual_rate: Rate,
    amortization_years: u32,
) -> EngineResult<Money> {
    validate_loan(principal, annual_rate, amortization_years)?;

    if principal.is_zero() {
        return Ok(Decimal::ZERO);
    }

    let monthly_rate = annual_rate / dec!(12);
    let total_months = amortization_years * 12;

    // pmt() returns the payment as an outflow against a positive present value
    let payment = -time_value::pmt(monthly_rate, total_months, principal, Decimal::ZERO)?;
    Ok(payment)
}

/// Annual debt service = monthly payment × 12.
pub fn annual_debt_service(
    principal: Money,
    annual_rate: Rate,
    amortization_years: u32,
) -> EngineResult<Money> {
    Ok(monthly_payment(principal, annual_rate, amortization_years)? * dec!(12))
}

/// Outstanding balance after `years` of scheduled payments.
pub fn loan_balance_after_years(
    principal: Money,
    annual_rate: Rate,
    amortization_years: u32,
    years: u32,
) -> EngineResult<Money> {
    let schedule = build_schedule(principal, annual_rate, amortization_years, years)?;
    Ok(schedule
        .last()
        .map(|y| y.closing_balance)
        .unwrap_or(principal))
}

fn validate_loan(principal: Money, annual_rate: Rate, amortization_years: u32) -> EngineResult<()> {
    if principal < Decimal::ZERO {
        return Err(UnderwritingError::invalid(
            "principal",
            "Loan principal cannot be negative",
        ));
    }
    if annual_rate < Decimal::ZERO {
        return Err(UnderwritingError::invalid(
            "annual_rate",
            "Interest rate cannot be negative",
        ));
    }
    if amortization_years == 0 {
        return Err(UnderwritingError::invalid(
            "amortization_years",
            "Amortization must be at least 1 year",
        ));
    }
    if amortization_years > MAX_AMORTIZATION_YEARS {
        return Err(UnderwritingError::invalid(
            "amortization_years",
            format!("Amortization cannot exceed {MAX_AMORTIZATION_YEARS} years"),
        ));
    }
    Ok(())
}

/// Month-by-month amortization rolled up into years, stopping after `years`.
fn build_schedule(
    principal: Money,
    annual_rate: Rate,
    amortization_years: u32,
    years: u32,
) -> EngineResult<Vec<AmortizationYear>> {
    let payment = monthly_payment(principal, annual_rate, amortization_years)?;
    let monthly_rate = annual_rate / dec!(12);

    let mut balance = principal;
    let mut out = Vec::with_capacity(years as usize);

    for year in 1..=years {
        let opening = balance;
        let mut interest = Decimal::ZERO;
        let mut principal_paid = Decimal::ZERO;

        for _ in 0..12 {
            if balance <= Decimal::ZERO {
                break;
            }
            let month_interest = balance * monthly_rate;
            let month_principal = (payment - month_interest).min(balance);
            interest += month_interest;
            principal_paid += month_principal;
            balance -= month_principal;
        }

        out.push(AmortizationYear {
            year,
            opening_balance: opening,
            interest,
            principal: principal_paid,
            closing_balance: balance,
        });
    }

    Ok(out)
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Monthly payment, annual debt service and balloon for a single loan.
pub fn calculate_debt_service(
    input: &LoanInput,
) -> EngineResult<ComputationOutput<DebtServiceOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let payment = monthly_payment(input.principal, input.annual_rate, input.amortization_years)?;
    let term = effective_term(input, &mut warnings);
    let balloon_balance = if term < input.amortization_years {
        loan_balance_after_years(
            input.principal,
            input.annual_rate,
            input.amortization_years,
            term,
        )?
    } else {
        Decimal::ZERO
    };

    let output = DebtServiceOutput {
        monthly_payment: payment,
        annual_debt_service: payment * dec!(12),
        total_payments: input.amortization_years * 12,
        balloon_balance,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Level-Payment Mortgage Debt Service",
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// Year-by-year amortization schedule through the loan term.
pub fn amortization_schedule(
    input: &LoanInput,
) -> EngineResult<ComputationOutput<AmortizationScheduleOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let payment = monthly_payment(input.principal, input.annual_rate, input.amortization_years)?;
    let term = effective_term(input, &mut warnings);
    let years = build_schedule(
        input.principal,
        input.annual_rate,
        input.amortization_years,
        term,
    )?;

    let total_interest: Money = years.iter().map(|y| y.interest).sum();
    let total_principal: Money = years.iter().map(|y| y.principal).sum();
    let balloon_balance = years
        .last()
        .map(|y| y.closing_balance)
        .unwrap_or(input.principal);

    if balloon_balance > dec!(0.01) {
        warnings.push(format!(
            "Loan matures in year {term} with a balloon balance of {:.2}",
            balloon_balance
        ));
    }

    let output = AmortizationScheduleOutput {
        monthly_payment: payment,
        annual_debt_service: payment * dec!(12),
        years,
        total_interest,
        total_principal,
        balloon_balance,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Level-Payment Mortgage Amortization Schedule",
        input,
        warnings,
        elapsed,
        output,
    ))
}

fn effective_term(input: &LoanInput, warnings: &mut Vec<String>) -> u32 {
    match input.term_years {
        Some(0) => {
            warnings.push("Loan term of 0 years ignored; using amortization period".into());
            input.amortization_years
        }
        Some(t) if t > input.amortization_years => {
            warnings.push(format!(
                "Loan term ({t}y) exceeds amortization ({}y); loan is repaid at amortization",
                input.amortization_years
            ));
            input.amortization_years
        }
        Some(t) => t,
        None => input.amortization_years,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_monthly_payment_sanity() {
        // $800k at 6.5% over 30 years ≈ $5,056.54/month
        let pmt = monthly_payment(dec!(800000), dec!(0.065), 30).unwrap();
        assert!((pmt - dec!(5056.54)).abs() < dec!(0.05), "got {pmt}");
    }

    #[test]
    fn test_annual_debt_service_is_twelve_payments() {
        let pmt = monthly_payment(dec!(800000), dec!(0.065), 30).unwrap();
        let ads = annual_debt_service(dec!(800000), dec!(0.065), 30).unwrap();
        assert_eq!(ads, pmt * dec!(12));
    }

    #[test]
    fn test_zero_rate_mortgage() {
        // 360 equal installments with no compounding
        let pmt = monthly_payment(dec!(360000), Decimal::ZERO, 30).unwrap();
        assert_eq!(pmt, dec!(1000));
    }

    #[test]
    fn test_zero_principal_is_zero_service() {
        assert_eq!(
            annual_debt_service(Decimal::ZERO, dec!(0.065), 30).unwrap(),
            Decimal::ZERO
        );
        assert_eq!(
            annual_debt_service(Decimal::ZERO, Decimal::ZERO, 30).unwrap(),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_zero_amortization_rejected() {
        assert!(monthly_payment(dec!(100000), dec!(0.05), 0).is_err());
    }

    #[test]
    fn test_amortization_beyond_cap_rejected() {
        let err = monthly_payment(dec!(800000), dec!(0.065), 1500).unwrap_err();
        assert!(
            matches!(err, UnderwritingError::InvalidInput { ref field, .. } if field == "amortization_years")
        );
        assert!(monthly_payment(dec!(800000), dec!(0.065), MAX_AMORTIZATION_YEARS).is_ok());
    }

    #[test]
    fn test_extreme_rate_errors_instead_of_overflowing() {
        assert!(monthly_payment(dec!(800000), dec!(600), MAX_AMORTIZATION_YEARS).is_err());
    }

    #[test]
    fn test_negative_principal_rejected() {
        assert!(monthly_payment(dec!(-1), dec!(0.05), 30).is_err());
    }

    #[test]
    fn test_balance_declines_and_fully_amortizes() {
        let after_5 = loan_balance_after_years(dec!(800000), dec!(0.065), 30, 5).unwrap();
        let after_30 = loan_balance_after_years(dec!(800000), dec!(0.065), 30, 30).unwrap();
        assert!(after_5 < dec!(800000));
        assert!(after_5 > dec!(740000));
        assert!(after_30.abs() < dec!(1), "residual {after_30}");
    }

    #[test]
    fn test_schedule_with_balloon() {
        let input = LoanInput {
            principal: dec!(1000000),
            annual_rate: dec!(0.06),
            amortization_years: 30,
            term_years: Some(10),
        };
        let result = amortization_schedule(&input).unwrap();
        let out = &result.result;
        assert_eq!(out.years.len(), 10);
        assert!(out.balloon_balance > Decimal::ZERO);
        assert!((out.total_principal + out.balloon_balance - dec!(1000000)).abs() < dec!(0.000001));
        assert!(result.warnings.iter().any(|w| w.contains("balloon")));
        for pair in out.years.windows(2) {
            assert_eq!(pair[0].closing_balance, pair[1].opening_balance);
        }
    }

    #[test]
    fn test_debt_service_output() {
        let input = LoanInput {
            principal: dec!(800000),
            annual_rate: dec!(0.065),
            amortization_years: 30,
            term_years: None,
        };
        let result = calculate_debt_service(&input).unwrap();
        assert_eq!(result.result.total_payments, 360);
        assert_eq!(result.result.balloon_balance, Decimal::ZERO);
        assert_eq!(
            result.result.annual_debt_service,
            result.result.monthly_payment * dec!(12)
        );
    }
}
