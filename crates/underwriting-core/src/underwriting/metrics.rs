use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::assumptions::{IrrMethod, UnderwritingInput};
use super::projection::{forward_exit_noi, AnnualCashFlow};
use crate::error::UnderwritingError;
use crate::time_value;
use crate::types::*;
use crate::EngineResult;

/// DSCR reported when there is no debt service to cover.
pub const NO_DEBT_DSCR: Multiple = dec!(999);

/// Return metrics derived from a projected ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnMetrics {
    /// Year-1 NOI / purchase price
    pub cap_rate: Rate,
    /// Year-1 NOI / annual debt service (`NO_DEBT_DSCR` when unlevered)
    pub dscr: Multiple,
    /// Year-1 cash flow / equity investment
    pub cash_on_cash: Rate,
    pub equity_investment: Money,
    /// Final-year NOI grown one more period
    pub exit_noi: Money,
    /// Exit NOI / exit cap rate
    pub exit_value: Money,
    /// Exit value less loan repayment
    pub net_sale_proceeds: Money,
    pub equity_multiple: Multiple,
    pub irr: Rate,
    pub irr_method: IrrMethod,
    pub irr_converged: bool,
    pub loan_to_value: Rate,
}

/// Compute cap rate, DSCR, cash-on-cash, exit value, equity multiple and IRR.
///
/// Zero divisors never fail: they map to zero (or `NO_DEBT_DSCR`) and leave a
/// warning behind. An exit priced outside the decimal range is an error.
pub fn compute_return_metrics(
    input: &UnderwritingInput,
    ledger: &[AnnualCashFlow],
    annual_debt_service: Money,
    warnings: &mut Vec<String>,
) -> EngineResult<ReturnMetrics> {
    let year1_noi = ledger.first().map(|r| r.noi).unwrap_or(Decimal::ZERO);
    let year1_cf = ledger.first().map(|r| r.cash_flow).unwrap_or(Decimal::ZERO);
    let final_noi = ledger.last().map(|r| r.noi).unwrap_or(Decimal::ZERO);

    let cap_rate = guarded_ratio(year1_noi, input.purchase_price, "cap rate", warnings);
    let loan_to_value = guarded_ratio(input.loan_amount, input.purchase_price, "LTV", warnings);

    let dscr = if annual_debt_service.is_zero() {
        NO_DEBT_DSCR
    } else {
        guarded_ratio(year1_noi, annual_debt_service, "DSCR", warnings)
    };

    let equity_investment = input.equity_investment();
    let cash_on_cash = guarded_ratio(year1_cf, equity_investment, "cash-on-cash", warnings);

    let exit_noi = forward_exit_noi(final_noi, input.noi_growth_rate)?;
    let exit_value = exit_noi
        .checked_div(input.exit_cap_rate)
        .ok_or_else(|| UnderwritingError::out_of_range("exit_cap_rate", "Exit value"))?;
    let net_sale_proceeds = exit_value - input.loan_amount;

    let total_returned = ledger
        .last()
        .map(|r| r.cumulative_cash_flow)
        .unwrap_or(Decimal::ZERO)
        .checked_add(net_sale_proceeds)
        .ok_or_else(|| UnderwritingError::out_of_range("exit_cap_rate", "Total return"))?;
    let equity_multiple =
        guarded_ratio(total_returned, equity_investment, "equity multiple", warnings);

    let (irr, irr_converged) = match input.irr_method {
        IrrMethod::AverageAnnualReturn => {
            let profit = total_returned - equity_investment;
            let per_year = profit / Decimal::from(input.holding_period_years.max(1));
            (
                guarded_ratio(per_year, equity_investment, "IRR", warnings),
                true,
            )
        }
        IrrMethod::NewtonRaphson => {
            let mut flows = Vec::with_capacity(ledger.len() + 1);
            flows.push(-equity_investment);
            flows.extend(ledger.iter().map(|r| r.cash_flow));
            if let Some(last) = flows.last_mut() {
                *last = last.checked_add(net_sale_proceeds).ok_or_else(|| {
                    UnderwritingError::out_of_range("exit_cap_rate", "Final-year cash flow")
                })?;
            }
            let solved = time_value::solve_irr(&flows, "Levered IRR", warnings);
            (solved.rate, solved.converged)
        }
    };

    if dscr < dec!(1.2) && !annual_debt_service.is_zero() {
        warnings.push(format!(
            "DSCR of {dscr:.2} is below 1.20x — lender covenant risk"
        ));
    }
    if loan_to_value > dec!(0.80) {
        warnings.push(format!(
            "LTV of {:.1}% exceeds 80% — high leverage",
            rate_to_percent(loan_to_value)
        ));
    }
    if exit_value < Decimal::ZERO {
        warnings.push("Exit value is negative — projected NOI turns negative".into());
    }

    Ok(ReturnMetrics {
        cap_rate,
        dscr,
        cash_on_cash,
        equity_investment,
        exit_noi,
        exit_value,
        net_sale_proceeds,
        equity_multiple,
        irr,
        irr_method: input.irr_method,
        irr_converged,
        loan_to_value,
    })
}

fn guarded_ratio(
    numerator: Decimal,
    denominator: Decimal,
    label: &str,
    warnings: &mut Vec<String>,
) -> Decimal {
    if denominator.is_zero() {
        warnings.push(format!("{label}: zero denominator, reported as 0"));
        return Decimal::ZERO;
    }
    numerator.checked_div(denominator).unwrap_or_else(|| {
        warnings.push(format!("{label}: ratio out of range, reported as 0"));
        Decimal::ZERO
    })
}
