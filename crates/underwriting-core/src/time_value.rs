use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::UnderwritingError;
use crate::types::{Money, Rate, SolvedIrr};
use crate::EngineResult;

const CONVERGENCE_THRESHOLD: Decimal = dec!(0.0000001);
pub const MAX_IRR_ITERATIONS: u32 = 100;
const DEFAULT_IRR_GUESS: Decimal = dec!(0.10);

/// Net Present Value of a series of cash flows
pub fn npv(rate: Rate, cash_flows: &[Money]) -> EngineResult<Money> {
    if rate <= dec!(-1) {
        return Err(UnderwritingError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    let mut result = Decimal::ZERO;
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = discount
                .checked_mul(one_plus_r)
                .ok_or_else(|| UnderwritingError::out_of_range("rate", "NPV discount factor"))?;
        }
        if discount.is_zero() {
            return Err(UnderwritingError::DivisionByZero {
                context: format!("NPV discount factor at period {t}"),
            });
        }
        result = cf
            .checked_div(discount)
            .and_then(|pv| result.checked_add(pv))
            .ok_or_else(|| UnderwritingError::out_of_range("cash_flows", "NPV"))?;
    }

    Ok(result)
}

/// Newton-Raphson IRR. Returns the rate and the iterations it took.
fn newton_irr(cash_flows: &[Money], guess: Rate) -> EngineResult<(Rate, u32)> {
    if cash_flows.len() < 2 {
        return Err(UnderwritingError::InsufficientData(
            "IRR requires at least 2 cash flows".into(),
        ));
    }
    let has_outflow = cash_flows.iter().any(|cf| cf.is_sign_negative() && !cf.is_zero());
    let has_inflow = cash_flows.iter().any(|cf| cf.is_sign_positive() && !cf.is_zero());
    if !has_outflow || !has_inflow {
        return Err(UnderwritingError::InsufficientData(
            "IRR requires at least one negative and one positive cash flow".into(),
        ));
    }

    let mut rate = guess;

    for i in 0..MAX_IRR_ITERATIONS {
        let diverged = |last_delta: Decimal| UnderwritingError::ConvergenceFailure {
            function: "IRR".into(),
            iterations: i,
            last_delta,
        };

        let (npv_val, dnpv) =
            npv_with_derivative(cash_flows, rate).ok_or_else(|| diverged(Decimal::MAX))?;

        if npv_val.abs() < CONVERGENCE_THRESHOLD {
            return Ok((rate, i + 1));
        }

        if dnpv.is_zero() {
            return Err(diverged(npv_val));
        }

        rate = npv_val
            .checked_div(dnpv)
            .and_then(|step| rate.checked_sub(step))
            .ok_or_else(|| diverged(npv_val))?;

        // Guard against divergence
        if rate < dec!(-0.99) {
            rate = dec!(-0.99);
        } else if rate > dec!(100.0) {
            rate = dec!(100.0);
        }
    }

    Err(UnderwritingError::ConvergenceFailure {
        function: "IRR".into(),
        iterations: MAX_IRR_ITERATIONS,
        last_delta: npv(rate, cash_flows).unwrap_or(Decimal::MAX),
    })
}

/// NPV and its derivative in the rate, or None when an intermediate value
/// leaves the decimal range.
///
/// A discount factor too large to represent makes its term vanish at 28
/// digits, so that term is dropped rather than treated as a failure.
fn npv_with_derivative(cash_flows: &[Money], rate: Rate) -> Option<(Decimal, Decimal)> {
    let one_plus_r = Decimal::ONE + rate;
    let mut npv_val = Decimal::ZERO;
    let mut dnpv = Decimal::ZERO;

    for (t, cf) in cash_flows.iter().enumerate() {
        let Some(discount) = one_plus_r.checked_powu(t as u64) else {
            continue;
        };
        if discount.is_zero() {
            return None;
        }
        npv_val = npv_val.checked_add(cf.checked_div(discount)?)?;
        if t > 0 {
            if let Some(next) = discount.checked_mul(one_plus_r) {
                let t_dec = Decimal::from(t as u64);
                dnpv = dnpv.checked_sub(t_dec.checked_mul(*cf)?.checked_div(next)?)?;
            }
        }
    }

    Some((npv_val, dnpv))
}

/// IRR that degrades to `converged: false` instead of returning an error.
///
/// Any failure (too few flows, no sign change, flat derivative, iteration
/// cap) is pushed onto `warnings` under `context`.
pub fn solve_irr(cash_flows: &[Money], context: &str, warnings: &mut Vec<String>) -> SolvedIrr {
    match newton_irr(cash_flows, DEFAULT_IRR_GUESS) {
        Ok((rate, iterations)) => SolvedIrr {
            rate,
            converged: true,
            iterations,
        },
        Err(UnderwritingError::ConvergenceFailure { iterations, .. }) => {
            warnings.push(format!(
                "{context}: IRR did not converge after {iterations} iterations"
            ));
            SolvedIrr::not_converged(Decimal::ZERO, iterations)
        }
        Err(e) => {
            warnings.push(format!("{context}: IRR unavailable ({e})"));
            SolvedIrr::not_converged(Decimal::ZERO, 0)
        }
    }
}

/// Present Value
pub fn pv(rate: Rate, nper: u32, pmt: Money, fv: Money) -> EngineResult<Money> {
    if rate.is_zero() {
        return Ok(-(pmt * Decimal::from(nper) + fv));
    }

    let one_plus_r = Decimal::ONE + rate;
    let factor = one_plus_r
        .checked_powu(u64::from(nper))
        .ok_or_else(|| UnderwritingError::out_of_range("rate", "PV compounding factor"))?;

    if factor.is_zero() {
        return Err(UnderwritingError::DivisionByZero {
            context: "PV factor".into(),
        });
    }

    let annuity_factor = (Decimal::ONE - Decimal::ONE / factor) / rate;
    pmt.checked_mul(annuity_factor)
        .and_then(|annuity| annuity.checked_add(fv / factor))
        .map(|value| -value)
        .ok_or_else(|| UnderwritingError::out_of_range("pmt", "PV"))
}

/// Payment (PMT)
pub fn pmt(rate: Rate, nper: u32, present_value: Money, future_value: Money) -> EngineResult<Money> {
    if nper == 0 {
        return Err(UnderwritingError::InvalidInput {
            field: "nper".into(),
            reason: "Number of periods must be > 0".into(),
        });
    }

    if rate.is_zero() {
        return Ok(-(present_value + future_value) / Decimal::from(nper));
    }

    let one_plus_r = Decimal::ONE + rate;
    let factor = one_plus_r
        .checked_powu(u64::from(nper))
        .ok_or_else(|| UnderwritingError::out_of_range("rate", "PMT compounding factor"))?;
    let annuity_factor = (factor - Decimal::ONE) / rate;

    if annuity_factor.is_zero() {
        return Err(UnderwritingError::DivisionByZero {
            context: "PMT annuity factor".into(),
        });
    }

    present_value
        .checked_mul(factor)
        .and_then(|fv_of_pv| fv_of_pv.checked_add(future_value))
        .and_then(|total| total.checked_div(annuity_factor))
        .map(|payment| -payment)
        .ok_or_else(|| UnderwritingError::out_of_range("present_value", "PMT"))
}
