use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::assumptions::{normalize, IrrMethod, RawUnderwritingInput, UnderwritingInput};
use super::debt_service::{annual_debt_service, loan_balance_after_years};
use super::metrics::compute_return_metrics;
use super::projection::{project_cash_flows, AnnualCashFlow};
use super::sensitivity::{analyze_sensitivity, SensitivityAnalysis, SensitivityReport};
use crate::types::*;
use crate::EngineResult;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Full underwriting result. Rates are decimals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnderwritingResult {
    /// Year-1 net operating income
    pub noi: Money,
    /// Year-1 effective gross income
    pub effective_gross_income: Money,
    /// Year-1 operating expenses
    pub operating_expenses: Money,
    pub cap_rate: Rate,
    pub dscr: Multiple,
    pub irr: Rate,
    pub irr_method: IrrMethod,
    pub irr_converged: bool,
    pub cash_on_cash: Rate,
    pub equity_multiple: Multiple,
    pub equity_investment: Money,
    pub exit_noi: Money,
    pub exit_value: Money,
    pub loan_to_value: Rate,
    pub annual_debt_service: Money,
    /// Scheduled balance outstanding at the end of the hold
    pub loan_balance_at_exit: Money,
    pub cash_flows: Vec<AnnualCashFlow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<SensitivityAnalysis>,
}

/// Boundary view of [`UnderwritingResult`]: every rate as a 0–100 percentage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnderwritingReport {
    pub noi: Money,
    pub effective_gross_income: Money,
    pub operating_expenses: Money,
    pub cap_rate_pct: Percent,
    pub dscr: Multiple,
    pub irr_pct: Percent,
    pub irr_method: IrrMethod,
    pub irr_converged: bool,
    pub cash_on_cash_pct: Percent,
    pub equity_multiple: Multiple,
    pub equity_investment: Money,
    pub exit_noi: Money,
    pub exit_value: Money,
    pub loan_to_value_pct: Percent,
    pub annual_debt_service: Money,
    pub loan_balance_at_exit: Money,
    pub cash_flows: Vec<AnnualCashFlow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<SensitivityReport>,
}

impl UnderwritingResult {
    pub fn to_report(&self) -> UnderwritingReport {
        UnderwritingReport {
            noi: self.noi,
            effective_gross_income: self.effective_gross_income,
            operating_expenses: self.operating_expenses,
            cap_rate_pct: rate_to_percent(self.cap_rate),
            dscr: self.dscr,
            irr_pct: rate_to_percent(self.irr),
            irr_method: self.irr_method,
            irr_converged: self.irr_converged,
            cash_on_cash_pct: rate_to_percent(self.cash_on_cash),
            equity_multiple: self.equity_multiple,
            equity_investment: self.equity_investment,
            exit_noi: self.exit_noi,
            exit_value: self.exit_value,
            loan_to_value_pct: rate_to_percent(self.loan_to_value),
            annual_debt_service: self.annual_debt_service,
            loan_balance_at_exit: self.loan_balance_at_exit,
            cash_flows: self.cash_flows.clone(),
            sensitivity: self.sensitivity.as_ref().map(SensitivityAnalysis::to_report),
        }
    }
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

/// Project the ledger and derive metrics for one set of assumptions.
///
/// This is the replayable core that the sensitivity analysis re-invokes; it
/// never attaches a sensitivity block itself.
pub fn evaluate(
    input: &UnderwritingInput,
    warnings: &mut Vec<String>,
) -> EngineResult<UnderwritingResult> {
    input.validate()?;

    let debt_service = annual_debt_service(
        input.loan_amount,
        input.interest_rate,
        input.amortization_years,
    )?;
    let ledger = project_cash_flows(input, debt_service)?;
    let metrics = compute_return_metrics(input, &ledger, debt_service, warnings)?;

    let hold = input.holding_period_years;
    let loan_balance_at_exit = loan_balance_after_years(
        input.loan_amount,
        input.interest_rate,
        input.amortization_years,
        hold.min(input.amortization_years),
    )?;
    if input.loan_amount > rust_decimal::Decimal::ZERO && input.loan_term_years < hold {
        warnings.push(format!(
            "Loan term ({}y) ends before the {hold}-year hold; refinancing is not modelled",
            input.loan_term_years
        ));
    }

    let year1 = ledger.first();
    Ok(UnderwritingResult {
        noi: year1.map(|r| r.noi).unwrap_or_default(),
        effective_gross_income: year1.map(|r| r.effective_gross_income).unwrap_or_default(),
        operating_expenses: year1.map(|r| r.operating_expenses).unwrap_or_default(),
        cap_rate: metrics.cap_rate,
        dscr: metrics.dscr,
        irr: metrics.irr,
        irr_method: metrics.irr_method,
        irr_converged: metrics.irr_converged,
        cash_on_cash: metrics.cash_on_cash,
        equity_multiple: metrics.equity_multiple,
        equity_investment: metrics.equity_investment,
        exit_noi: metrics.exit_noi,
        exit_value: metrics.exit_value,
        loan_to_value: metrics.loan_to_value,
        annual_debt_service: debt_service,
        loan_balance_at_exit,
        cash_flows: ledger,
        sensitivity: None,
    })
}

/// Underwrite a deal from normalized assumptions.
pub fn underwrite(
    input: &UnderwritingInput,
    include_sensitivity: bool,
) -> EngineResult<ComputationOutput<UnderwritingResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let mut result = evaluate(input, &mut warnings)?;
    if include_sensitivity {
        result.sensitivity = Some(analyze_sensitivity(input, &mut warnings)?);
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        methodology(input.irr_method),
        input,
        warnings,
        elapsed,
        result,
    ))
}

/// Underwrite straight from form-style assumptions and report percentages.
///
/// Sensitivity runs unless `include_sensitivity` is explicitly false.
pub fn underwrite_raw(
    raw: &RawUnderwritingInput,
) -> EngineResult<ComputationOutput<UnderwritingReport>> {
    let input = normalize(raw)?;
    let output = underwrite(&input, raw.include_sensitivity.unwrap_or(true))?;
    Ok(ComputationOutput {
        result: output.result.to_report(),
        methodology: output.methodology,
        assumptions: output.assumptions,
        warnings: output.warnings,
        metadata: output.metadata,
    })
}

fn methodology(method: IrrMethod) -> &'static str {
    match method {
        IrrMethod::AverageAnnualReturn => {
            "Direct-Cap Underwriting (annual ledger, average-annual-return IRR)"
        }
        IrrMethod::NewtonRaphson => "Direct-Cap Underwriting (annual ledger, Newton-Raphson IRR)",
    }
}
