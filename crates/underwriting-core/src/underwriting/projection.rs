use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::assumptions::UnderwritingInput;
use crate::error::UnderwritingError;
use crate::types::*;
use crate::EngineResult;

/// One row of the holding-period ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnualCashFlow {
    pub year: u32,
    pub gross_potential_income: Money,
    pub vacancy_loss: Money,
    pub effective_gross_income: Money,
    pub operating_expenses: Money,
    pub noi: Money,
    pub debt_service: Money,
    pub cash_flow: Money,
    pub cumulative_cash_flow: Money,
}

/// Build the annual ledger for years 1..=holding period.
///
/// Rent compounds at the rent growth rate and expenses at the expense growth
/// rate, both starting from year 1 values. Debt service is level. Growth that
/// carries a line item past the decimal range is an `InvalidInput` error.
pub fn project_cash_flows(
    input: &UnderwritingInput,
    annual_debt_service: Money,
) -> EngineResult<Vec<AnnualCashFlow>> {
    let n = input.holding_period_years as usize;
    let mut rows = Vec::with_capacity(n);

    let rent_step = Decimal::ONE + input.rent_growth_rate;
    let expense_step = Decimal::ONE + input.expense_growth_rate;
    let mut rent_factor = Decimal::ONE;
    let mut expense_factor = Decimal::ONE;
    let mut cumulative = Decimal::ZERO;

    for year in 1..=input.holding_period_years {
        if year > 1 {
            rent_factor = rent_factor
                .checked_mul(rent_step)
                .ok_or_else(|| UnderwritingError::out_of_range("rent_growth_rate", "Rent"))?;
            expense_factor = expense_factor.checked_mul(expense_step).ok_or_else(|| {
                UnderwritingError::out_of_range("expense_growth_rate", "Operating expenses")
            })?;
        }

        let gross_potential_income = (input.square_footage * input.rent_per_sf)
            .checked_mul(rent_factor)
            .and_then(|rent| rent.checked_add(input.other_income))
            .ok_or_else(|| {
                UnderwritingError::out_of_range("rent_growth_rate", "Gross potential income")
            })?;
        let vacancy_loss = gross_potential_income * input.vacancy_rate;
        let effective_gross_income = gross_potential_income - vacancy_loss;
        let operating_expenses = operating_expenses(input, effective_gross_income, expense_factor)
            .ok_or_else(|| {
                UnderwritingError::out_of_range("expense_growth_rate", "Operating expenses")
            })?;
        let noi = effective_gross_income
            .checked_sub(operating_expenses)
            .ok_or_else(|| UnderwritingError::out_of_range("expense_growth_rate", "NOI"))?;
        let cash_flow = noi
            .checked_sub(annual_debt_service)
            .ok_or_else(|| UnderwritingError::out_of_range("loan_amount", "Cash flow"))?;
        cumulative = cumulative.checked_add(cash_flow).ok_or_else(|| {
            UnderwritingError::out_of_range("holding_period_years", "Cumulative cash flow")
        })?;

        rows.push(AnnualCashFlow {
            year,
            gross_potential_income,
            vacancy_loss,
            effective_gross_income,
            operating_expenses,
            noi,
            debt_service: annual_debt_service,
            cash_flow,
            cumulative_cash_flow: cumulative,
        });
    }

    Ok(rows)
}

/// Flat per-sf opex, or the itemized build-up when any item is present.
fn operating_expenses(
    input: &UnderwritingInput,
    egi: Money,
    expense_factor: Decimal,
) -> Option<Money> {
    if !input.has_itemized_expenses() {
        return (input.opex_per_sf * input.square_footage).checked_mul(expense_factor);
    }

    let zero = Decimal::ZERO;
    let property_tax = input.purchase_price * input.property_tax_rate.unwrap_or(zero);
    let insurance = input.purchase_price * input.insurance_rate.unwrap_or(zero);
    let reserve = input.reserve_per_sf.unwrap_or(zero) * input.square_footage;
    let management = egi.checked_mul(input.management_fee_rate.unwrap_or(zero))?;

    (property_tax + insurance + reserve)
        .checked_mul(expense_factor)?
        .checked_add(management)
}

/// NOI one year past the hold, used to price the exit.
pub fn forward_exit_noi(final_year_noi: Money, noi_growth_rate: Rate) -> EngineResult<Money> {
    final_year_noi
        .checked_mul(Decimal::ONE + noi_growth_rate)
        .ok_or_else(|| UnderwritingError::out_of_range("noi_growth_rate", "Exit NOI"))
}
