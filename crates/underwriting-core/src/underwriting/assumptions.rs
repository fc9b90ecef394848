use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::UnderwritingError;
use crate::types::*;
use crate::underwriting::debt_service::MAX_AMORTIZATION_YEARS;
use crate::EngineResult;

// ---------------------------------------------------------------------------
// Defaults (boundary percentages)
// ---------------------------------------------------------------------------

pub const DEFAULT_EXIT_CAP_PCT: Percent = dec!(6.5);
pub const DEFAULT_NOI_GROWTH_PCT: Percent = dec!(3.0);
pub const DEFAULT_EXPENSE_GROWTH_PCT: Percent = dec!(2.5);
pub const DEFAULT_VACANCY_PCT: Percent = dec!(5.0);
pub const DEFAULT_INTEREST_RATE_PCT: Percent = dec!(6.5);
pub const DEFAULT_HOLDING_PERIOD_YEARS: u32 = 5;
pub const DEFAULT_AMORTIZATION_YEARS: u32 = 30;

/// Longest projection the engine will run.
pub const MAX_HOLDING_PERIOD_YEARS: u32 = 100;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How the headline IRR is computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrrMethod {
    /// Total profit / holding period / equity. Matches the legacy figures.
    #[default]
    AverageAnnualReturn,
    /// Root of NPV = 0 on (−equity, CF₁ … CFₙ + net sale proceeds).
    NewtonRaphson,
}

/// Underwriting assumptions as entered on a deal form.
///
/// Rates are percentages (6.5 = 6.5%) and almost everything is optional;
/// [`normalize`] turns this into a fully populated [`UnderwritingInput`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawUnderwritingInput {
    pub purchase_price: Money,
    pub rent_per_sf: Money,
    pub square_footage: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_cap_rate: Option<Percent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noi_growth_rate: Option<Percent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rent_growth_rate: Option<Percent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expense_growth_rate: Option<Percent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holding_period_years: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vacancy_rate: Option<Percent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opex_per_sf: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_income: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_tax_rate: Option<Percent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurance_rate: Option<Percent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub management_fee_rate: Option<Percent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserve_per_sf: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_amount: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest_rate: Option<Percent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amortization_years: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_term_years: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_fee_rate: Option<Percent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub irr_method: Option<IrrMethod>,
    /// Run the four-axis sensitivity analysis alongside the base case
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_sensitivity: Option<bool>,
}

/// Fully populated underwriting assumptions. All rates are decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnderwritingInput {
    /// Acquisition price
    pub purchase_price: Money,
    /// Cap rate applied to forward NOI at sale
    pub exit_cap_rate: Rate,
    /// Annual NOI growth (drives exit NOI, and rent when no rent growth given)
    pub noi_growth_rate: Rate,
    /// Annual market rent growth
    pub rent_growth_rate: Rate,
    /// Annual operating expense growth
    pub expense_growth_rate: Rate,
    pub holding_period_years: u32,
    /// Annual rent per rentable square foot
    pub rent_per_sf: Money,
    /// Vacancy and credit loss as a share of gross potential income
    pub vacancy_rate: Rate,
    /// Rentable area
    pub square_footage: Decimal,
    /// Flat annual operating expense per square foot
    pub opex_per_sf: Money,
    /// Parking, signage and other non-rent income (annual, not grown)
    pub other_income: Money,
    /// Property tax as a share of purchase price
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_tax_rate: Option<Rate>,
    /// Insurance premium as a share of purchase price
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurance_rate: Option<Rate>,
    /// Management fee as a share of effective gross income
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub management_fee_rate: Option<Rate>,
    /// Replacement reserve per square foot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserve_per_sf: Option<Money>,
    pub loan_amount: Money,
    /// Annual nominal interest rate
    pub interest_rate: Rate,
    pub amortization_years: u32,
    /// Years until the loan matures (balloon)
    pub loan_term_years: u32,
    /// Origination fee as a share of the loan amount
    pub loan_fee_rate: Rate,
    #[serde(default)]
    pub irr_method: IrrMethod,
}

impl UnderwritingInput {
    /// True when any itemized expense input replaces the flat per-sf opex.
    pub fn has_itemized_expenses(&self) -> bool {
        self.property_tax_rate.is_some()
            || self.insurance_rate.is_some()
            || self.management_fee_rate.is_some()
            || self.reserve_per_sf.is_some()
    }

    /// Loan origination fees paid at close.
    pub fn loan_fees(&self) -> Money {
        self.loan_amount * self.loan_fee_rate
    }

    /// Cash equity at close: price − loan + loan fees.
    pub fn equity_investment(&self) -> Money {
        self.purchase_price - self.loan_amount + self.loan_fees()
    }

    /// Reject inputs the engine cannot compute on.
    pub fn validate(&self) -> EngineResult<()> {
        if self.purchase_price <= Decimal::ZERO {
            return Err(UnderwritingError::invalid(
                "purchase_price",
                "Purchase price must be positive",
            ));
        }
        if self.square_footage <= Decimal::ZERO {
            return Err(UnderwritingError::invalid(
                "square_footage",
                "Square footage must be positive",
            ));
        }
        if self.rent_per_sf < Decimal::ZERO {
            return Err(UnderwritingError::invalid(
                "rent_per_sf",
                "Rent per square foot cannot be negative",
            ));
        }
        if !(1..=MAX_HOLDING_PERIOD_YEARS).contains(&self.holding_period_years) {
            return Err(UnderwritingError::invalid(
                "holding_period_years",
                format!("Holding period must be between 1 and {MAX_HOLDING_PERIOD_YEARS} years"),
            ));
        }
        if !(1..=MAX_AMORTIZATION_YEARS).contains(&self.amortization_years) {
            return Err(UnderwritingError::invalid(
                "amortization_years",
                format!("Amortization must be between 1 and {MAX_AMORTIZATION_YEARS} years"),
            ));
        }
        if self.exit_cap_rate <= Decimal::ZERO {
            return Err(UnderwritingError::invalid(
                "exit_cap_rate",
                "Exit cap rate must be positive",
            ));
        }
        if self.vacancy_rate < Decimal::ZERO || self.vacancy_rate >= Decimal::ONE {
            return Err(UnderwritingError::invalid(
                "vacancy_rate",
                "Vacancy rate must be between 0 and 1 (exclusive upper)",
            ));
        }
        if self.opex_per_sf < Decimal::ZERO {
            return Err(UnderwritingError::invalid(
                "opex_per_sf",
                "Operating expense per square foot cannot be negative",
            ));
        }
        if self.loan_amount < Decimal::ZERO {
            return Err(UnderwritingError::invalid(
                "loan_amount",
                "Loan amount cannot be negative",
            ));
        }
        if self.loan_amount > self.purchase_price {
            return Err(UnderwritingError::invalid(
                "loan_amount",
                "Loan amount cannot exceed the purchase price",
            ));
        }
        if self.interest_rate < Decimal::ZERO {
            return Err(UnderwritingError::invalid(
                "interest_rate",
                "Interest rate cannot be negative",
            ));
        }
        if self.loan_fee_rate < Decimal::ZERO || self.loan_fee_rate >= Decimal::ONE {
            return Err(UnderwritingError::invalid(
                "loan_fee_rate",
                "Loan fee rate must be between 0 and 1 (exclusive upper)",
            ));
        }
        for (field, rate) in [
            ("property_tax_rate", self.property_tax_rate),
            ("insurance_rate", self.insurance_rate),
            ("management_fee_rate", self.management_fee_rate),
            ("reserve_per_sf", self.reserve_per_sf),
        ] {
            if rate.is_some_and(|r| r < Decimal::ZERO) {
                return Err(UnderwritingError::invalid(field, "Cannot be negative"));
            }
        }
        for (field, rate) in [
            ("noi_growth_rate", self.noi_growth_rate),
            ("rent_growth_rate", self.rent_growth_rate),
            ("expense_growth_rate", self.expense_growth_rate),
        ] {
            if rate <= dec!(-1) {
                return Err(UnderwritingError::invalid(
                    field,
                    "Growth rate must be greater than -100%",
                ));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Fill defaults, convert percentages to decimals, and validate.
pub fn normalize(raw: &RawUnderwritingInput) -> EngineResult<UnderwritingInput> {
    let pct = |v: Option<Percent>, default: Percent| percent_to_rate(v.unwrap_or(default));

    let noi_growth_rate = pct(raw.noi_growth_rate, DEFAULT_NOI_GROWTH_PCT);
    let rent_growth_rate = raw
        .rent_growth_rate
        .map(percent_to_rate)
        .unwrap_or(noi_growth_rate);
    let amortization_years = raw.amortization_years.unwrap_or(DEFAULT_AMORTIZATION_YEARS);

    let input = UnderwritingInput {
        purchase_price: raw.purchase_price,
        exit_cap_rate: pct(raw.exit_cap_rate, DEFAULT_EXIT_CAP_PCT),
        noi_growth_rate,
        rent_growth_rate,
        expense_growth_rate: pct(raw.expense_growth_rate, DEFAULT_EXPENSE_GROWTH_PCT),
        holding_period_years: raw
            .holding_period_years
            .unwrap_or(DEFAULT_HOLDING_PERIOD_YEARS),
        rent_per_sf: raw.rent_per_sf,
        vacancy_rate: pct(raw.vacancy_rate, DEFAULT_VACANCY_PCT),
        square_footage: raw.square_footage,
        opex_per_sf: raw.opex_per_sf.unwrap_or(Decimal::ZERO),
        other_income: raw.other_income.unwrap_or(Decimal::ZERO),
        property_tax_rate: raw.property_tax_rate.map(percent_to_rate),
        insurance_rate: raw.insurance_rate.map(percent_to_rate),
        management_fee_rate: raw.management_fee_rate.map(percent_to_rate),
        reserve_per_sf: raw.reserve_per_sf,
        loan_amount: raw.loan_amount.unwrap_or(Decimal::ZERO),
        interest_rate: pct(raw.interest_rate, DEFAULT_INTEREST_RATE_PCT),
        amortization_years,
        loan_term_years: raw.loan_term_years.unwrap_or(amortization_years),
        loan_fee_rate: pct(raw.loan_fee_rate, Decimal::ZERO),
        irr_method: raw.irr_method.unwrap_or_default(),
    };

    input.validate()?;
    Ok(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn minimal_raw() -> RawUnderwritingInput {
        RawUnderwritingInput {
            purchase_price: dec!(1200000),
            rent_per_sf: dec!(27.5),
            square_footage: dec!(12000),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_filled() {
        let input = normalize(&minimal_raw()).unwrap();
        assert_eq!(input.exit_cap_rate, dec!(0.065));
        assert_eq!(input.noi_growth_rate, dec!(0.03));
        assert_eq!(input.expense_growth_rate, dec!(0.025));
        assert_eq!(input.vacancy_rate, dec!(0.05));
        assert_eq!(input.interest_rate, dec!(0.065));
        assert_eq!(input.holding_period_years, 5);
        assert_eq!(input.amortization_years, 30);
        assert_eq!(input.loan_term_years, 30);
        assert_eq!(input.loan_amount, Decimal::ZERO);
        assert_eq!(input.irr_method, IrrMethod::AverageAnnualReturn);
        assert!(!input.has_itemized_expenses());
    }

    #[test]
    fn test_rent_growth_falls_back_to_noi_growth() {
        let mut raw = minimal_raw();
        raw.noi_growth_rate = Some(dec!(4));
        let input = normalize(&raw).unwrap();
        assert_eq!(input.rent_growth_rate, dec!(0.04));

        raw.rent_growth_rate = Some(dec!(2));
        let input = normalize(&raw).unwrap();
        assert_eq!(input.rent_growth_rate, dec!(0.02));
        assert_eq!(input.noi_growth_rate, dec!(0.04));
    }

    #[test]
    fn test_percent_fields_converted() {
        let mut raw = minimal_raw();
        raw.vacancy_rate = Some(dec!(8));
        raw.loan_fee_rate = Some(dec!(1));
        raw.property_tax_rate = Some(dec!(1.2));
        raw.management_fee_rate = Some(dec!(3));
        let input = normalize(&raw).unwrap();
        assert_eq!(input.vacancy_rate, dec!(0.08));
        assert_eq!(input.loan_fee_rate, dec!(0.01));
        assert_eq!(input.property_tax_rate, Some(dec!(0.012)));
        assert_eq!(input.management_fee_rate, Some(dec!(0.03)));
        assert!(input.has_itemized_expenses());
    }

    #[test]
    fn test_loan_term_defaults_to_amortization() {
        let mut raw = minimal_raw();
        raw.amortization_years = Some(25);
        let input = normalize(&raw).unwrap();
        assert_eq!(input.loan_term_years, 25);
    }

    #[test]
    fn test_equity_investment_includes_fees() {
        let mut raw = minimal_raw();
        raw.loan_amount = Some(dec!(800000));
        raw.loan_fee_rate = Some(dec!(1));
        let input = normalize(&raw).unwrap();
        assert_eq!(input.loan_fees(), dec!(8000));
        assert_eq!(input.equity_investment(), dec!(408000));
    }

    #[test]
    fn test_zero_price_rejected() {
        let mut raw = minimal_raw();
        raw.purchase_price = Decimal::ZERO;
        match normalize(&raw).unwrap_err() {
            UnderwritingError::InvalidInput { field, .. } => assert_eq!(field, "purchase_price"),
            other => panic!("Expected InvalidInput, got: {other:?}"),
        }
    }

    #[test]
    fn test_zero_area_rejected() {
        let mut raw = minimal_raw();
        raw.square_footage = Decimal::ZERO;
        assert!(normalize(&raw).is_err());
    }

    #[test]
    fn test_zero_amortization_rejected() {
        let mut raw = minimal_raw();
        raw.amortization_years = Some(0);
        match normalize(&raw).unwrap_err() {
            UnderwritingError::InvalidInput { field, .. } => {
                assert_eq!(field, "amortization_years")
            }
            other => panic!("Expected InvalidInput, got: {other:?}"),
        }
    }

    #[test]
    fn test_holding_period_beyond_cap_rejected() {
        let mut raw = minimal_raw();
        raw.holding_period_years = Some(2000);
        match normalize(&raw).unwrap_err() {
            UnderwritingError::InvalidInput { field, .. } => {
                assert_eq!(field, "holding_period_years")
            }
            other => panic!("Expected InvalidInput, got: {other:?}"),
        }

        raw.holding_period_years = Some(MAX_HOLDING_PERIOD_YEARS);
        assert!(normalize(&raw).is_ok());
    }

    #[test]
    fn test_amortization_beyond_cap_rejected() {
        let mut raw = minimal_raw();
        raw.amortization_years = Some(1500);
        raw.loan_amount = Some(dec!(800000));
        match normalize(&raw).unwrap_err() {
            UnderwritingError::InvalidInput { field, .. } => {
                assert_eq!(field, "amortization_years")
            }
            other => panic!("Expected InvalidInput, got: {other:?}"),
        }
    }

    #[test]
    fn test_loan_above_price_rejected() {
        let mut raw = minimal_raw();
        raw.loan_amount = Some(dec!(1300000));
        match normalize(&raw).unwrap_err() {
            UnderwritingError::InvalidInput { field, .. } => assert_eq!(field, "loan_amount"),
            other => panic!("Expected InvalidInput, got: {other:?}"),
        }

        // Fully financed is still a deal; equity is just the fees
        raw.loan_amount = Some(dec!(1200000));
        raw.loan_fee_rate = Some(dec!(1));
        let input = normalize(&raw).unwrap();
        assert_eq!(input.equity_investment(), dec!(12000));
    }

    #[test]
    fn test_full_vacancy_rejected() {
        let mut raw = minimal_raw();
        raw.vacancy_rate = Some(dec!(100));
        assert!(normalize(&raw).is_err());
    }

    #[test]
    fn test_raw_input_from_sparse_json() {
        let raw: RawUnderwritingInput = serde_json::from_value(serde_json::json!({
            "purchase_price": "1200000",
            "rent_per_sf": "27.5",
            "square_footage": "12000",
            "irr_method": "newton_raphson"
        }))
        .unwrap();
        let input = normalize(&raw).unwrap();
        assert_eq!(input.irr_method, IrrMethod::NewtonRaphson);
        assert_eq!(input.opex_per_sf, Decimal::ZERO);
    }
}
