use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use underwriting_core::underwriting::debt_service::{amortization_schedule, LoanInput};
use underwriting_core::UnderwritingError;
use underwriting_core::underwriting::metrics::NO_DEBT_DSCR;
use underwriting_core::underwriting::{
    normalize, underwrite, underwrite_raw, IrrMethod, RawUnderwritingInput, SensitivityAxis,
    UnderwritingResult, UnderwritingScenario,
};

fn reference_deal() -> RawUnderwritingInput {
    RawUnderwritingInput {
        purchase_price: dec!(1200000),
        rent_per_sf: dec!(27.5),
        square_footage: dec!(12000),
        vacancy_rate: Some(dec!(8)),
        opex_per_sf: Some(dec!(8.5)),
        loan_amount: Some(dec!(800000)),
        interest_rate: Some(dec!(6.5)),
        amortization_years: Some(30),
        holding_period_years: Some(5),
        ..Default::default()
    }
}

// ===========================================================================
// Reference deal
// ===========================================================================

#[test]
fn test_reference_deal_report() {
    let out = underwrite_raw(&reference_deal()).unwrap();
    let report = &out.result;

    // 330,000 GPI − 8% vacancy − 102,000 opex
    assert_eq!(report.noi, dec!(201600));
    assert_eq!(report.cap_rate_pct, dec!(16.8));
    assert_eq!(report.cash_flows.len(), 5);
    assert!((report.loan_to_value_pct - dec!(66.67)).abs() < dec!(0.01));
    assert!(report.dscr > dec!(3.3));
    assert!(report.irr_pct > Decimal::ZERO);
    assert!(report.equity_multiple > Decimal::ONE);

    let sens = report.sensitivity.as_ref().expect("sensitivity on by default");
    assert_eq!(sens.exit_cap_rate.len(), 5);
    assert_eq!(sens.rent_growth.len(), 5);
    assert_eq!(sens.vacancy_rate.len(), 5);
    assert_eq!(sens.interest_rate.len(), 5);
    assert_eq!(sens.exit_cap_rate[2].label, "6.5%");
}

#[test]
fn test_reference_deal_balance_at_exit_matches_schedule() {
    let input = normalize(&reference_deal()).unwrap();
    let result = underwrite(&input, false).unwrap().result;
    let schedule = amortization_schedule(&LoanInput {
        principal: dec!(800000),
        annual_rate: dec!(0.065),
        amortization_years: 30,
        term_years: Some(5),
    })
    .unwrap()
    .result;
    assert_eq!(result.loan_balance_at_exit, schedule.balloon_balance);
}

#[test]
fn test_newton_raphson_irr_converges_on_reference_deal() {
    let mut raw = reference_deal();
    raw.irr_method = Some(IrrMethod::NewtonRaphson);
    let result = underwrite(&normalize(&raw).unwrap(), false).unwrap().result;
    assert!(result.irr_converged);
    assert_eq!(result.irr_method, IrrMethod::NewtonRaphson);
    assert!(result.irr > Decimal::ZERO);
}

#[test]
fn test_newton_raphson_on_thin_equity_long_hold_never_panics() {
    // $1,000 of equity against a 20-year ledger pushes the solver to its clamp
    let mut raw = reference_deal();
    raw.loan_amount = Some(dec!(1199000));
    raw.interest_rate = Some(dec!(1));
    raw.holding_period_years = Some(20);
    raw.irr_method = Some(IrrMethod::NewtonRaphson);

    let out = underwrite_raw(&raw).unwrap();
    assert_eq!(out.result.cash_flows.len(), 20);
    if !out.result.irr_converged {
        assert!(out.warnings.iter().any(|w| w.contains("IRR")));
    }
}

#[test]
fn test_sensitivity_ranks_exit_cap() {
    let input = normalize(&reference_deal()).unwrap();
    let sens = underwrite(&input, true).unwrap().result.sensitivity.unwrap();
    let low = sens.irr_at(SensitivityAxis::ExitCapRate, "5.5%").unwrap();
    let high = sens.irr_at(SensitivityAxis::ExitCapRate, "7.5%").unwrap();
    assert!(low > high);
}

// ===========================================================================
// Degenerate inputs
// ===========================================================================

#[test]
fn test_zero_vacancy_egi_equals_gpi() {
    let mut raw = reference_deal();
    raw.vacancy_rate = Some(Decimal::ZERO);
    let result = underwrite(&normalize(&raw).unwrap(), false).unwrap().result;
    for row in &result.cash_flows {
        assert_eq!(row.effective_gross_income, row.gross_potential_income);
        assert_eq!(row.vacancy_loss, Decimal::ZERO);
    }
}

#[test]
fn test_zero_loan_reports_sentinel_dscr() {
    let mut raw = reference_deal();
    raw.loan_amount = Some(Decimal::ZERO);
    let out = underwrite(&normalize(&raw).unwrap(), false).unwrap();
    assert_eq!(out.result.annual_debt_service, Decimal::ZERO);
    assert_eq!(out.result.dscr, NO_DEBT_DSCR);
    assert_eq!(out.result.loan_to_value, Decimal::ZERO);
}

#[test]
fn test_zero_rent_degrades_without_error() {
    let mut raw = reference_deal();
    raw.rent_per_sf = Decimal::ZERO;
    raw.opex_per_sf = Some(Decimal::ZERO);
    let out = underwrite(&normalize(&raw).unwrap(), true).unwrap();
    assert_eq!(out.result.noi, Decimal::ZERO);
    assert_eq!(out.result.exit_value, Decimal::ZERO);
}

#[test]
fn test_invalid_inputs_fail_fast() {
    let mut raw = reference_deal();
    raw.purchase_price = dec!(-1);
    assert!(underwrite_raw(&raw).is_err());

    let mut raw = reference_deal();
    raw.square_footage = Decimal::ZERO;
    assert!(underwrite_raw(&raw).is_err());

    let mut raw = reference_deal();
    raw.amortization_years = Some(0);
    assert!(underwrite_raw(&raw).is_err());
}

#[test]
fn test_horizons_beyond_caps_rejected() {
    let mut raw = reference_deal();
    raw.holding_period_years = Some(2000);
    assert!(matches!(
        underwrite_raw(&raw),
        Err(UnderwritingError::InvalidInput { ref field, .. }) if field == "holding_period_years"
    ));

    let mut raw = reference_deal();
    raw.amortization_years = Some(1500);
    assert!(matches!(
        underwrite_raw(&raw),
        Err(UnderwritingError::InvalidInput { ref field, .. }) if field == "amortization_years"
    ));
}

#[test]
fn test_loan_above_price_rejected() {
    let mut raw = reference_deal();
    raw.loan_amount = Some(dec!(1500000));
    assert!(matches!(
        underwrite_raw(&raw),
        Err(UnderwritingError::InvalidInput { ref field, .. }) if field == "loan_amount"
    ));
}

// ===========================================================================
// Serialization and scenarios
// ===========================================================================

#[test]
fn test_result_round_trip_is_field_for_field_equal() {
    let input = normalize(&reference_deal()).unwrap();
    let result = underwrite(&input, true).unwrap().result;
    let json = serde_json::to_value(&result).unwrap();
    let back: UnderwritingResult = serde_json::from_value(json).unwrap();
    assert_eq!(back, result);
}

#[test]
fn test_scenario_update_recomputes() {
    let at = Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap();
    let base = UnderwritingScenario::create(
        "deal-7",
        "Base",
        normalize(&reference_deal()).unwrap(),
        at,
    )
    .unwrap();

    let mut raw = reference_deal();
    raw.exit_cap_rate = Some(dec!(7.5));
    let later = at + chrono::Duration::days(1);
    let updated = base
        .with_assumptions(normalize(&raw).unwrap(), later)
        .unwrap();

    assert!(updated.result.exit_value < base.result.exit_value);
    assert_eq!(updated.result.noi, base.result.noi);
    assert_eq!(updated.created_at, at);
    assert_eq!(updated.updated_at, later);
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_higher_exit_cap_lowers_exit_value(
        rent_cents in 1_500u32..6_000,
        opex_cents in 0u32..1_000,
        cap_bp in 300u32..1_200,
        bump_bp in 1u32..200,
    ) {
        let mut raw = reference_deal();
        raw.rent_per_sf = Decimal::from(rent_cents) / dec!(100);
        raw.opex_per_sf = Some(Decimal::from(opex_cents) / dec!(100));
        raw.exit_cap_rate = Some(Decimal::from(cap_bp) / dec!(100));
        let low = underwrite(&normalize(&raw).unwrap(), false).unwrap().result;

        raw.exit_cap_rate = Some(Decimal::from(cap_bp + bump_bp) / dec!(100));
        let high = underwrite(&normalize(&raw).unwrap(), false).unwrap().result;

        prop_assert_eq!(low.exit_noi, high.exit_noi);
        prop_assert!(high.exit_value < low.exit_value);
    }

    #[test]
    fn prop_cumulative_cash_flow_is_running_sum(
        vacancy_bp in 0u32..3_000,
        loan_k in 0u32..1_000,
        hold in 1u32..15,
    ) {
        let mut raw = reference_deal();
        raw.vacancy_rate = Some(Decimal::from(vacancy_bp) / dec!(100));
        raw.loan_amount = Some(Decimal::from(loan_k) * dec!(1000));
        raw.holding_period_years = Some(hold);
        let result = underwrite(&normalize(&raw).unwrap(), false).unwrap().result;

        prop_assert_eq!(result.cash_flows.len(), hold as usize);
        let mut running = Decimal::ZERO;
        for row in &result.cash_flows {
            running += row.cash_flow;
            prop_assert_eq!(row.cumulative_cash_flow, running);
        }
    }
}
