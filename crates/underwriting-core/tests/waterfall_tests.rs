use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use underwriting_core::waterfall::{calculate_waterfall, WaterfallInput, WaterfallTier};
use underwriting_core::UnderwritingError;

fn promote_structure() -> Vec<WaterfallTier> {
    vec![
        WaterfallTier::new(1, dec!(0.08), dec!(0), dec!(100)),
        WaterfallTier::new(2, dec!(0.12), dec!(20), dec!(80)),
        WaterfallTier::new(3, dec!(0.18), dec!(35), dec!(65)),
    ]
}

fn deal_flows() -> Vec<Decimal> {
    vec![
        dec!(100000),
        dec!(120000),
        dec!(130000),
        dec!(140000),
        dec!(1500000),
    ]
}

// ===========================================================================
// Known answers
// ===========================================================================

#[test]
fn test_single_tier_lp_takes_everything() {
    let input = WaterfallInput {
        tiers: vec![WaterfallTier::new(1, dec!(0.08), dec!(0), dec!(100))],
        lp_investment: dec!(1000000),
        gp_coinvest_fraction: None,
        cash_flows: deal_flows(),
        exit_year: 5,
    };
    let out = calculate_waterfall(&input).unwrap().result;

    for y in &out.years {
        assert_eq!(y.lp_distribution, y.total_cash_flow);
        assert_eq!(y.gp_distribution, Decimal::ZERO);
    }
    assert_eq!(out.total_gp + out.total_lp, dec!(1990000));
    assert_eq!(out.lp_pct_of_total, dec!(100));
    assert_eq!(out.gp.contributed, Decimal::ZERO);
    assert_eq!(out.gp.multiple, Decimal::ZERO);
}

#[test]
fn test_promote_only_after_pref_is_met() {
    let input = WaterfallInput {
        tiers: promote_structure(),
        lp_investment: dec!(1000000),
        gp_coinvest_fraction: None,
        cash_flows: deal_flows(),
        exit_year: 5,
    };
    let out = calculate_waterfall(&input).unwrap().result;

    // Interim years never clear the 8% pref on 1,000,000
    for y in &out.years[..4] {
        assert_eq!(y.gp_distribution, Decimal::ZERO);
        assert_eq!(y.active_tier, Some(1));
    }

    // Exit year cascades through all three tiers in hurdle order
    let exit = &out.years[4];
    let positions: Vec<u32> = exit.tier_allocations.iter().map(|a| a.position).collect();
    assert_eq!(positions, vec![1, 2, 3]);
    assert!(exit.gp_distribution > Decimal::ZERO);
    assert!(out.tiers[0].hurdle_met);
    assert!(out.tiers[1].hurdle_met);
    // Residual cash is not enough to lift investors to 18%
    assert!(!out.tiers[2].hurdle_met);

    // Tier 1 carried no promote
    assert_eq!(out.tiers[0].to_gp, Decimal::ZERO);
    assert!(out.lp.irr.converged);
    assert!(out.lp.irr.rate > dec!(0.12));
}

#[test]
fn test_hurdle_never_reached_keeps_first_split() {
    let input = WaterfallInput {
        tiers: promote_structure(),
        lp_investment: dec!(1000000),
        gp_coinvest_fraction: None,
        cash_flows: vec![dec!(50000), dec!(50000), dec!(800000)],
        exit_year: 3,
    };
    let out = calculate_waterfall(&input).unwrap();
    assert_eq!(out.result.total_gp, Decimal::ZERO);
    assert!(out.result.years.iter().all(|y| y.active_tier == Some(1)));
    assert!(!out.result.tiers[0].hurdle_met);
    assert!(out.result.lp.multiple < Decimal::ONE);
}

#[test]
fn test_shortfall_year_pays_investors_in_full() {
    // An 80/20 first tier still pays nothing to the GP until the 8% pref clears
    let input = WaterfallInput {
        tiers: vec![WaterfallTier::new(1, dec!(0.08), dec!(20), dec!(80))],
        lp_investment: dec!(1000),
        gp_coinvest_fraction: None,
        cash_flows: vec![dec!(500)],
        exit_year: 1,
    };
    let out = calculate_waterfall(&input).unwrap().result;
    assert_eq!(out.years[0].gp_distribution, Decimal::ZERO);
    assert_eq!(out.years[0].lp_distribution, dec!(500));
    assert_eq!(out.tiers[0].to_gp, Decimal::ZERO);
    assert!(!out.tiers[0].hurdle_met);
}

#[test]
fn test_equal_hurdles_break_ties_by_position() {
    let tiers = vec![
        WaterfallTier::new(2, dec!(0.08), dec!(50), dec!(50)),
        WaterfallTier::new(1, dec!(0.08), dec!(0), dec!(100)),
        WaterfallTier::new(3, dec!(0.15), dec!(30), dec!(70)),
    ];
    let input = WaterfallInput {
        tiers,
        lp_investment: dec!(1000),
        gp_coinvest_fraction: None,
        cash_flows: vec![dec!(2000)],
        exit_year: 1,
    };
    let out = calculate_waterfall(&input).unwrap().result;
    let first = &out.years[0].tier_allocations[0];
    assert_eq!(first.position, 1);
    // Position 1 clears the shared 8% hurdle, so position 2 is skipped
    assert_eq!(first.amount, dec!(1080));
    assert_eq!(out.years[0].tier_allocations[1].position, 3);
}

#[test]
fn test_capital_call_funded_pro_rata_with_coinvest() {
    // 900k LP at a 10% GP co-invest: total equity 1,000,000
    let input = WaterfallInput {
        tiers: vec![WaterfallTier::new(1, dec!(0.08), dec!(0), dec!(100))],
        lp_investment: dec!(900000),
        gp_coinvest_fraction: Some(dec!(0.1)),
        cash_flows: vec![dec!(-100000), dec!(60000), dec!(1400000)],
        exit_year: 3,
    };
    let out = calculate_waterfall(&input).unwrap().result;

    let call = &out.years[0];
    assert_eq!(call.gp_distribution, dec!(-10000));
    assert_eq!(call.lp_distribution, dec!(-90000));
    assert_eq!(call.active_tier, None);

    assert_eq!(out.gp.contributed, dec!(110000));
    assert_eq!(out.lp.contributed, dec!(990000));
    assert_eq!(out.gp.distributed, dec!(146000));
    assert_eq!(out.lp.distributed, dec!(1314000));
    assert!((out.gp.multiple - out.lp.multiple).abs() < dec!(0.000001));
    for y in &out.years {
        assert_eq!(y.gp_distribution + y.lp_distribution, y.total_cash_flow);
    }
}

#[test]
fn test_invalid_split_rejected() {
    let input = WaterfallInput {
        tiers: vec![WaterfallTier::new(1, dec!(0.08), dec!(25), dec!(80))],
        lp_investment: dec!(1000000),
        gp_coinvest_fraction: None,
        cash_flows: deal_flows(),
        exit_year: 5,
    };
    match calculate_waterfall(&input).unwrap_err() {
        UnderwritingError::InvalidInput { field, reason } => {
            assert_eq!(field, "tiers[0].gp_split");
            assert!(reason.contains("sum to 100"));
        }
        other => panic!("Expected InvalidInput, got: {other:?}"),
    }
}

#[test]
fn test_non_positive_investment_rejected() {
    let input = WaterfallInput {
        tiers: promote_structure(),
        lp_investment: Decimal::ZERO,
        gp_coinvest_fraction: None,
        cash_flows: deal_flows(),
        exit_year: 5,
    };
    assert!(calculate_waterfall(&input).is_err());
}

#[test]
fn test_output_serializes_percentages() {
    let input = WaterfallInput {
        tiers: promote_structure(),
        lp_investment: dec!(1000000),
        gp_coinvest_fraction: Some(dec!(0.05)),
        cash_flows: deal_flows(),
        exit_year: 5,
    };
    let out = calculate_waterfall(&input).unwrap();
    let json = serde_json::to_value(&out.result).unwrap();
    assert!(json["years"][0]["lp_pct"].is_string());
    assert!(json["lp"]["irr"]["converged"].as_bool().unwrap());
    assert!(out.methodology.contains("Waterfall"));
}

// ===========================================================================
// Properties
// ===========================================================================

fn tier_strategy() -> impl Strategy<Value = Vec<WaterfallTier>> {
    prop::collection::vec((0u32..2_500, 0u32..=100), 1..5).prop_map(|raw| {
        raw.into_iter()
            .enumerate()
            .map(|(i, (hurdle_bp, gp))| {
                WaterfallTier::new(
                    i as u32 + 1,
                    Decimal::from(hurdle_bp) / dec!(10000),
                    Decimal::from(gp),
                    Decimal::from(100 - gp),
                )
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_every_year_conserves_cash(
        tiers in tier_strategy(),
        investment_k in 1u32..5_000,
        coinvest_bp in 0u32..2_000,
        flows_k in prop::collection::vec(-500i64..3_000, 1..10),
    ) {
        let cash_flows: Vec<Decimal> = flows_k.iter().map(|k| Decimal::from(*k) * dec!(1000)).collect();
        let exit_year = cash_flows.len() as u32;
        let input = WaterfallInput {
            tiers,
            lp_investment: Decimal::from(investment_k) * dec!(1000),
            gp_coinvest_fraction: Some(Decimal::from(coinvest_bp) / dec!(10000)),
            cash_flows,
            exit_year,
        };
        let out = calculate_waterfall(&input).unwrap().result;

        for y in &out.years {
            let diff = (y.gp_distribution + y.lp_distribution - y.total_cash_flow).abs();
            prop_assert!(diff < dec!(0.000001), "year {} off by {}", y.year, diff);
            let routed: Decimal = y.tier_allocations.iter().map(|a| a.amount).sum();
            if y.total_cash_flow >= Decimal::ZERO {
                prop_assert!((routed - y.total_cash_flow).abs() < dec!(0.000001));
            }
        }
        let total_diff = (out.total_gp + out.total_lp - out.total_cash_flow).abs();
        prop_assert!(total_diff < dec!(0.000001));
    }

    #[test]
    fn prop_later_tier_only_after_earlier_satisfied(
        tiers in tier_strategy(),
        flows_k in prop::collection::vec(0i64..3_000, 1..8),
    ) {
        let cash_flows: Vec<Decimal> = flows_k.iter().map(|k| Decimal::from(*k) * dec!(1000)).collect();
        let exit_year = cash_flows.len() as u32;
        let input = WaterfallInput {
            tiers,
            lp_investment: dec!(1000000),
            gp_coinvest_fraction: None,
            cash_flows,
            exit_year,
        };
        let out = calculate_waterfall(&input).unwrap().result;

        // Replay each tier's hurdle balance from the reported investor cash
        let mut balances = vec![dec!(1000000); out.tiers.len()];
        for y in &out.years {
            for (balance, tier) in balances.iter_mut().zip(&out.tiers) {
                if *balance > Decimal::ZERO {
                    *balance *= Decimal::ONE + tier.hurdle_rate;
                }
            }
            for a in &y.tier_allocations {
                let k = out.tiers.iter().position(|t| t.position == a.position).unwrap();
                for (j, earlier) in balances[..k].iter().enumerate() {
                    prop_assert!(
                        *earlier <= dec!(0.000001),
                        "year {}: tier {} paid while tier {} still owed {}",
                        y.year, a.position, out.tiers[j].position, earlier
                    );
                }
                for balance in balances.iter_mut() {
                    *balance -= a.to_lp;
                }
            }
        }
    }
}
