use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::assumptions::UnderwritingInput;
use super::model::evaluate;
use crate::types::*;
use crate::EngineResult;

const RATE_SHIFTS: [Decimal; 5] = [dec!(-0.01), dec!(-0.005), dec!(0), dec!(0.005), dec!(0.01)];
const VACANCY_SHIFTS: [Decimal; 5] = [dec!(-0.025), dec!(-0.01), dec!(0), dec!(0.01), dec!(0.025)];

/// The assumptions the sensitivity analysis perturbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityAxis {
    ExitCapRate,
    RentGrowth,
    VacancyRate,
    InterestRate,
}

impl SensitivityAxis {
    pub const ALL: [SensitivityAxis; 4] = [
        SensitivityAxis::ExitCapRate,
        SensitivityAxis::RentGrowth,
        SensitivityAxis::VacancyRate,
        SensitivityAxis::InterestRate,
    ];

    fn shifts(self) -> &'static [Decimal; 5] {
        match self {
            SensitivityAxis::VacancyRate => &VACANCY_SHIFTS,
            _ => &RATE_SHIFTS,
        }
    }

    fn base(self, input: &UnderwritingInput) -> Rate {
        match self {
            SensitivityAxis::ExitCapRate => input.exit_cap_rate,
            SensitivityAxis::RentGrowth => input.rent_growth_rate,
            SensitivityAxis::VacancyRate => input.vacancy_rate,
            SensitivityAxis::InterestRate => input.interest_rate,
        }
    }

    fn in_domain(self, value: Rate) -> bool {
        match self {
            SensitivityAxis::ExitCapRate => value > Decimal::ZERO,
            SensitivityAxis::RentGrowth => value > dec!(-1),
            SensitivityAxis::VacancyRate => value >= Decimal::ZERO && value < Decimal::ONE,
            SensitivityAxis::InterestRate => value >= Decimal::ZERO,
        }
    }

    fn apply(self, input: &UnderwritingInput, value: Rate) -> UnderwritingInput {
        let mut perturbed = input.clone();
        match self {
            SensitivityAxis::ExitCapRate => perturbed.exit_cap_rate = value,
            SensitivityAxis::RentGrowth => perturbed.rent_growth_rate = value,
            SensitivityAxis::VacancyRate => perturbed.vacancy_rate = value,
            SensitivityAxis::InterestRate => perturbed.interest_rate = value,
        }
        perturbed
    }
}

/// One perturbed case: the input value and the IRR/exit value it produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensitivityPoint {
    /// Display label of the perturbed value, e.g. "6.5%"
    pub label: String,
    pub value: Rate,
    pub irr: Rate,
    pub exit_value: Money,
}

/// IRR under one-at-a-time perturbations. Points are in ascending value order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensitivityAnalysis {
    pub exit_cap_rate: Vec<SensitivityPoint>,
    pub rent_growth: Vec<SensitivityPoint>,
    pub vacancy_rate: Vec<SensitivityPoint>,
    pub interest_rate: Vec<SensitivityPoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensitivityPointReport {
    pub label: String,
    pub value_pct: Percent,
    pub irr_pct: Percent,
    pub exit_value: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensitivityReport {
    pub exit_cap_rate: Vec<SensitivityPointReport>,
    pub rent_growth: Vec<SensitivityPointReport>,
    pub vacancy_rate: Vec<SensitivityPointReport>,
    pub interest_rate: Vec<SensitivityPointReport>,
}

impl SensitivityAnalysis {
    pub fn axis(&self, axis: SensitivityAxis) -> &[SensitivityPoint] {
        match axis {
            SensitivityAxis::ExitCapRate => &self.exit_cap_rate,
            SensitivityAxis::RentGrowth => &self.rent_growth,
            SensitivityAxis::VacancyRate => &self.vacancy_rate,
            SensitivityAxis::InterestRate => &self.interest_rate,
        }
    }

    /// IRR for a label on one axis, e.g. `irr_at(ExitCapRate, "7.0%")`.
    pub fn irr_at(&self, axis: SensitivityAxis, label: &str) -> Option<Rate> {
        self.axis(axis)
            .iter()
            .find(|p| p.label == label)
            .map(|p| p.irr)
    }

    pub fn to_report(&self) -> SensitivityReport {
        let convert = |points: &[SensitivityPoint]| {
            points
                .iter()
                .map(|p| SensitivityPointReport {
                    label: p.label.clone(),
                    value_pct: rate_to_percent(p.value),
                    irr_pct: rate_to_percent(p.irr),
                    exit_value: p.exit_value,
                })
                .collect()
        };
        SensitivityReport {
            exit_cap_rate: convert(&self.exit_cap_rate),
            rent_growth: convert(&self.rent_growth),
            vacancy_rate: convert(&self.vacancy_rate),
            interest_rate: convert(&self.interest_rate),
        }
    }
}

/// Recompute IRR and exit value with one assumption perturbed at a time.
///
/// Perturbed values outside an assumption's valid range are skipped with a
/// warning. Warnings raised inside each re-run are not propagated.
pub fn analyze_sensitivity(
    input: &UnderwritingInput,
    warnings: &mut Vec<String>,
) -> EngineResult<SensitivityAnalysis> {
    input.validate()?;

    let mut run_axis = |axis: SensitivityAxis| -> Vec<SensitivityPoint> {
        let base = axis.base(input);
        let mut points = Vec::with_capacity(5);
        for shift in axis.shifts() {
            let value = base + shift;
            let label = rate_label(value);
            if !axis.in_domain(value) {
                warnings.push(format!("Sensitivity {axis:?} at {label} skipped: out of range"));
                continue;
            }
            let mut scratch = Vec::new();
            match evaluate(&axis.apply(input, value), &mut scratch) {
                Ok(result) => points.push(SensitivityPoint {
                    label,
                    value,
                    irr: result.irr,
                    exit_value: result.exit_value,
                }),
                Err(e) => {
                    warnings.push(format!("Sensitivity {axis:?} at {label} failed: {e}"));
                }
            }
        }
        points
    };

    Ok(SensitivityAnalysis {
        exit_cap_rate: run_axis(SensitivityAxis::ExitCapRate),
        rent_growth: run_axis(SensitivityAxis::RentGrowth),
        vacancy_rate: run_axis(SensitivityAxis::VacancyRate),
        interest_rate: run_axis(SensitivityAxis::InterestRate),
    })
}

/// Standalone sensitivity run wrapped in the standard envelope.
pub fn calculate_sensitivity(
    input: &UnderwritingInput,
) -> EngineResult<ComputationOutput<SensitivityAnalysis>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let analysis = analyze_sensitivity(input, &mut warnings)?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "One-Way Underwriting Sensitivity (exit cap, rent growth, vacancy, interest)",
        &serde_json::json!({
            "exit_cap_rate": input.exit_cap_rate.to_string(),
            "rent_growth_rate": input.rent_growth_rate.to_string(),
            "vacancy_rate": input.vacancy_rate.to_string(),
            "interest_rate": input.interest_rate.to_string(),
            "irr_method": input.irr_method,
        }),
        warnings,
        elapsed,
        analysis,
    ))
}
