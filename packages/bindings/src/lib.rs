use napi::Result as NapiResult;
use napi_derive::napi;

use underwriting_core::ComputationOutput;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Underwriting
// ---------------------------------------------------------------------------

#[napi]
pub fn underwrite(input_json: String) -> NapiResult<String> {
    let input: underwriting_core::underwriting::RawUnderwritingInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        underwriting_core::underwriting::underwrite_raw(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn underwriting_sensitivity(input_json: String) -> NapiResult<String> {
    let raw: underwriting_core::underwriting::RawUnderwritingInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let input = underwriting_core::underwriting::normalize(&raw).map_err(to_napi_error)?;
    let output = underwriting_core::underwriting::calculate_sensitivity(&input)
        .map_err(to_napi_error)?;
    let report = ComputationOutput {
        result: output.result.to_report(),
        methodology: output.methodology,
        assumptions: output.assumptions,
        warnings: output.warnings,
        metadata: output.metadata,
    };
    serde_json::to_string(&report).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Debt
// ---------------------------------------------------------------------------

#[napi]
pub fn annual_debt_service(input_json: String) -> NapiResult<String> {
    let input: underwriting_core::underwriting::debt_service::LoanInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = underwriting_core::underwriting::debt_service::calculate_debt_service(&input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn amortization_schedule(input_json: String) -> NapiResult<String> {
    let input: underwriting_core::underwriting::debt_service::LoanInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = underwriting_core::underwriting::debt_service::amortization_schedule(&input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn size_debt(input_json: String) -> NapiResult<String> {
    let input: underwriting_core::debt_sizing::DebtSizingInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = underwriting_core::debt_sizing::size_debt(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Waterfall
// ---------------------------------------------------------------------------

#[napi]
pub fn calculate_waterfall(input_json: String) -> NapiResult<String> {
    let input: underwriting_core::waterfall::WaterfallInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        underwriting_core::waterfall::calculate_waterfall(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
