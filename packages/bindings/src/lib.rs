//! Node bindings: every function takes a JSON input document and returns the
//! JSON output envelope, so callers share the CLI's input schema.

use napi::Result as NapiResult;
use napi_derive::napi;
use serde::de::DeserializeOwned;
use serde::Serialize;

use valuekit_core::ValuationResult;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Parse `input_json`, run `calc`, serialise its output.
fn run_json<I, O, F>(input_json: &str, calc: F) -> NapiResult<String>
where
    I: DeserializeOwned,
    O: Serialize,
    F: FnOnce(&I) -> ValuationResult<O>,
{
    let input: I = serde_json::from_str(input_json).map_err(to_napi_error)?;
    let output = calc(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Valuation
// ---------------------------------------------------------------------------

#[napi]
pub fn calculate_capm(input_json: String) -> NapiResult<String> {
    run_json(&input_json, valuekit_core::valuation::capm::calculate_capm)
}

#[napi]
pub fn calculate_dcf(input_json: String) -> NapiResult<String> {
    run_json(&input_json, valuekit_core::valuation::dcf::calculate_dcf)
}

#[napi]
pub fn compare_peer_dcf(input_json: String) -> NapiResult<String> {
    run_json(
        &input_json,
        valuekit_core::valuation::peer_comparison::compare_peer_dcf,
    )
}

#[napi]
pub fn derive_free_cash_flow(input_json: String) -> NapiResult<String> {
    run_json(&input_json, valuekit_core::financials::derive_free_cash_flow)
}

// ---------------------------------------------------------------------------
// Dividends
// ---------------------------------------------------------------------------

#[napi]
pub fn calculate_ddm(input_json: String) -> NapiResult<String> {
    run_json(&input_json, valuekit_core::dividend_policy::ddm::calculate_ddm)
}

// ---------------------------------------------------------------------------
// Comps and scenarios
// ---------------------------------------------------------------------------

#[napi]
pub fn score_peers(input_json: String) -> NapiResult<String> {
    run_json(
        &input_json,
        valuekit_core::comps::scoring::calculate_peer_scores,
    )
}

#[napi]
pub fn sensitivity_grid(input_json: String) -> NapiResult<String> {
    run_json(
        &input_json,
        valuekit_core::scenarios::sensitivity::calculate_sensitivity,
    )
}
