use napi::Result as NapiResult;
use napi_derive::napi;
use serde::de::DeserializeOwned;
use serde::Serialize;

use project_appraisal_core::AppraisalResult;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Parse the JSON input, run `f`, and serialise its output.
fn call<I, O>(input_json: &str, f: impl FnOnce(&I) -> AppraisalResult<O>) -> NapiResult<String>
where
    I: DeserializeOwned,
    O: Serialize,
{
    let input: I = serde_json::from_str(input_json).map_err(to_napi_error)?;
    let output = f(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Cash flows and valuation
// ---------------------------------------------------------------------------

#[napi]
pub fn project_cash_flows(input_json: String) -> NapiResult<String> {
    call(&input_json, project_appraisal_core::valuation::project_scenario)
}

#[napi]
pub fn appraise_project(input_json: String) -> NapiResult<String> {
    call(&input_json, project_appraisal_core::valuation::appraise_project)
}

#[napi]
pub fn value_cash_flows(input_json: String) -> NapiResult<String> {
    call(&input_json, project_appraisal_core::valuation::value_cash_flows)
}

#[napi]
pub fn appraise_perpetuities(input_json: String) -> NapiResult<String> {
    call(&input_json, project_appraisal_core::valuation::appraise_perpetuities)
}

// ---------------------------------------------------------------------------
// Uncertainty
// ---------------------------------------------------------------------------

#[napi]
pub fn run_monte_carlo(input_json: String) -> NapiResult<String> {
    call(&input_json, project_appraisal_core::monte_carlo::run_monte_carlo)
}

#[napi]
pub fn analyze_scenarios(input_json: String) -> NapiResult<String> {
    call(&input_json, project_appraisal_core::scenarios::analyze_scenarios)
}

#[napi]
pub fn analyze_sensitivity(input_json: String) -> NapiResult<String> {
    call(&input_json, project_appraisal_core::scenarios::analyze_sensitivity)
}
