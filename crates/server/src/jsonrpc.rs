//! JSON-RPC 2.0 envelope and method dispatch.
//!
//! One POST endpoint decodes the envelope, routes on the method name, and
//! re-wraps the handler's result. Handlers surface [`RpcError`] with the
//! standard codes: `-32601` unknown method, `-32602` invalid params,
//! `-32603` internal error.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use arclight_storage::StoreError;

use crate::AppState;
use crate::methods;

/// Method not found.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Invalid method parameters.
pub const INVALID_PARAMS: i64 = -32602;
/// Internal JSON-RPC error.
pub const INTERNAL_ERROR: i64 = -32603;

/// An incoming JSON-RPC request.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    /// Protocol version; expected to be "2.0".
    #[serde(default)]
    pub jsonrpc: String,
    /// Request identifier, echoed in the response.
    #[serde(default)]
    pub id: Value,
    /// Method name.
    pub method: String,
    /// Method parameters.
    #[serde(default)]
    pub params: Value,
}

/// An outgoing JSON-RPC response.
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

/// A JSON-RPC error object.
#[derive(Debug, Serialize)]
pub struct RpcError {
    /// Standard JSON-RPC error code.
    pub code: i64,
    /// Human-readable message, surfaced verbatim to the caller.
    pub message: String,
}

impl RpcError {
    /// Caller-supplied values are malformed.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self { code: INVALID_PARAMS, message: message.into() }
    }

    /// Something failed on our side of the request.
    pub fn internal(message: impl Into<String>) -> Self {
        Self { code: INTERNAL_ERROR, message: message.into() }
    }

    fn method_not_found(method: &str) -> Self {
        Self { code: METHOD_NOT_FOUND, message: format!("method not found: {method}") }
    }
}

impl From<StoreError> for RpcError {
    fn from(err: StoreError) -> Self {
        RpcError::internal(err.to_string())
    }
}

/// Axum handler for the JSON-RPC endpoint.
pub async fn handle(State(state): State<AppState>, Json(req): Json<RpcRequest>) -> Json<RpcResponse> {
    metrics::counter!("arclight_rpc_requests_total", "method" => req.method.clone()).increment(1);

    let id = req.id.clone();
    let outcome = dispatch(&state, &req);
    Json(match outcome {
        Ok(result) => RpcResponse { jsonrpc: "2.0", id, result: Some(result), error: None },
        Err(error) => {
            metrics::counter!("arclight_rpc_errors_total", "method" => req.method.clone())
                .increment(1);
            RpcResponse { jsonrpc: "2.0", id, result: None, error: Some(error) }
        },
    })
}

fn dispatch(state: &AppState, req: &RpcRequest) -> Result<Value, RpcError> {
    match req.method.as_str() {
        "getTransaction" => to_value(methods::get_transaction(state, params(req)?)?),
        "getLedger" => to_value(methods::get_ledger(state, params(req)?)?),
        "getLedgers" => to_value(methods::get_ledgers(state, params(req)?)?),
        "getLatestLedger" => to_value(methods::get_latest_ledger(state)?),
        other => Err(RpcError::method_not_found(other)),
    }
}

/// Decodes the request's params into the handler's request type.
fn params<T: serde::de::DeserializeOwned>(req: &RpcRequest) -> Result<T, RpcError> {
    serde_json::from_value(req.params.clone())
        .map_err(|e| RpcError::invalid_params(format!("invalid params: {e}")))
}

fn to_value<T: Serialize>(response: T) -> Result<Value, RpcError> {
    serde_json::to_value(response)
        .map_err(|e| RpcError::internal(format!("failed to encode response: {e}")))
}
