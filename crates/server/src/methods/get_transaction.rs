//! The `getTransaction` method.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use arclight_types::parse_tx_hash;

use crate::AppState;
use crate::jsonrpc::RpcError;
use crate::methods::{
    BlobFormat, RangeInfo, b64, envelope_json, opaque_json, opt_i64_string, parse_format,
    result_json,
};

/// The transaction was included in a ledger and executed without errors.
pub const STATUS_SUCCESS: &str = "SUCCESS";
/// The transaction is not indexed within the current retention window.
pub const STATUS_NOT_FOUND: &str = "NOT_FOUND";
/// The transaction was included in a ledger and failed during execution.
pub const STATUS_FAILED: &str = "FAILED";

/// Request for `getTransaction`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTransactionRequest {
    /// Hex-encoded transaction hash (64 characters).
    pub hash: String,
    /// Optional blob rendering, "base64" (default) or "json".
    #[serde(default)]
    pub xdr_format: Option<String>,
}

/// Response for `getTransaction`.
///
/// The range fields are always present, even for `NOT_FOUND`, so callers can
/// report the window the negative answer was drawn from. The per-transaction
/// fields appear only when the transaction was found.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTransactionResponse {
    /// One of [`STATUS_SUCCESS`], [`STATUS_NOT_FOUND`], [`STATUS_FAILED`].
    pub status: &'static str,
    /// The retained window this answer was drawn from.
    #[serde(flatten)]
    pub range: RangeInfo,

    /// 1-based index of the transaction within its ledger.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_order: Option<i32>,
    /// Whether the envelope is a fee-bump envelope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee_bump: Option<bool>,
    /// Sequence of the ledger that included the transaction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger: Option<u32>,
    /// Close time of that ledger.
    #[serde(with = "opt_i64_string", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub envelope_xdr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub envelope_json: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_xdr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_json: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_meta_xdr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_meta_json: Option<Value>,

    /// Diagnostic events, attached whenever execution recorded any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic_events_xdr: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic_events_json: Option<Vec<Value>>,
}

impl GetTransactionResponse {
    fn not_found(range: RangeInfo) -> Self {
        Self {
            status: STATUS_NOT_FOUND,
            range,
            application_order: None,
            fee_bump: None,
            ledger: None,
            created_at: None,
            envelope_xdr: None,
            envelope_json: None,
            result_xdr: None,
            result_json: None,
            result_meta_xdr: None,
            result_meta_json: None,
            diagnostic_events_xdr: None,
            diagnostic_events_json: None,
        }
    }
}

/// Looks up one transaction by hash and classifies its status.
pub fn get_transaction(
    state: &AppState,
    request: GetTransactionRequest,
) -> Result<GetTransactionResponse, RpcError> {
    let format = parse_format(request.xdr_format.as_deref())?;
    let hash =
        parse_tx_hash(&request.hash).map_err(|e| RpcError::invalid_params(e.to_string()))?;

    let range = state
        .ledgers
        .get_ledger_range()
        .map_err(|e| RpcError::internal(format!("unable to get ledger range: {e}")))?;

    let tx = match state.transactions.get_transaction(&hash) {
        Ok(Some(tx)) => tx,
        Ok(None) => return Ok(GetTransactionResponse::not_found(range.into())),
        Err(e) => {
            tracing::error!(hash = %hex::encode(hash), error = %e, "failed to fetch transaction");
            return Err(e.into());
        },
    };

    let mut response = GetTransactionResponse::not_found(range.into());
    response.status = if tx.successful { STATUS_SUCCESS } else { STATUS_FAILED };
    response.application_order = Some(tx.application_order as i32);
    response.fee_bump = Some(tx.fee_bump);
    response.ledger = Some(tx.ledger_sequence);
    response.created_at = Some(tx.ledger_close_time);

    match format {
        BlobFormat::Json => {
            response.envelope_json = Some(envelope_json(&tx.envelope)?);
            response.result_json = Some(result_json(&tx.result)?);
            response.result_meta_json = Some(opaque_json(&tx.meta));
            if !tx.events.is_empty() {
                response.diagnostic_events_json =
                    Some(tx.events.iter().map(|e| opaque_json(e)).collect());
            }
        },
        BlobFormat::Base64 => {
            response.envelope_xdr = Some(b64(&tx.envelope));
            response.result_xdr = Some(b64(&tx.result));
            response.result_meta_xdr = Some(b64(&tx.meta));
            if !tx.events.is_empty() {
                response.diagnostic_events_xdr =
                    Some(tx.events.iter().map(|e| b64(e)).collect());
            }
        },
    }

    Ok(response)
}
