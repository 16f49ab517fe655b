//! The ledger-facing methods: `getLedger`, `getLedgers`, `getLatestLedger`.

use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use arclight_types::{SealedLedger, wire};

use crate::AppState;
use crate::jsonrpc::RpcError;
use crate::methods::{
    BlobFormat, RangeInfo, b64, envelope_json, i64_string, opaque_json, parse_format,
    result_json,
};

/// Default page size for `getLedgers`.
pub const DEFAULT_GET_LEDGERS_LIMIT: u32 = 50;
/// Hard cap on the `getLedgers` page size.
pub const MAX_GET_LEDGERS_LIMIT: u32 = 200;

/// One encoded ledger in a response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    /// Ledger sequence number.
    pub sequence: u32,
    /// Close time of the ledger.
    #[serde(with = "i64_string")]
    pub close_time: i64,
    /// Canonical record bytes, base64-encoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger_xdr: Option<String>,
    /// Structured decoded form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger_json: Option<Value>,
}

impl LedgerEntry {
    fn build(ledger: &SealedLedger, format: BlobFormat) -> Result<Self, RpcError> {
        let mut entry = Self {
            sequence: ledger.sequence,
            close_time: ledger.close_time,
            ledger_xdr: None,
            ledger_json: None,
        };
        match format {
            BlobFormat::Base64 => {
                let raw = wire::encode_sealed_ledger(ledger)
                    .map_err(|e| RpcError::internal(format!("failed to encode ledger: {e}")))?;
                entry.ledger_xdr = Some(b64(&raw));
            },
            BlobFormat::Json => entry.ledger_json = Some(ledger_json(ledger)?),
        }
        Ok(entry)
    }
}

/// Structured JSON form of a whole sealed ledger.
fn ledger_json(ledger: &SealedLedger) -> Result<Value, RpcError> {
    let mut transactions = Vec::with_capacity(ledger.transactions.len());
    for tx in &ledger.transactions {
        transactions.push(json!({
            "hash": hex::encode(tx.hash()),
            "envelope": envelope_json(&tx.envelope)?,
            "result": result_json(&tx.result)?,
            "meta": opaque_json(&tx.meta),
            "events": tx.events.iter().map(|e| opaque_json(e)).collect::<Vec<_>>(),
        }));
    }
    Ok(json!({
        "sequence": ledger.sequence,
        "closeTime": ledger.close_time.to_string(),
        "header": b64(&ledger.header),
        "transactions": transactions,
    }))
}

/// Request for `getLedger`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetLedgerRequest {
    /// Sequence of the ledger to fetch.
    pub sequence: u32,
    /// Optional blob rendering, "base64" (default) or "json".
    #[serde(default)]
    pub xdr_format: Option<String>,
}

/// Response for `getLedger`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetLedgerResponse {
    /// The retained window this answer was drawn from.
    #[serde(flatten)]
    pub range: RangeInfo,
    /// Whether the requested ledger is retained.
    pub found: bool,
    /// The ledger, when found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger: Option<LedgerEntry>,
}

/// Point lookup of a single retained ledger.
pub fn get_ledger(
    state: &AppState,
    request: GetLedgerRequest,
) -> Result<GetLedgerResponse, RpcError> {
    let format = parse_format(request.xdr_format.as_deref())?;
    let range = state
        .ledgers
        .get_ledger_range()
        .map_err(|e| RpcError::internal(format!("unable to get ledger range: {e}")))?;

    let ledger = state.ledgers.get_ledger(request.sequence)?;
    let entry = match &ledger {
        Some(ledger) => Some(LedgerEntry::build(ledger, format)?),
        None => None,
    };
    Ok(GetLedgerResponse { range: range.into(), found: entry.is_some(), ledger: entry })
}

/// Request for `getLedgers`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetLedgersRequest {
    /// First sequence to return (inclusive).
    pub start_ledger: u32,
    /// Last sequence to return (inclusive); open-ended when absent.
    #[serde(default)]
    pub end_ledger: Option<u32>,
    /// Page size; defaults to [`DEFAULT_GET_LEDGERS_LIMIT`].
    #[serde(default)]
    pub limit: Option<u32>,
    /// Optional blob rendering, "base64" (default) or "json".
    #[serde(default)]
    pub xdr_format: Option<String>,
}

/// Response for `getLedgers`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetLedgersResponse {
    /// The retained window this answer was drawn from.
    #[serde(flatten)]
    pub range: RangeInfo,
    /// Retained ledgers in ascending sequence order.
    pub ledgers: Vec<LedgerEntry>,
}

/// Range read over retained ledgers, ascending, bounded by `limit`.
pub fn get_ledgers(
    state: &AppState,
    request: GetLedgersRequest,
) -> Result<GetLedgersResponse, RpcError> {
    let format = parse_format(request.xdr_format.as_deref())?;

    let limit = request.limit.unwrap_or(DEFAULT_GET_LEDGERS_LIMIT);
    if limit == 0 || limit > MAX_GET_LEDGERS_LIMIT {
        return Err(RpcError::invalid_params(format!(
            "limit must be between 1 and {MAX_GET_LEDGERS_LIMIT}"
        )));
    }
    let end = request.end_ledger.unwrap_or(u32::MAX);
    if end < request.start_ledger {
        return Err(RpcError::invalid_params("endLedger must not precede startLedger"));
    }

    let range = state
        .ledgers
        .get_ledger_range()
        .map_err(|e| RpcError::internal(format!("unable to get ledger range: {e}")))?;

    let mut page: Vec<SealedLedger> = Vec::new();
    state
        .ledgers
        .stream_range(request.start_ledger, end, |ledger| {
            page.push(ledger);
            Ok(if page.len() as u32 >= limit {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            })
        })
        .map_err(RpcError::from)?;

    let mut ledgers = Vec::with_capacity(page.len());
    for ledger in &page {
        ledgers.push(LedgerEntry::build(ledger, format)?);
    }
    Ok(GetLedgersResponse { range: range.into(), ledgers })
}

/// Response for `getLatestLedger`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetLatestLedgerResponse {
    /// Sequence of the newest retained ledger.
    pub sequence: u32,
    /// Close time of the newest retained ledger.
    #[serde(with = "i64_string")]
    pub close_time: i64,
}

/// Returns the newest retained ledger's metadata.
pub fn get_latest_ledger(state: &AppState) -> Result<GetLatestLedgerResponse, RpcError> {
    let range = state
        .ledgers
        .get_ledger_range()
        .map_err(|e| RpcError::internal(format!("unable to get ledger range: {e}")))?;
    Ok(GetLatestLedgerResponse {
        sequence: range.last.sequence,
        close_time: range.last.close_time,
    })
}
