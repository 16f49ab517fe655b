//! Query method handlers.
//!
//! Each handler composes the storage readers and attaches the current
//! `(oldest, newest)` window to its response, read under the cache
//! discipline. Callers always know which retention window an answer was
//! drawn from, including negative answers.

mod get_ledgers;
mod get_transaction;

pub use get_ledgers::{
    DEFAULT_GET_LEDGERS_LIMIT, GetLatestLedgerResponse, GetLedgerRequest, GetLedgerResponse,
    GetLedgersRequest, GetLedgersResponse, LedgerEntry, MAX_GET_LEDGERS_LIMIT,
    get_latest_ledger, get_ledger, get_ledgers,
};
pub use get_transaction::{
    GetTransactionRequest, GetTransactionResponse, STATUS_FAILED, STATUS_NOT_FOUND,
    STATUS_SUCCESS, get_transaction,
};

use serde::Serialize;
use serde_json::{Value, json};

use arclight_types::LedgerRange;
use arclight_types::wire::{self, EnvelopeKind, ResultStatus};

use crate::jsonrpc::RpcError;

/// Blob fields rendered as base64 strings (the default).
pub const FORMAT_BASE64: &str = "base64";
/// Blob fields rendered as structured JSON.
pub const FORMAT_JSON: &str = "json";

/// Requested rendering of blob fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlobFormat {
    /// Base64-encoded canonical bytes.
    #[default]
    Base64,
    /// Structured decoded form.
    Json,
}

/// Validates the optional `xdrFormat` request field.
pub(crate) fn parse_format(format: Option<&str>) -> Result<BlobFormat, RpcError> {
    match format {
        None | Some("") | Some(FORMAT_BASE64) => Ok(BlobFormat::Base64),
        Some(FORMAT_JSON) => Ok(BlobFormat::Json),
        Some(other) => Err(RpcError::invalid_params(format!(
            "expected xdrFormat to be '{FORMAT_BASE64}' or '{FORMAT_JSON}', got '{other}'"
        ))),
    }
}

/// The `(oldest, newest)` window attached to every query response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeInfo {
    /// Newest retained ledger sequence.
    pub latest_ledger: u32,
    /// Close time of the newest retained ledger.
    #[serde(with = "i64_string")]
    pub latest_ledger_close_time: i64,
    /// Oldest retained ledger sequence.
    pub oldest_ledger: u32,
    /// Close time of the oldest retained ledger.
    #[serde(with = "i64_string")]
    pub oldest_ledger_close_time: i64,
}

impl From<LedgerRange> for RangeInfo {
    fn from(range: LedgerRange) -> Self {
        Self {
            latest_ledger: range.last.sequence,
            latest_ledger_close_time: range.last.close_time,
            oldest_ledger: range.first.sequence,
            oldest_ledger_close_time: range.first.close_time,
        }
    }
}

/// Serializes an `i64` as a decimal string, as the wire format requires
/// for close times.
pub(crate) mod i64_string {
    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }
}

/// Like [`i64_string`], for optional fields.
pub(crate) mod opt_i64_string {
    use serde::Serializer;

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        value: &Option<i64>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_str(&v.to_string()),
            None => serializer.serialize_none(),
        }
    }
}

pub(crate) fn b64(bytes: &[u8]) -> String {
    use base64::Engine as _;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Structured JSON form of an envelope blob.
pub(crate) fn envelope_json(bytes: &[u8]) -> Result<Value, RpcError> {
    let (kind, payload) = wire::decode_envelope(bytes)
        .map_err(|e| RpcError::internal(format!("failed to decode envelope: {e}")))?;
    let kind = match kind {
        EnvelopeKind::Plain => "plain",
        EnvelopeKind::FeeBump => "feeBump",
    };
    Ok(json!({ "kind": kind, "payload": b64(payload) }))
}

/// Structured JSON form of a result blob.
pub(crate) fn result_json(bytes: &[u8]) -> Result<Value, RpcError> {
    let (status, detail) = wire::decode_result(bytes)
        .map_err(|e| RpcError::internal(format!("failed to decode result: {e}")))?;
    let status = match status {
        ResultStatus::Success => "success",
        ResultStatus::Failed => "failed",
    };
    Ok(json!({ "status": status, "detail": b64(detail) }))
}

/// Structured JSON form of an opaque meta or event blob.
pub(crate) fn opaque_json(bytes: &[u8]) -> Value {
    json!({ "data": b64(bytes) })
}
