//! Core type definitions for Arclight.
//!
//! A [`SealedLedger`] is one closed block of the upstream network: a sequence
//! number, a close time, an opaque header portion, and the transactions the
//! ledger applied. The storage layer persists the canonical encoding verbatim
//! and derives the transaction index from these structures.

use serde::{Deserialize, Serialize};

use crate::hash::{Hash, sha256};

/// One sealed ledger as delivered by the upstream network.
///
/// Sequence numbers are monotonically increasing and uniquely identify a
/// ledger. Close times are non-decreasing with sequence; ties are permitted.
/// The header portion is opaque and preserved only for round-tripping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
pub struct SealedLedger {
    /// Ledger sequence number.
    pub sequence: u32,
    /// Unix seconds when the ledger closed.
    pub close_time: i64,
    /// Opaque header bytes, round-trip preserved.
    #[builder(default)]
    pub header: Vec<u8>,
    /// Transactions applied by this ledger, in application order.
    #[builder(default)]
    pub transactions: Vec<LedgerTransaction>,
}

impl SealedLedger {
    /// Returns the `(sequence, close_time)` metadata pair for this ledger.
    #[inline]
    pub fn info(&self) -> LedgerInfo {
        LedgerInfo { sequence: self.sequence, close_time: self.close_time }
    }
}

/// One transaction inside a sealed ledger.
///
/// The envelope, result, and meta blobs are opaque to the store; the codec
/// peeks at their leading discriminants to derive the index flags. The
/// transaction hash is the content address of the envelope bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
pub struct LedgerTransaction {
    /// Canonical transaction envelope bytes.
    pub envelope: Vec<u8>,
    /// Canonical execution result bytes.
    pub result: Vec<u8>,
    /// Canonical result meta bytes.
    #[builder(default)]
    pub meta: Vec<u8>,
    /// Diagnostic events recorded during execution, if any.
    #[builder(default)]
    pub events: Vec<Vec<u8>>,
}

impl LedgerTransaction {
    /// Content address of this transaction: SHA-256 over the envelope bytes.
    #[inline]
    pub fn hash(&self) -> Hash {
        sha256(&self.envelope)
    }
}

/// Sequence and close time of a single ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerInfo {
    /// Ledger sequence number.
    pub sequence: u32,
    /// Unix seconds when the ledger closed.
    pub close_time: i64,
}

/// The `(oldest, newest)` window of ledgers currently retained.
///
/// Invariant: `first.sequence <= last.sequence`, and both bounds correspond
/// to rows actually present in the ledger store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRange {
    /// Oldest retained ledger.
    pub first: LedgerInfo,
    /// Newest retained ledger.
    pub last: LedgerInfo,
}

/// A transaction row as stored in the transaction index.
///
/// Rows are derived from sealed-ledger contents at ingest time and are
/// immutable until retention trimming deletes them. The owning ledger's
/// close time is cached in the row so point lookups need no join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedTransaction {
    /// Sequence of the ledger that included this transaction.
    pub ledger_sequence: u32,
    /// Close time of that ledger (Unix seconds).
    pub ledger_close_time: i64,
    /// 1-based index among the ledger's transactions.
    pub application_order: u32,
    /// Whether execution succeeded.
    pub successful: bool,
    /// Whether the envelope is of the fee-bump variety.
    pub fee_bump: bool,
    /// Canonical envelope bytes.
    pub envelope: Vec<u8>,
    /// Canonical result bytes.
    pub result: Vec<u8>,
    /// Canonical result meta bytes.
    pub meta: Vec<u8>,
    /// Diagnostic event blobs.
    pub events: Vec<Vec<u8>>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_builder_defaults() {
        let ledger = SealedLedger::builder().sequence(7).close_time(1_700_000_000).build();
        assert_eq!(ledger.sequence, 7);
        assert!(ledger.header.is_empty());
        assert!(ledger.transactions.is_empty());
    }

    #[test]
    fn test_ledger_info() {
        let ledger = SealedLedger::builder().sequence(9).close_time(42).build();
        assert_eq!(ledger.info(), LedgerInfo { sequence: 9, close_time: 42 });
    }

    #[test]
    fn test_transaction_hash_is_envelope_content_address() {
        let tx = LedgerTransaction::builder()
            .envelope(vec![1, 2, 3])
            .result(vec![0, 0, 0, 0])
            .build();
        assert_eq!(tx.hash(), sha256(&[1, 2, 3]));
        // Hash depends only on the envelope
        let tx2 = LedgerTransaction::builder()
            .envelope(vec![1, 2, 3])
            .result(vec![9, 9])
            .meta(vec![5])
            .build();
        assert_eq!(tx.hash(), tx2.hash());
    }
}
