//! The ingestion transaction.
//!
//! [`Ingestor::apply`] writes one sealed ledger atomically: the raw blob,
//! every derived transaction row, and retention trimming all commit
//! together or not at all. The latest-ledger cache is updated only after a
//! successful commit, so readers never observe a rolled-back ingest.

use std::sync::Arc;

use arclight_types::{IndexedTransaction, LedgerInfo, wire};

use crate::cache::{LatestLedger, LatestLedgerCache};
use crate::engine::StorageEngine;
use crate::error::{Result, StoreError};
use crate::{ledgers, transactions};

/// Applies sealed ledgers to the store.
///
/// Ingest is serial: the upstream ledger stream is inherently sequential,
/// and the strict monotonicity check asserts that discipline.
pub struct Ingestor {
    engine: StorageEngine,
    cache: Arc<LatestLedgerCache>,
}

impl Ingestor {
    /// Creates an ingestor over the given engine and cache.
    pub fn new(engine: StorageEngine, cache: Arc<LatestLedgerCache>) -> Self {
        Self { engine, cache }
    }

    /// Applies one sealed ledger from its canonical bytes.
    ///
    /// `retention_window` is the number of most-recent ledgers to keep;
    /// configuration validates it to be at least one.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Decode`] if the blob is not a valid canonical record
    /// - [`StoreError::OutOfOrder`] if the sequence is not strictly greater
    ///   than the cached latest
    /// - [`StoreError::Conflict`] on a duplicate ledger or transaction row
    ///
    /// Any failure before commit rolls back the whole transaction and
    /// leaves the cache untouched.
    pub fn apply(&self, raw: &[u8], retention_window: u32) -> Result<LedgerInfo> {
        let ledger = wire::decode_sealed_ledger(raw)?;

        let latest = self.cache.get();
        if ledger.sequence <= latest.sequence {
            return Err(StoreError::OutOfOrder {
                sequence: ledger.sequence,
                latest: latest.sequence,
            });
        }

        let txn = self.engine.begin_write()?;

        ledgers::insert_ledger(&txn, ledger.sequence, raw)?;

        for (i, tx) in ledger.transactions.iter().enumerate() {
            let row = IndexedTransaction {
                ledger_sequence: ledger.sequence,
                ledger_close_time: ledger.close_time,
                application_order: (i as u32) + 1,
                successful: wire::result_status(&tx.result)?.is_success(),
                fee_bump: wire::envelope_kind(&tx.envelope)?.is_fee_bump(),
                envelope: tx.envelope.clone(),
                result: tx.result.clone(),
                meta: tx.meta.clone(),
                events: tx.events.clone(),
            };
            transactions::insert_transaction(&txn, &tx.hash(), &row)?;
        }

        let mut trimmed = 0;
        if let Some(cutoff) = ledgers::retention_cutoff(ledger.sequence, retention_window) {
            trimmed = ledgers::trim_ledgers(&txn, cutoff)?;
            transactions::trim_transactions(&txn, cutoff)?;
        }

        txn.commit()?;

        self.cache
            .set(LatestLedger { sequence: ledger.sequence, close_time: ledger.close_time });

        tracing::debug!(
            sequence = ledger.sequence,
            transactions = ledger.transactions.len(),
            trimmed,
            "applied sealed ledger"
        );

        Ok(ledger.info())
    }
}
