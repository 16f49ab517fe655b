//! Append-only ledger store.
//!
//! One logical table, `ledger_close_meta`, maps a sequence number to the
//! canonical sealed-ledger blob, stored verbatim so content addresses keep
//! verifying downstream. Reads go through [`LedgerReader`]; writes happen
//! only inside the ingestion transaction via the crate-private helpers at
//! the bottom of this module.

use std::ops::ControlFlow;

use redb::{ReadableTable, WriteTransaction};
use snafu::ensure;

use arclight_types::{LedgerInfo, LedgerRange, SealedLedger, wire};

use crate::cache::LatestLedgerCache;
use crate::engine::StorageEngine;
use crate::error::{ConflictSnafu, CorruptionSnafu, Result, StoreError};
use crate::tables::Tables;

/// Read access to the ledger store.
pub struct LedgerReader {
    engine: StorageEngine,
    cache: std::sync::Arc<LatestLedgerCache>,
}

impl LedgerReader {
    /// Creates a reader over the given engine and latest-ledger cache.
    pub fn new(engine: StorageEngine, cache: std::sync::Arc<LatestLedgerCache>) -> Self {
        Self { engine, cache }
    }

    /// Fetches a single ledger by sequence.
    pub fn get_ledger(&self, sequence: u32) -> Result<Option<SealedLedger>> {
        let txn = self.engine.begin_read()?;
        let table = txn.open_table(Tables::LEDGERS)?;
        match table.get(sequence)? {
            None => Ok(None),
            Some(blob) => Ok(Some(decode_row(sequence, blob.value())?)),
        }
    }

    /// Fetches the raw canonical bytes of a single ledger.
    pub fn get_ledger_raw(&self, sequence: u32) -> Result<Option<Vec<u8>>> {
        let txn = self.engine.begin_read()?;
        let table = txn.open_table(Tables::LEDGERS)?;
        Ok(table.get(sequence)?.map(|blob| blob.value().to_vec()))
    }

    /// Runs `sink` over the inclusive range `[start, end]` in ascending
    /// sequence order.
    ///
    /// The scan stops without error when the sink returns
    /// [`ControlFlow::Break`]; the cursor is released and no further rows
    /// are delivered. Each call opens a fresh read transaction, so streams
    /// are restartable.
    pub fn stream_range<F>(&self, start: u32, end: u32, mut sink: F) -> Result<()>
    where
        F: FnMut(SealedLedger) -> Result<ControlFlow<()>>,
    {
        let txn = self.engine.begin_read()?;
        let table = txn.open_table(Tables::LEDGERS)?;
        for entry in table.range(start..=end)? {
            let (key, blob) = entry?;
            let ledger = decode_row(key.value(), blob.value())?;
            if sink(ledger)?.is_break() {
                return Ok(());
            }
        }
        Ok(())
    }

    /// Runs `sink` over every ledger in the store.
    pub fn stream_all<F>(&self, sink: F) -> Result<()>
    where
        F: FnMut(SealedLedger) -> Result<ControlFlow<()>>,
    {
        self.stream_range(u32::MIN, u32::MAX, sink)
    }

    /// Returns the `(oldest, newest)` bounds of the store.
    ///
    /// Fast path: when the cache holds a non-zero latest, only the oldest
    /// row is read and combined with the cached metadata. Slow path (cold
    /// cache): one cursor yields both ends of the table.
    ///
    /// # Errors
    ///
    /// [`StoreError::EmptyStore`] when no ledger has been ingested.
    pub fn get_ledger_range(&self) -> Result<LedgerRange> {
        let latest = self.cache.get();

        let txn = self.engine.begin_read()?;
        let table = txn.open_table(Tables::LEDGERS)?;
        let mut iter = table.iter()?;

        let first = match iter.next() {
            None => return Err(StoreError::EmptyStore),
            Some(entry) => {
                let (key, blob) = entry?;
                decode_row(key.value(), blob.value())?.info()
            },
        };

        if latest.sequence != 0 {
            return Ok(LedgerRange {
                first,
                last: LedgerInfo { sequence: latest.sequence, close_time: latest.close_time },
            });
        }

        let last = match iter.next_back() {
            None => first,
            Some(entry) => {
                let (key, blob) = entry?;
                decode_row(key.value(), blob.value())?.info()
            },
        };
        Ok(LedgerRange { first, last })
    }
}

/// Decodes a stored blob and verifies it belongs under its key.
///
/// The sequence is the primary key, so a blob decoding to a different
/// sequence means the table no longer satisfies its own schema.
pub(crate) fn decode_row(sequence: u32, bytes: &[u8]) -> Result<SealedLedger> {
    let ledger = wire::decode_sealed_ledger(bytes)?;
    ensure!(
        ledger.sequence == sequence,
        CorruptionSnafu {
            message: format!(
                "ledger blob stored under sequence {sequence} decodes to sequence {}",
                ledger.sequence
            ),
        }
    );
    Ok(ledger)
}

/// Inserts one ledger blob. Fails with [`StoreError::Conflict`] if the
/// sequence already exists.
pub(crate) fn insert_ledger(
    txn: &WriteTransaction,
    sequence: u32,
    raw: &[u8],
) -> Result<()> {
    let mut table = txn.open_table(Tables::LEDGERS)?;
    ensure!(
        table.get(sequence)?.is_none(),
        ConflictSnafu { entity: "ledger", key: sequence.to_string() }
    );
    table.insert(sequence, raw)?;
    Ok(())
}

/// Returns the first sequence still retained, or `None` when the window
/// covers everything ingested so far.
pub fn retention_cutoff(latest: u32, retention_window: u32) -> Option<u32> {
    let window = u64::from(retention_window.max(1));
    let cutoff = (u64::from(latest) + 1).checked_sub(window)?;
    (cutoff > 0).then_some(cutoff as u32)
}

/// Deletes all ledger rows with `sequence < cutoff`.
pub(crate) fn trim_ledgers(txn: &WriteTransaction, cutoff: u32) -> Result<u64> {
    let mut table = txn.open_table(Tables::LEDGERS)?;
    let doomed: Vec<u32> = {
        let mut keys = Vec::new();
        for entry in table.range(..cutoff)? {
            let (key, _) = entry?;
            keys.push(key.value());
        }
        keys
    };
    for sequence in &doomed {
        table.remove(sequence)?;
    }
    Ok(doomed.len() as u64)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_retention_cutoff() {
        // Window covers everything: no-op
        assert_eq!(retention_cutoff(5, 10), None);
        assert_eq!(retention_cutoff(4, 5), None);
        // Ingested 1..=5 with window 3: keep 3..=5
        assert_eq!(retention_cutoff(5, 3), Some(3));
        // Window of one keeps only the latest
        assert_eq!(retention_cutoff(9, 1), Some(9));
        // Zero never appears as a cutoff
        assert_eq!(retention_cutoff(0, 1), None);
        // A window of zero behaves as one rather than deleting the new row
        assert_eq!(retention_cutoff(9, 0), Some(9));
    }

    #[test]
    fn test_insert_duplicate_sequence_conflicts() {
        let engine = StorageEngine::open_in_memory().expect("open");
        let sealed = SealedLedger::builder().sequence(3).close_time(0).build();
        let raw = wire::encode_sealed_ledger(&sealed).expect("encode");

        let txn = engine.begin_write().expect("begin");
        insert_ledger(&txn, 3, &raw).expect("first insert");
        let err = insert_ledger(&txn, 3, &raw).expect_err("duplicate");
        assert!(matches!(err, StoreError::Conflict { entity: "ledger", .. }));
    }

    #[test]
    fn test_decode_row_rejects_sequence_mismatch() {
        let ledger = SealedLedger::builder().sequence(7).close_time(0).build();
        let bytes = wire::encode_sealed_ledger(&ledger).expect("encode");
        assert!(decode_row(7, &bytes).is_ok());
        let err = decode_row(8, &bytes).expect_err("mismatch");
        assert!(matches!(err, StoreError::Corruption { .. }));
    }
}
