//! Transaction index derived from sealed-ledger contents.
//!
//! Rows are keyed by the 32-byte transaction hash and carry everything the
//! query surface needs for a point lookup. A secondary index keyed by
//! `{ledger_sequence}{hash}` exists only so retention trimming can delete
//! by owning ledger. The index is never the source of truth for a ledger's
//! presence; the ledger store is.

use redb::{ReadableTable, WriteTransaction};
use snafu::ensure;

use arclight_types::{Hash, IndexedTransaction};

use crate::engine::StorageEngine;
use crate::error::{ConflictSnafu, CorruptionSnafu, Result};
use crate::keys;
use crate::tables::Tables;

/// Read access to the transaction index.
pub struct TransactionReader {
    engine: StorageEngine,
}

impl TransactionReader {
    /// Creates a reader over the given engine.
    pub fn new(engine: StorageEngine) -> Self {
        Self { engine }
    }

    /// Point lookup by transaction hash.
    pub fn get_transaction(&self, hash: &Hash) -> Result<Option<IndexedTransaction>> {
        let txn = self.engine.begin_read()?;
        let table = txn.open_table(Tables::TRANSACTIONS)?;
        match table.get(hash.as_slice())? {
            None => Ok(None),
            Some(row) => {
                let tx = postcard::from_bytes(row.value()).map_err(|e| {
                    CorruptionSnafu {
                        message: format!(
                            "transaction row {} failed to decode: {e}",
                            hex::encode(hash)
                        ),
                    }
                    .build()
                })?;
                Ok(Some(tx))
            },
        }
    }
}

/// Inserts one transaction row and its retention-index entry. Fails with
/// [`crate::StoreError::Conflict`] on a duplicate hash.
pub(crate) fn insert_transaction(
    txn: &WriteTransaction,
    hash: &Hash,
    row: &IndexedTransaction,
) -> Result<()> {
    let bytes = postcard::to_allocvec(row).map_err(|e| {
        CorruptionSnafu { message: format!("transaction row failed to encode: {e}") }.build()
    })?;

    let mut table = txn.open_table(Tables::TRANSACTIONS)?;
    ensure!(
        table.get(hash.as_slice())?.is_none(),
        ConflictSnafu { entity: "transaction", key: hex::encode(hash) }
    );
    table.insert(hash.as_slice(), bytes.as_slice())?;

    let mut index = txn.open_table(Tables::TX_BY_LEDGER)?;
    index.insert(keys::tx_by_ledger_key(row.ledger_sequence, hash).as_slice(), ())?;
    Ok(())
}

/// Deletes all rows with `ledger_sequence < cutoff`, in both the row table
/// and the retention index.
pub(crate) fn trim_transactions(txn: &WriteTransaction, cutoff: u32) -> Result<u64> {
    let mut index = txn.open_table(Tables::TX_BY_LEDGER)?;
    let upper = keys::sequence_floor_key(cutoff);

    let doomed: Vec<Vec<u8>> = {
        let mut entries = Vec::new();
        for entry in index.range(..upper.as_slice())? {
            let (key, _) = entry?;
            entries.push(key.value().to_vec());
        }
        entries
    };

    let mut table = txn.open_table(Tables::TRANSACTIONS)?;
    for key in &doomed {
        index.remove(key.as_slice())?;
        if let Some(hash) = keys::hash_of_key(key) {
            table.remove(hash.as_slice())?;
        }
    }
    Ok(doomed.len() as u64)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::engine::StorageEngine;
    use arclight_types::sha256;
    use redb::ReadableTableMetadata;

    fn sample_row(sequence: u32, order: u32) -> (Hash, IndexedTransaction) {
        let envelope = arclight_types::wire::encode_envelope(
            arclight_types::wire::EnvelopeKind::Plain,
            &sequence.to_be_bytes(),
        );
        let hash = sha256(&envelope);
        let row = IndexedTransaction {
            ledger_sequence: sequence,
            ledger_close_time: 1_000 + i64::from(sequence),
            application_order: order,
            successful: true,
            fee_bump: false,
            envelope,
            result: arclight_types::wire::encode_result(
                arclight_types::wire::ResultStatus::Success,
                b"",
            ),
            meta: vec![],
            events: vec![],
        };
        (hash, row)
    }

    #[test]
    fn test_insert_and_get() {
        let engine = StorageEngine::open_in_memory().expect("open");
        let (hash, row) = sample_row(10, 1);

        let txn = engine.begin_write().expect("begin");
        insert_transaction(&txn, &hash, &row).expect("insert");
        txn.commit().expect("commit");

        let reader = TransactionReader::new(engine);
        let fetched = reader.get_transaction(&hash).expect("get").expect("found");
        assert_eq!(fetched, row);

        let missing = reader.get_transaction(&sha256(b"missing")).expect("get");
        assert!(missing.is_none());
    }

    #[test]
    fn test_duplicate_hash_conflicts() {
        let engine = StorageEngine::open_in_memory().expect("open");
        let (hash, row) = sample_row(10, 1);

        let txn = engine.begin_write().expect("begin");
        insert_transaction(&txn, &hash, &row).expect("insert");
        let err = insert_transaction(&txn, &hash, &row).expect_err("duplicate");
        assert!(matches!(err, crate::StoreError::Conflict { entity: "transaction", .. }));
    }

    #[test]
    fn test_trim_deletes_rows_and_index() {
        let engine = StorageEngine::open_in_memory().expect("open");
        let rows: Vec<_> = (1..=5u32).map(|seq| sample_row(seq, 1)).collect();

        let txn = engine.begin_write().expect("begin");
        for (hash, row) in &rows {
            insert_transaction(&txn, hash, row).expect("insert");
        }
        txn.commit().expect("commit");

        // Trim everything below sequence 3
        let txn = engine.begin_write().expect("begin");
        let deleted = trim_transactions(&txn, 3).expect("trim");
        txn.commit().expect("commit");
        assert_eq!(deleted, 2);

        let reader = TransactionReader::new(engine.clone());
        for (hash, row) in &rows {
            let found = reader.get_transaction(hash).expect("get");
            if row.ledger_sequence < 3 {
                assert!(found.is_none(), "sequence {} must be trimmed", row.ledger_sequence);
            } else {
                assert!(found.is_some(), "sequence {} must survive", row.ledger_sequence);
            }
        }

        // Retention index shrank with the rows
        let txn = engine.begin_read().expect("begin read");
        let index = txn.open_table(Tables::TX_BY_LEDGER).expect("index");
        assert_eq!(index.len().expect("len"), 3);
    }
}
