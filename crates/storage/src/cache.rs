//! In-memory snapshot of the latest ingested ledger.
//!
//! The cache holds only the latest `(sequence, close_time)` pair; the oldest
//! bound is always read from the store because trimming moves it on every
//! ingest. Writers are the ingestion transaction (after a successful commit)
//! and the cold-start loader; everything else only reads.

use parking_lot::RwLock;
use redb::ReadableTable;

use crate::engine::StorageEngine;
use crate::error::Result;
use crate::tables::Tables;

/// Latest-ledger metadata. A `sequence` of zero is the sentinel for an
/// empty store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatestLedger {
    /// Sequence of the newest committed ledger, or zero.
    pub sequence: u32,
    /// Close time of that ledger (Unix seconds), or zero.
    pub close_time: i64,
}

/// Shared cache of the latest ingested ledger.
///
/// Lock hold times are a copy in or out; the cache never blocks on I/O.
pub struct LatestLedgerCache {
    inner: RwLock<LatestLedger>,
}

impl LatestLedgerCache {
    /// Creates an empty cache (zero sentinel).
    pub fn empty() -> Self {
        Self { inner: RwLock::new(LatestLedger::default()) }
    }

    /// Cold-start constructor: reads the maximum sequence from the store,
    /// or leaves the zero sentinel when the store is empty.
    pub fn load(engine: &StorageEngine) -> Result<Self> {
        let cache = Self::empty();
        let txn = engine.begin_read()?;
        let table = txn.open_table(Tables::LEDGERS)?;

        if let Some(entry) = table.iter()?.next_back() {
            let (key, value) = entry?;
            let ledger = crate::ledgers::decode_row(key.value(), value.value())?;
            cache.set(LatestLedger { sequence: ledger.sequence, close_time: ledger.close_time });
        }
        Ok(cache)
    }

    /// Returns the cached snapshot.
    pub fn get(&self) -> LatestLedger {
        *self.inner.read()
    }

    /// Replaces the cached snapshot. Called only after a successful commit.
    pub fn set(&self, latest: LatestLedger) {
        *self.inner.write() = latest;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cache_is_zero_sentinel() {
        let cache = LatestLedgerCache::empty();
        assert_eq!(cache.get(), LatestLedger::default());
    }

    #[test]
    fn test_set_and_get() {
        let cache = LatestLedgerCache::empty();
        cache.set(LatestLedger { sequence: 42, close_time: 1_700_000_000 });
        assert_eq!(cache.get().sequence, 42);
        assert_eq!(cache.get().close_time, 1_700_000_000);
    }

    #[test]
    fn test_load_from_empty_store() {
        let engine = StorageEngine::open_in_memory().expect("open");
        let cache = LatestLedgerCache::load(&engine).expect("load");
        assert_eq!(cache.get(), LatestLedger::default());
    }

    #[test]
    fn test_concurrent_readers() {
        use std::sync::Arc;

        let cache = Arc::new(LatestLedgerCache::empty());
        cache.set(LatestLedger { sequence: 7, close_time: 1 });

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.get().sequence)
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().expect("join"), 7);
        }
    }
}
