//! Shared helpers for storage integration tests.

#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

use std::path::Path;
use std::sync::Arc;

use arclight_storage::{
    Ingestor, LatestLedgerCache, LedgerReader, StorageEngine, TransactionReader,
};
use arclight_types::wire::{self, EnvelopeKind, ResultStatus};
use arclight_types::{LedgerInfo, LedgerTransaction, SealedLedger};

/// A fully wired storage stack over one engine.
pub struct TestStore {
    pub engine: StorageEngine,
    pub cache: Arc<LatestLedgerCache>,
    pub ingestor: Ingestor,
    pub ledgers: LedgerReader,
    pub transactions: TransactionReader,
}

impl TestStore {
    pub fn in_memory() -> Self {
        Self::wire(StorageEngine::open_in_memory().expect("open in-memory engine"))
    }

    /// Opens (or reopens) an on-disk store, cold-loading the cache the way
    /// process start does.
    pub fn open(path: &Path) -> Self {
        Self::wire(StorageEngine::open(path).expect("open engine"))
    }

    fn wire(engine: StorageEngine) -> Self {
        let cache = Arc::new(LatestLedgerCache::load(&engine).expect("load cache"));
        Self {
            ingestor: Ingestor::new(engine.clone(), Arc::clone(&cache)),
            ledgers: LedgerReader::new(engine.clone(), Arc::clone(&cache)),
            transactions: TransactionReader::new(engine.clone()),
            cache,
            engine,
        }
    }

    pub fn ingest(
        &self,
        ledger: &SealedLedger,
        retention_window: u32,
    ) -> arclight_storage::Result<LedgerInfo> {
        let raw = wire::encode_sealed_ledger(ledger).expect("encode ledger");
        self.ingestor.apply(&raw, retention_window)
    }
}

/// Builds a sealed ledger with the given transactions.
pub fn ledger(sequence: u32, close_time: i64, transactions: Vec<LedgerTransaction>) -> SealedLedger {
    SealedLedger::builder()
        .sequence(sequence)
        .close_time(close_time)
        .header(sequence.to_be_bytes().to_vec())
        .transactions(transactions)
        .build()
}

/// Builds a transaction whose envelope payload (and therefore hash) is
/// derived from `seed`.
pub fn tx(seed: &[u8], successful: bool, fee_bump: bool, events: Vec<Vec<u8>>) -> LedgerTransaction {
    let kind = if fee_bump { EnvelopeKind::FeeBump } else { EnvelopeKind::Plain };
    let status = if successful { ResultStatus::Success } else { ResultStatus::Failed };
    LedgerTransaction::builder()
        .envelope(wire::encode_envelope(kind, seed))
        .result(wire::encode_result(status, b"detail"))
        .meta(seed.to_vec())
        .events(events)
        .build()
}
