//! Storage core for Arclight.
//!
//! This crate provides:
//! - redb-backed storage engine with schema versioning
//! - Append-only ledger store with range streaming and retention trimming
//! - Transaction index derived from sealed-ledger contents
//! - In-memory latest-ledger cache
//! - The atomic ingestion transaction tying them together

mod cache;
mod engine;
mod error;
mod ingest;
mod keys;
mod ledgers;
mod tables;
mod transactions;

pub use cache::{LatestLedger, LatestLedgerCache};
pub use engine::{SCHEMA_VERSION, StorageEngine};
pub use error::{Result, StoreError};
pub use ingest::Ingestor;
pub use ledgers::{LedgerReader, retention_cutoff};
pub use tables::Tables;
pub use transactions::TransactionReader;
