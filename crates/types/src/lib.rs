//! Core types and the canonical wire codec for Arclight.
//!
//! This crate provides the foundational pieces shared by the storage and
//! server crates:
//! - Sealed-ledger and transaction data structures
//! - The network-canonical binary encoding (big-endian, length-prefixed)
//! - Content-address hashing (SHA-256)

pub mod hash;
pub mod types;
pub mod wire;

// Re-export commonly used types at crate root
pub use hash::{Hash, parse_tx_hash, sha256};
pub use types::{IndexedTransaction, LedgerInfo, LedgerRange, LedgerTransaction, SealedLedger};
