//! Table definitions for redb storage.
//!
//! Key encodings for byte-array keys live in the keys module.

use redb::TableDefinition;

/// Table definitions for the ledger store and transaction index.
pub struct Tables;

impl Tables {
    /// Sealed-ledger blobs: sequence → canonical record bytes (verbatim).
    pub const LEDGERS: TableDefinition<'static, u32, &'static [u8]> =
        TableDefinition::new("ledger_close_meta");

    /// Transaction rows: 32-byte tx hash → postcard-encoded row.
    pub const TRANSACTIONS: TableDefinition<'static, &'static [u8], &'static [u8]> =
        TableDefinition::new("transactions");

    /// Retention index: {ledger_sequence:4BE}{hash:32} → ().
    /// Exists only so trimming can find rows by owning ledger.
    pub const TX_BY_LEDGER: TableDefinition<'static, &'static [u8], ()> =
        TableDefinition::new("tx_by_ledger");

    /// Store metadata. Keys: "schema_version".
    pub const META: TableDefinition<'static, &'static str, u32> = TableDefinition::new("meta");
}
