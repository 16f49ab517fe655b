//! redb storage engine wrapper.
//!
//! Provides a thin wrapper around redb with:
//! - Database lifecycle management and schema version stamping
//! - Scoped read/write transactions (an uncommitted write transaction
//!   rolls back when dropped)
//! - An in-memory constructor for tests

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadTransaction, ReadableTable, WriteTransaction};

use crate::error::{Result, StoreError};
use crate::tables::Tables;

/// Version stamped into the `meta` table. Databases stamped with a different
/// version refuse to open.
pub const SCHEMA_VERSION: u32 = 1;

const SCHEMA_VERSION_KEY: &str = "schema_version";

/// Storage engine backed by a single redb database file.
#[derive(Clone, Debug)]
pub struct StorageEngine {
    db: Arc<Database>,
}

impl StorageEngine {
    /// Open or create a database at the given path.
    ///
    /// Creates all tables and stamps the schema version on first open.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SchemaMismatch`] if the database was written by
    /// an incompatible version, [`StoreError::Busy`] if another process holds
    /// it, or [`StoreError::Open`] on other open failures.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let db = Database::create(path).map_err(|e| match e {
            redb::DatabaseError::DatabaseAlreadyOpen => StoreError::Busy {
                message: "database is open in another process".to_string(),
            },
            other => StoreError::Open {
                path: path.display().to_string(),
                message: other.to_string(),
            },
        })?;
        let engine = Self { db: Arc::new(db) };
        engine.init_schema()?;
        Ok(engine)
    }

    /// Create an in-memory database for testing.
    pub fn open_in_memory() -> Result<Self> {
        let db = Database::builder()
            .create_with_backend(redb::backends::InMemoryBackend::new())
            .map_err(|e| StoreError::Open { path: ":memory:".to_string(), message: e.to_string() })?;
        let engine = Self { db: Arc::new(db) };
        engine.init_schema()?;
        Ok(engine)
    }

    /// Creates all tables and verifies the schema version stamp.
    fn init_schema(&self) -> Result<()> {
        let txn = self.begin_write()?;
        let found = {
            let mut meta = txn.open_table(Tables::META)?;
            txn.open_table(Tables::LEDGERS)?;
            txn.open_table(Tables::TRANSACTIONS)?;
            txn.open_table(Tables::TX_BY_LEDGER)?;

            let existing = meta.get(SCHEMA_VERSION_KEY)?.map(|stamp| stamp.value());
            match existing {
                Some(version) => version,
                None => {
                    meta.insert(SCHEMA_VERSION_KEY, SCHEMA_VERSION)?;
                    SCHEMA_VERSION
                },
            }
        };
        txn.commit()?;

        if found != SCHEMA_VERSION {
            return Err(StoreError::SchemaMismatch { found, expected: SCHEMA_VERSION });
        }
        Ok(())
    }

    /// Begin a read transaction. Readers run concurrently with each other
    /// and with an ongoing write.
    pub fn begin_read(&self) -> Result<ReadTransaction> {
        Ok(self.db.begin_read()?)
    }

    /// Begin a write transaction. redb serialises writers; the transaction
    /// rolls back if dropped without a commit.
    pub fn begin_write(&self) -> Result<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use redb::ReadableTableMetadata;

    #[test]
    fn test_open_in_memory_creates_tables() {
        let engine = StorageEngine::open_in_memory().expect("open");
        let txn = engine.begin_read().expect("begin read");
        // All tables exist even before any ingest
        let ledgers = txn.open_table(Tables::LEDGERS).expect("ledgers table");
        assert!(ledgers.is_empty().expect("is_empty"));
        txn.open_table(Tables::TRANSACTIONS).expect("transactions table");
        txn.open_table(Tables::TX_BY_LEDGER).expect("tx_by_ledger table");
    }

    #[test]
    fn test_schema_version_stamped_on_first_open() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("arclight.redb");

        {
            let _engine = StorageEngine::open(&path).expect("first open");
        }

        // Reopen succeeds with the matching stamp
        let engine = StorageEngine::open(&path).expect("reopen");
        let txn = engine.begin_read().expect("begin read");
        let meta = txn.open_table(Tables::META).expect("meta table");
        let stamp = meta.get(SCHEMA_VERSION_KEY).expect("get").expect("stamped");
        assert_eq!(stamp.value(), SCHEMA_VERSION);
    }

    #[test]
    fn test_incompatible_schema_version_refuses_to_open() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("arclight.redb");

        {
            let engine = StorageEngine::open(&path).expect("first open");
            let txn = engine.begin_write().expect("begin write");
            {
                let mut meta = txn.open_table(Tables::META).expect("meta table");
                meta.insert(SCHEMA_VERSION_KEY, SCHEMA_VERSION + 1).expect("tamper");
            }
            txn.commit().expect("commit");
        }

        let err = StorageEngine::open(&path).expect_err("must refuse");
        assert!(matches!(
            err,
            StoreError::SchemaMismatch { found, expected }
                if found == SCHEMA_VERSION + 1 && expected == SCHEMA_VERSION
        ));
    }

    #[test]
    fn test_write_rolls_back_on_drop() {
        let engine = StorageEngine::open_in_memory().expect("open");
        {
            let txn = engine.begin_write().expect("begin write");
            {
                let mut table = txn.open_table(Tables::LEDGERS).expect("table");
                table.insert(1u32, [0u8; 4].as_slice()).expect("insert");
            }
            // dropped without commit
        }
        let txn = engine.begin_read().expect("begin read");
        let table = txn.open_table(Tables::LEDGERS).expect("table");
        assert!(table.get(1u32).expect("get").is_none(), "uncommitted write must roll back");
    }
}
