//! Error types for the storage core.
//!
//! The taxonomy separates transient conditions (`Busy`, `Io`) the ingester
//! may retry from fatal ones (`Corruption`, `Decode`) after which the
//! process should refuse further writes.

use snafu::{Location, Snafu};

use arclight_types::wire::WireError;

/// Unified result type for storage operations.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// Top-level error type for storage operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StoreError {
    /// Database open failed.
    #[snafu(display("Failed to open database at {path}: {message}"))]
    Open {
        /// Database path.
        path: String,
        /// Error description.
        message: String,
    },

    /// The on-disk schema version does not match this binary.
    #[snafu(display("Schema version mismatch: found {found}, expected {expected}"))]
    SchemaMismatch {
        /// Version stamped in the database.
        found: u32,
        /// Version this binary writes.
        expected: u32,
    },

    /// Transient I/O failure; the caller may retry.
    #[snafu(display("I/O error at {location}: {message}"))]
    Io {
        /// Error description.
        message: String,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },

    /// The store is held by a concurrent writer; retryable.
    #[snafu(display("Store busy: {message}"))]
    Busy {
        /// Error description.
        message: String,
    },

    /// Data corruption detected; fatal.
    #[snafu(display("Data corruption detected at {location}: {message}"))]
    Corruption {
        /// Error description.
        message: String,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },

    /// Duplicate primary-key insert; indicates the same ledger was ingested
    /// twice and is fatal to the current ingest.
    #[snafu(display("Duplicate {entity} {key}"))]
    Conflict {
        /// What collided ("ledger" or "transaction").
        entity: &'static str,
        /// The colliding key, rendered for operators.
        key: String,
    },

    /// A range was requested before any ledger was ingested.
    #[snafu(display("Ledger store is empty"))]
    EmptyStore,

    /// Ingest received a sequence not strictly greater than the latest.
    #[snafu(display("Out-of-order ingest: sequence {sequence} is not greater than latest {latest}"))]
    OutOfOrder {
        /// The offered sequence.
        sequence: u32,
        /// The latest committed sequence.
        latest: u32,
    },

    /// A canonical record failed to decode; fatal.
    #[snafu(display("Decode error: {source}"))]
    Decode {
        /// The underlying wire error.
        source: WireError,
    },
}

impl StoreError {
    /// True for transient errors the ingester may retry with the same ledger.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Busy { .. } | StoreError::Io { .. })
    }

    /// True for errors after which the process should refuse further writes.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StoreError::Corruption { .. }
                | StoreError::Decode { .. }
                | StoreError::SchemaMismatch { .. }
        )
    }
}

impl From<WireError> for StoreError {
    fn from(source: WireError) -> Self {
        StoreError::Decode { source }
    }
}

#[track_caller]
fn here() -> Location {
    let loc = std::panic::Location::caller();
    Location::new(loc.file(), loc.line(), loc.column())
}

impl From<redb::StorageError> for StoreError {
    #[track_caller]
    fn from(err: redb::StorageError) -> Self {
        let location = here();
        match err {
            redb::StorageError::Corrupted(message) => StoreError::Corruption { message, location },
            redb::StorageError::Io(source) if source.kind() == std::io::ErrorKind::WouldBlock => {
                StoreError::Busy { message: source.to_string() }
            },
            redb::StorageError::LockPoisoned(at) => {
                StoreError::Busy { message: format!("lock poisoned at {at}") }
            },
            other => StoreError::Io { message: other.to_string(), location },
        }
    }
}

impl From<redb::TransactionError> for StoreError {
    #[track_caller]
    fn from(err: redb::TransactionError) -> Self {
        match err {
            redb::TransactionError::Storage(source) => source.into(),
            other => StoreError::Io { message: other.to_string(), location: here() },
        }
    }
}

impl From<redb::TableError> for StoreError {
    #[track_caller]
    fn from(err: redb::TableError) -> Self {
        match err {
            redb::TableError::Storage(source) => source.into(),
            // Any other table-level failure means the persisted schema does
            // not match what this binary expects.
            other => StoreError::Corruption { message: other.to_string(), location: here() },
        }
    }
}

impl From<redb::CommitError> for StoreError {
    #[track_caller]
    fn from(err: redb::CommitError) -> Self {
        match err {
            redb::CommitError::Storage(source) => source.into(),
            other => StoreError::Io { message: other.to_string(), location: here() },
        }
    }
}

impl From<redb::DatabaseError> for StoreError {
    #[track_caller]
    fn from(err: redb::DatabaseError) -> Self {
        match err {
            redb::DatabaseError::DatabaseAlreadyOpen => {
                StoreError::Busy { message: "database is open in another process".to_string() }
            },
            redb::DatabaseError::Storage(source) => source.into(),
            other => StoreError::Corruption { message: other.to_string(), location: here() },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(StoreError::Busy { message: "locked".into() }.is_retryable());
        assert!(!StoreError::EmptyStore.is_retryable());
        assert!(!StoreError::Conflict { entity: "ledger", key: "7".into() }.is_retryable());
    }

    #[test]
    fn test_fatal_classification() {
        let corrupted: StoreError = redb::StorageError::Corrupted("bad page".into()).into();
        assert!(corrupted.is_fatal());
        assert!(!StoreError::OutOfOrder { sequence: 4, latest: 5 }.is_fatal());
    }

    #[test]
    fn test_decode_wraps_wire_error() {
        let err: StoreError = WireError::UnknownDiscriminant { value: 3 }.into();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("unknown discriminant 3"));
    }
}
