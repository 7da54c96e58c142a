//! Error types shared across the workspace.

use thiserror::Error;

/// Errors from repository implementations (SQLite in production).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error: {0}")]
    Connection(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("not found")]
    NotFound,
}

/// Errors from the usage ledger's atomic store.
///
/// The `QuotaGate` policy layer treats every variant as a fail-open
/// condition: the fault is logged and the request is admitted.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger storage unreachable: {0}")]
    Storage(String),
}

impl From<RepositoryError> for LedgerError {
    fn from(e: RepositoryError) -> Self {
        LedgerError::Storage(e.to_string())
    }
}
