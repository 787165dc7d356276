//! Error types for storage operations.
//!
//! Provides a unified error type covering metadata failures from the core
//! crate, database access, and transaction lifecycle violations.

use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Field metadata, coercion, or predicate failure.
    #[error("model error: {0}")]
    Model(#[from] model_store_core::Error),

    /// SQLite database operation failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The requested row does not exist.
    #[error("not found")]
    NotFound,

    /// Commit or rollback on a transaction the client does not hold.
    #[error("transaction not valid")]
    TxInvalid,

    /// The client has not been opened, or has been closed.
    #[error("database not open")]
    NotOpen,
}

/// Convenience alias for results with [`StoreError`].
pub type Result<T> = std::result::Result<T, StoreError>;
