//! Store error types.

use thiserror::Error;

/// Errors that can occur during document-store operations.
///
/// "Not found" is deliberately not an error here: point reads return
/// [`crate::ReadOutcome`] so callers can tell an absent document from a
/// transient store failure.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLx error (connection, query, etc.)
    #[error("store error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// A schema migration failed to apply.
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// A document body could not be serialized for writing.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
