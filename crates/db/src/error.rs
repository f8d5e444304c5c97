//! Storage error types.

use thiserror::Error;

/// Errors raised by repository implementations.
#[derive(Debug, Error)]
pub enum DbError {
    /// No record with this id.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: u64 },

    /// A foreign key points at a record that does not exist.
    #[error("{entity} {id} referenced by {referrer} does not exist")]
    MissingReference {
        entity: &'static str,
        id: u64,
        referrer: &'static str,
    },

    /// Unique constraint violation.
    #[error("{entity} already exists: {key}")]
    Duplicate { entity: &'static str, key: String },

    /// Backend failure (connection, query, ...).
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Result type for storage operations.
pub type DbResult<T> = Result<T, DbError>;
