//! Storage error types for satchel-store.
//!
//! [`StoreError`] covers all anticipated failure modes in the storage layer:
//! serialization, SQLite failures, key conflicts, and missing rows. The
//! engine propagates these verbatim and never retries (retries, if any, are
//! a backend concern).

use thiserror::Error;

/// Errors produced by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The underlying SQLite call failed.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Applying schema migrations failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// An insert collided with an existing row.
    #[error("duplicate key: kind={kind}, key={key}")]
    DuplicateKey { kind: String, key: i64 },

    /// An update or delete targeted a row that does not exist.
    #[error("row not found: kind={kind}, key={key}")]
    RowNotFound { kind: String, key: i64 },
}
