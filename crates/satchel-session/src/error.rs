//! Session error types.
//!
//! Context-level invariant violations (persisting over a live managed
//! record, touching a detached or removed record) are programming errors
//! and fail immediately; store failures propagate verbatim and are never
//! retried here.

use thiserror::Error;

use satchel_core::CoreError;
use satchel_store::StoreError;

/// Errors produced by persistence-context operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A live managed record already exists for this `(kind, key)`.
    #[error("already managed: kind={kind}, key={key}")]
    AlreadyManaged { kind: String, key: i64 },

    /// The handle does not resolve to a live managed record -- it is stale
    /// (the context was cleared, or the record was removed and flushed) or
    /// the record is queued for deletion.
    #[error("record is not managed by this context")]
    NotManaged,

    /// An assigned-strategy record was persisted without a key.
    #[error("record of kind '{kind}' has no key; assigned-strategy keys must be set before persist")]
    MissingKey { kind: String },

    /// A kind lookup failed.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// A store round trip failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
