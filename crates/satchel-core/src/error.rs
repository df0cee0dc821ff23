//! Core error types for satchel-core.
//!
//! Uses `thiserror` for structured, matchable error variants.

use thiserror::Error;

use crate::id::KindId;

/// Core errors produced by the satchel-core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Attempting to register a kind name that already exists in the registry.
    #[error("duplicate kind name: '{name}'")]
    DuplicateKindName { name: String },

    /// A KindId was not found in the kind registry.
    #[error("kind not found: KindId({id})", id = id.0)]
    KindNotFound { id: KindId },
}
