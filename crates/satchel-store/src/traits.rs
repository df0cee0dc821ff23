//! The [`StoreAdapter`] trait defining the storage contract the
//! persistence-context engine drains into.
//!
//! The contract is four operations -- insert, update, delete, select-by-key.
//! Each call is one logical round trip and completes strictly before the
//! caller observes its result; batching is a backend's own business. The
//! engine never touches storage any other way, so all backends
//! (InMemoryStore, SqliteStore, recording decorators) are fully swappable.
//!
//! The trait is synchronous (not async): one session serves one logical
//! transaction on one thread of control.

use satchel_core::kind::KindDef;
use satchel_core::{FieldMap, RecordKey};

use crate::error::StoreError;

/// The storage contract behind a persistence context.
pub trait StoreAdapter {
    /// Inserts a row for `kind`.
    ///
    /// With `key: None` the store allocates the key (identity strategy) and
    /// returns it. With `Some(key)` the row is inserted under the supplied
    /// key (assigned strategy); colliding with an existing row is
    /// [`StoreError::DuplicateKey`].
    fn insert(
        &mut self,
        kind: &KindDef,
        key: Option<RecordKey>,
        fields: &FieldMap,
    ) -> Result<RecordKey, StoreError>;

    /// Merges `changed` into the stored row for `(kind, key)`.
    ///
    /// Only the fields present in `changed` are written; the rest of the
    /// row is untouched. A missing row is [`StoreError::RowNotFound`].
    fn update(
        &mut self,
        kind: &KindDef,
        key: RecordKey,
        changed: &FieldMap,
    ) -> Result<(), StoreError>;

    /// Deletes the row for `(kind, key)`.
    ///
    /// A missing row is [`StoreError::RowNotFound`].
    fn delete(&mut self, kind: &KindDef, key: RecordKey) -> Result<(), StoreError>;

    /// Fetches the row for `(kind, key)`.
    ///
    /// Absence is `Ok(None)`, never an error -- the engine decides what a
    /// miss means.
    fn select_by_key(
        &self,
        kind: &KindDef,
        key: RecordKey,
    ) -> Result<Option<FieldMap>, StoreError>;
}
