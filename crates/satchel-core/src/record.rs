//! The [`Record`] type -- one mutable entity instance.
//!
//! A record is transient until a session persists it. Once managed, its
//! identity is the `(kind, key)` pair and must never change; for that
//! reason the key and kind are read-only after construction except for
//! [`assign_key`](Record::assign_key), which exists for the moment the
//! store allocates an identity-strategy key.

use serde::{Deserialize, Serialize};

use crate::id::{KindId, RecordKey};
use crate::value::{FieldMap, FieldValue};

/// A mutable entity instance with a stable `(kind, key)` identity once the
/// key is assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    kind: KindId,
    key: Option<RecordKey>,
    fields: FieldMap,
}

impl Record {
    /// Creates a transient record with no key (identity-strategy kinds).
    pub fn new(kind: KindId) -> Self {
        Record {
            kind,
            key: None,
            fields: FieldMap::new(),
        }
    }

    /// Creates a transient record with a caller-supplied key
    /// (assigned-strategy kinds).
    pub fn with_key(kind: KindId, key: RecordKey) -> Self {
        Record {
            kind,
            key: Some(key),
            fields: FieldMap::new(),
        }
    }

    /// Rebuilds a record from stored parts (used when loading from a store).
    pub fn from_parts(kind: KindId, key: RecordKey, fields: FieldMap) -> Self {
        Record {
            kind,
            key: Some(key),
            fields,
        }
    }

    /// The record's kind.
    pub fn kind(&self) -> KindId {
        self.kind
    }

    /// The record's primary key, if assigned.
    pub fn key(&self) -> Option<RecordKey> {
        self.key
    }

    /// Assigns the store-allocated key. Only meaningful on a keyless record;
    /// assigning over an existing key would change a managed identity, so
    /// the previous key is returned for the caller to reject.
    pub fn assign_key(&mut self, key: RecordKey) -> Option<RecordKey> {
        self.key.replace(key)
    }

    /// Returns the value of `field`, if set.
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Sets `field` to `value`, returning the previous value if any.
    pub fn set(&mut self, field: &str, value: impl Into<FieldValue>) -> Option<FieldValue> {
        self.fields.insert(field.to_string(), value.into())
    }

    /// Builder-style [`set`](Self::set), for constructing transient records.
    pub fn with_field(mut self, field: &str, value: impl Into<FieldValue>) -> Self {
        self.set(field, value);
        self
    }

    /// All fields, ordered by name.
    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    /// Consumes the record, yielding its field map.
    pub fn into_fields(self) -> FieldMap {
        self.fields
    }
}
