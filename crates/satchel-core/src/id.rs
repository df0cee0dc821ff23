//! Stable ID newtypes for the persistence layer.
//!
//! All IDs are distinct newtype wrappers, providing type safety so that a
//! `RecordKey` cannot be accidentally used where a `KindId` is expected.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Primary key of a stored record.
///
/// The inner `i64` aligns with SQLite's `INTEGER PRIMARY KEY`, so keys
/// allocated by the store round-trip without conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey(pub i64);

/// Entity-kind identity. An index into the [`KindRegistry`](crate::KindRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KindId(pub u32);

// Display implementations -- just print the inner value.

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for KindId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
