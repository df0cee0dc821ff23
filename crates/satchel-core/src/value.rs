//! Field values and field maps -- the dynamic payload of a record.
//!
//! [`FieldValue`] is the closed set of scalar value types a record field can
//! hold. Value equality (`PartialEq`) is the comparison the dirty checker
//! uses, so two fields are "unchanged" exactly when they compare equal here.
//!
//! [`FieldMap`] is a `BTreeMap` rather than a `HashMap` so that iteration
//! order is deterministic: diffs, JSON output, and store writes all see
//! fields in the same order on every run.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single field value. The closed scalar set mirrors what the SQLite
/// backend can hold in one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Absent / SQL NULL.
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    Text(String),
}

/// Named fields of a record, ordered by field name.
pub type FieldMap = BTreeMap<String, FieldValue>;

impl FieldValue {
    /// Returns true for [`FieldValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Human-readable name of the value's type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "bool",
            FieldValue::Int(_) => "int",
            FieldValue::Real(_) => "real",
            FieldValue::Text(_) => "text",
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "null"),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Real(r) => write!(f, "{}", r),
            FieldValue::Text(t) => write!(f, "{}", t),
        }
    }
}

// Conversions for ergonomic record construction.

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Real(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}
