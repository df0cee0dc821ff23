//! In-memory implementation of [`StoreAdapter`].
//!
//! [`InMemoryStore`] is a first-class backend for tests, ephemeral
//! sessions, and anywhere persistence isn't needed. It stores all data in
//! HashMaps with identical semantics to the SQLite backend, including
//! per-kind key allocation for identity-strategy inserts.

use std::collections::HashMap;

use satchel_core::kind::KindDef;
use satchel_core::{FieldMap, RecordKey};

use crate::error::StoreError;
use crate::traits::StoreAdapter;

/// Data stored for a single kind in the in-memory backend.
#[derive(Debug, Clone)]
struct KindTable {
    /// Rows indexed by primary key.
    rows: HashMap<RecordKey, FieldMap>,
    /// Next key handed out for identity-strategy inserts.
    next_key: i64,
}

impl KindTable {
    fn new() -> Self {
        KindTable {
            rows: HashMap::new(),
            next_key: 1,
        }
    }
}

/// In-memory implementation of [`StoreAdapter`].
///
/// All data lives in HashMaps keyed by kind name, so two stores never see
/// each other's rows and a dropped store takes its data with it.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: HashMap<String, KindTable>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        InMemoryStore {
            tables: HashMap::new(),
        }
    }

    /// Number of rows stored for `kind`, for diagnostics and tests.
    pub fn row_count(&self, kind: &str) -> usize {
        self.tables.get(kind).map_or(0, |t| t.rows.len())
    }

    fn table_mut(&mut self, kind: &KindDef) -> &mut KindTable {
        self.tables
            .entry(kind.name.clone())
            .or_insert_with(KindTable::new)
    }
}

impl StoreAdapter for InMemoryStore {
    fn insert(
        &mut self,
        kind: &KindDef,
        key: Option<RecordKey>,
        fields: &FieldMap,
    ) -> Result<RecordKey, StoreError> {
        let table = self.table_mut(kind);
        let key = match key {
            Some(key) => {
                if table.rows.contains_key(&key) {
                    return Err(StoreError::DuplicateKey {
                        kind: kind.name.clone(),
                        key: key.0,
                    });
                }
                key
            }
            None => {
                let key = RecordKey(table.next_key);
                table.next_key += 1;
                key
            }
        };
        table.rows.insert(key, fields.clone());
        // Keep the allocator ahead of caller-supplied keys so a later
        // identity insert cannot collide with an assigned one.
        if key.0 >= table.next_key {
            table.next_key = key.0 + 1;
        }
        Ok(key)
    }

    fn update(
        &mut self,
        kind: &KindDef,
        key: RecordKey,
        changed: &FieldMap,
    ) -> Result<(), StoreError> {
        let table = self.table_mut(kind);
        let row = table
            .rows
            .get_mut(&key)
            .ok_or_else(|| StoreError::RowNotFound {
                kind: kind.name.clone(),
                key: key.0,
            })?;
        for (field, value) in changed {
            row.insert(field.clone(), value.clone());
        }
        Ok(())
    }

    fn delete(&mut self, kind: &KindDef, key: RecordKey) -> Result<(), StoreError> {
        let table = self.table_mut(kind);
        table
            .rows
            .remove(&key)
            .ok_or_else(|| StoreError::RowNotFound {
                kind: kind.name.clone(),
                key: key.0,
            })?;
        Ok(())
    }

    fn select_by_key(
        &self,
        kind: &KindDef,
        key: RecordKey,
    ) -> Result<Option<FieldMap>, StoreError> {
        Ok(self
            .tables
            .get(&kind.name)
            .and_then(|table| table.rows.get(&key))
            .cloned())
    }
}
