//! SQLite implementation of [`StoreAdapter`].
//!
//! [`SqliteStore`] persists records in a SQLite database with WAL mode,
//! atomic transactions on every write, and automatic schema migrations.
//! Field maps are stored as JSON TEXT columns via serde_json, so the row
//! layout is one generic table regardless of kind.

use rusqlite::{params, Connection, OptionalExtension};

use satchel_core::kind::KindDef;
use satchel_core::{FieldMap, RecordKey};

use crate::error::StoreError;
use crate::traits::StoreAdapter;

/// SQLite-backed implementation of [`StoreAdapter`].
///
/// Every write operation is wrapped in a transaction for atomicity.
/// The database uses WAL mode and foreign keys.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) a SQLite database at `path`.
    pub fn new(path: &str) -> Result<Self, StoreError> {
        let conn = crate::schema::open_database(path)?;
        Ok(SqliteStore { conn })
    }

    /// Opens an in-memory SQLite database (for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = crate::schema::open_in_memory()?;
        Ok(SqliteStore { conn })
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    /// Reads the fields column for `(kind, key)`, if the row exists.
    fn load_fields(
        conn: &Connection,
        kind: &str,
        key: RecordKey,
    ) -> Result<Option<FieldMap>, StoreError> {
        let json: Option<String> = conn
            .query_row(
                "SELECT fields FROM records WHERE kind = ?1 AND key = ?2",
                params![kind, key.0],
                |row| row.get(0),
            )
            .optional()?;
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

impl StoreAdapter for SqliteStore {
    fn insert(
        &mut self,
        kind: &KindDef,
        key: Option<RecordKey>,
        fields: &FieldMap,
    ) -> Result<RecordKey, StoreError> {
        let tx = self.conn.transaction()?;

        let key = match key {
            Some(key) => {
                let exists: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM records WHERE kind = ?1 AND key = ?2)",
                    params![kind.name, key.0],
                    |row| row.get(0),
                )?;
                if exists {
                    return Err(StoreError::DuplicateKey {
                        kind: kind.name.clone(),
                        key: key.0,
                    });
                }
                key
            }
            None => {
                let next: Option<i64> = tx
                    .query_row(
                        "SELECT next_key FROM kind_seq WHERE kind = ?1",
                        params![kind.name],
                        |row| row.get(0),
                    )
                    .optional()?;
                RecordKey(next.unwrap_or(1))
            }
        };

        let json = serde_json::to_string(fields)?;
        tx.execute(
            "INSERT INTO records (kind, key, fields) VALUES (?1, ?2, ?3)",
            params![kind.name, key.0, json],
        )?;
        // Keep the allocator ahead of caller-supplied keys so a later
        // identity insert cannot collide with an assigned one.
        tx.execute(
            "INSERT INTO kind_seq (kind, next_key) VALUES (?1, ?2)
             ON CONFLICT(kind) DO UPDATE SET next_key = MAX(next_key, excluded.next_key)",
            params![kind.name, key.0 + 1],
        )?;

        tx.commit()?;
        Ok(key)
    }

    fn update(
        &mut self,
        kind: &KindDef,
        key: RecordKey,
        changed: &FieldMap,
    ) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;

        let mut row = Self::load_fields(&tx, &kind.name, key)?.ok_or_else(|| {
            StoreError::RowNotFound {
                kind: kind.name.clone(),
                key: key.0,
            }
        })?;
        for (field, value) in changed {
            row.insert(field.clone(), value.clone());
        }

        let json = serde_json::to_string(&row)?;
        tx.execute(
            "UPDATE records SET fields = ?3 WHERE kind = ?1 AND key = ?2",
            params![kind.name, key.0, json],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn delete(&mut self, kind: &KindDef, key: RecordKey) -> Result<(), StoreError> {
        let affected = self.conn.execute(
            "DELETE FROM records WHERE kind = ?1 AND key = ?2",
            params![kind.name, key.0],
        )?;
        if affected == 0 {
            return Err(StoreError::RowNotFound {
                kind: kind.name.clone(),
                key: key.0,
            });
        }
        Ok(())
    }

    fn select_by_key(
        &self,
        kind: &KindDef,
        key: RecordKey,
    ) -> Result<Option<FieldMap>, StoreError> {
        Self::load_fields(&self.conn, &kind.name, key)
    }
}
