//! A recording decorator over any [`StoreAdapter`].
//!
//! [`RecordingStore`] passes every call through to the wrapped backend and
//! logs it as a [`StoreOp`]. Since each adapter call is one logical round
//! trip, the log is exactly the round-trip history -- which is what the
//! engine's cache and write-behind guarantees are stated in terms of, and
//! what the session tests assert against.

use std::cell::RefCell;

use satchel_core::kind::KindDef;
use satchel_core::{FieldMap, RecordKey};

use crate::error::StoreError;
use crate::traits::StoreAdapter;

/// One recorded store round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Insert {
        kind: String,
        key: RecordKey,
    },
    Update {
        kind: String,
        key: RecordKey,
        /// Names of the fields the update carried, in field order.
        fields: Vec<String>,
    },
    Delete {
        kind: String,
        key: RecordKey,
    },
    Select {
        kind: String,
        key: RecordKey,
        found: bool,
    },
}

/// Per-operation round-trip totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub inserts: usize,
    pub updates: usize,
    pub deletes: usize,
    pub selects: usize,
}

impl StoreCounts {
    /// Total round trips across all operations.
    pub fn total(&self) -> usize {
        self.inserts + self.updates + self.deletes + self.selects
    }
}

/// Wraps a backend and records every operation sent to it.
///
/// The log lives in a `RefCell` because `select_by_key` takes `&self`;
/// a session is single-threaded by design, so this is never contended.
#[derive(Debug)]
pub struct RecordingStore<S> {
    inner: S,
    log: RefCell<Vec<StoreOp>>,
}

impl<S> RecordingStore<S> {
    /// Wraps `inner`, starting with an empty log.
    pub fn new(inner: S) -> Self {
        RecordingStore {
            inner,
            log: RefCell::new(Vec::new()),
        }
    }

    /// A copy of the recorded operations, in call order.
    pub fn ops(&self) -> Vec<StoreOp> {
        self.log.borrow().clone()
    }

    /// Round-trip totals for the recorded operations.
    pub fn counts(&self) -> StoreCounts {
        let mut counts = StoreCounts::default();
        for op in self.log.borrow().iter() {
            match op {
                StoreOp::Insert { .. } => counts.inserts += 1,
                StoreOp::Update { .. } => counts.updates += 1,
                StoreOp::Delete { .. } => counts.deletes += 1,
                StoreOp::Select { .. } => counts.selects += 1,
            }
        }
        counts
    }

    /// Empties the log without touching the backend.
    pub fn clear_log(&self) {
        self.log.borrow_mut().clear();
    }

    /// The wrapped backend.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Unwraps, discarding the log.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: StoreAdapter> StoreAdapter for RecordingStore<S> {
    fn insert(
        &mut self,
        kind: &KindDef,
        key: Option<RecordKey>,
        fields: &FieldMap,
    ) -> Result<RecordKey, StoreError> {
        let key = self.inner.insert(kind, key, fields)?;
        self.log.borrow_mut().push(StoreOp::Insert {
            kind: kind.name.clone(),
            key,
        });
        Ok(key)
    }

    fn update(
        &mut self,
        kind: &KindDef,
        key: RecordKey,
        changed: &FieldMap,
    ) -> Result<(), StoreError> {
        self.inner.update(kind, key, changed)?;
        self.log.borrow_mut().push(StoreOp::Update {
            kind: kind.name.clone(),
            key,
            fields: changed.keys().cloned().collect(),
        });
        Ok(())
    }

    fn delete(&mut self, kind: &KindDef, key: RecordKey) -> Result<(), StoreError> {
        self.inner.delete(kind, key)?;
        self.log.borrow_mut().push(StoreOp::Delete {
            kind: kind.name.clone(),
            key,
        });
        Ok(())
    }

    fn select_by_key(
        &self,
        kind: &KindDef,
        key: RecordKey,
    ) -> Result<Option<FieldMap>, StoreError> {
        let found = self.inner.select_by_key(kind, key)?;
        self.log.borrow_mut().push(StoreOp::Select {
            kind: kind.name.clone(),
            key,
            found: found.is_some(),
        });
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use satchel_core::KeyStrategy;

    fn team_kind() -> KindDef {
        KindDef {
            name: "team".into(),
            strategy: KeyStrategy::Assigned,
        }
    }

    #[test]
    fn records_operations_in_call_order() {
        let mut store = RecordingStore::new(InMemoryStore::new());
        let kind = team_kind();

        let key = store
            .insert(&kind, Some(RecordKey(1)), &FieldMap::new())
            .unwrap();
        store.select_by_key(&kind, key).unwrap();
        store.delete(&kind, key).unwrap();

        assert_eq!(
            store.ops(),
            vec![
                StoreOp::Insert {
                    kind: "team".into(),
                    key: RecordKey(1)
                },
                StoreOp::Select {
                    kind: "team".into(),
                    key: RecordKey(1),
                    found: true
                },
                StoreOp::Delete {
                    kind: "team".into(),
                    key: RecordKey(1)
                },
            ]
        );
    }

    #[test]
    fn counts_tally_per_operation() {
        let mut store = RecordingStore::new(InMemoryStore::new());
        let kind = team_kind();

        store
            .insert(&kind, Some(RecordKey(1)), &FieldMap::new())
            .unwrap();
        store.select_by_key(&kind, RecordKey(1)).unwrap();
        store.select_by_key(&kind, RecordKey(2)).unwrap();

        let counts = store.counts();
        assert_eq!(counts.inserts, 1);
        assert_eq!(counts.selects, 2);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn failed_calls_are_not_recorded() {
        let mut store = RecordingStore::new(InMemoryStore::new());
        let kind = team_kind();

        let result = store.delete(&kind, RecordKey(9));
        assert!(result.is_err());
        assert!(store.ops().is_empty());
    }

    #[test]
    fn clear_log_keeps_backend_data() {
        let mut store = RecordingStore::new(InMemoryStore::new());
        let kind = team_kind();

        store
            .insert(&kind, Some(RecordKey(1)), &FieldMap::new())
            .unwrap();
        store.clear_log();

        assert!(store.ops().is_empty());
        assert!(store
            .select_by_key(&kind, RecordKey(1))
            .unwrap()
            .is_some());
    }
}
