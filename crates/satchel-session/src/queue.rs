//! The change queue: the write-behind buffer between the context and the
//! store.
//!
//! Pending writes accumulate in program order and are drained front-to-back
//! at flush. Deferring writes batches round trips and lets a remove cancel
//! a still-queued insert or update for the same key, so a record that never
//! survives to a flush never reaches the store at all.

use std::collections::VecDeque;

use satchel_core::{FieldMap, KindId, KindRegistry, RecordKey};
use satchel_store::StoreAdapter;

use crate::error::SessionError;

/// One pending write operation.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingWrite {
    /// A deferred insert (assigned-strategy kinds only; identity inserts
    /// are sent synchronously at persist).
    Insert {
        kind: KindId,
        key: RecordKey,
        fields: FieldMap,
    },
    /// An implicit update queued by the dirty checker.
    Update {
        kind: KindId,
        key: RecordKey,
        changed: FieldMap,
    },
    /// A queued deletion.
    Delete { kind: KindId, key: RecordKey },
}

impl PendingWrite {
    /// The `(kind, key)` this write targets.
    pub fn target(&self) -> (KindId, RecordKey) {
        match *self {
            PendingWrite::Insert { kind, key, .. }
            | PendingWrite::Update { kind, key, .. }
            | PendingWrite::Delete { kind, key } => (kind, key),
        }
    }
}

/// FIFO buffer of pending writes, exclusively owned by one session.
#[derive(Debug, Default)]
pub struct ChangeQueue {
    pending: VecDeque<PendingWrite>,
}

impl ChangeQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending writes.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// True if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Appends a write at the tail, preserving program order.
    pub(crate) fn enqueue(&mut self, write: PendingWrite) {
        self.pending.push_back(write);
    }

    /// Cancels every still-queued insert/update targeting `(kind, key)`.
    ///
    /// Returns true if a queued insert was cancelled -- in that case the
    /// store never saw the record, so the caller must not queue a delete
    /// for it.
    pub(crate) fn cancel_for(&mut self, kind: KindId, key: RecordKey) -> bool {
        let mut cancelled_insert = false;
        self.pending.retain(|write| {
            if write.target() != (kind, key) {
                return true;
            }
            if matches!(write, PendingWrite::Insert { .. }) {
                cancelled_insert = true;
            }
            false
        });
        cancelled_insert
    }

    /// Sends every pending write to the store in queue order, returning the
    /// number sent.
    ///
    /// On a store error the failed write and everything behind it stay
    /// queued; writes already sent stay sent. The caller is expected to
    /// roll back the enclosing transaction.
    pub(crate) fn drain<S: StoreAdapter>(
        &mut self,
        store: &mut S,
        registry: &KindRegistry,
    ) -> Result<usize, SessionError> {
        let mut sent = 0;
        while let Some(write) = self.pending.front() {
            let (kind, _) = write.target();
            let def = registry.require(kind)?;
            match write {
                PendingWrite::Insert { key, fields, .. } => {
                    store.insert(def, Some(*key), fields)?;
                }
                PendingWrite::Update { key, changed, .. } => {
                    store.update(def, *key, changed)?;
                }
                PendingWrite::Delete { key, .. } => {
                    store.delete(def, *key)?;
                }
            }
            self.pending.pop_front();
            sent += 1;
        }
        Ok(sent)
    }

    /// Discards every pending write unsent (rollback, clear).
    pub(crate) fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use satchel_core::{FieldValue, KeyStrategy};
    use satchel_store::{InMemoryStore, RecordingStore, StoreOp};

    fn registry() -> (KindRegistry, KindId, KindId) {
        let mut reg = KindRegistry::new();
        let member = reg.register("member", KeyStrategy::Identity).unwrap();
        let team = reg.register("team", KeyStrategy::Assigned).unwrap();
        (reg, member, team)
    }

    fn name_fields(name: &str) -> FieldMap {
        FieldMap::from([("name".to_string(), FieldValue::Text(name.into()))])
    }

    #[test]
    fn drain_sends_in_queue_order_and_empties() {
        let (reg, _, team) = registry();
        let mut store = RecordingStore::new(InMemoryStore::new());
        let mut queue = ChangeQueue::new();

        queue.enqueue(PendingWrite::Insert {
            kind: team,
            key: RecordKey(1),
            fields: name_fields("TeamA"),
        });
        queue.enqueue(PendingWrite::Update {
            kind: team,
            key: RecordKey(1),
            changed: name_fields("TeamB"),
        });
        queue.enqueue(PendingWrite::Delete {
            kind: team,
            key: RecordKey(1),
        });

        let sent = queue.drain(&mut store, &reg).unwrap();
        assert_eq!(sent, 3);
        assert!(queue.is_empty());

        assert_eq!(
            store.ops(),
            vec![
                StoreOp::Insert {
                    kind: "team".into(),
                    key: RecordKey(1)
                },
                StoreOp::Update {
                    kind: "team".into(),
                    key: RecordKey(1),
                    fields: vec!["name".into()]
                },
                StoreOp::Delete {
                    kind: "team".into(),
                    key: RecordKey(1)
                },
            ]
        );
    }

    #[test]
    fn drain_empty_queue_touches_nothing() {
        let (reg, _, _) = registry();
        let mut store = RecordingStore::new(InMemoryStore::new());
        let mut queue = ChangeQueue::new();

        let sent = queue.drain(&mut store, &reg).unwrap();
        assert_eq!(sent, 0);
        assert_eq!(store.counts().total(), 0);
    }

    #[test]
    fn cancel_drops_queued_writes_for_the_key() {
        let (_, _, team) = registry();
        let mut queue = ChangeQueue::new();

        queue.enqueue(PendingWrite::Insert {
            kind: team,
            key: RecordKey(1),
            fields: FieldMap::new(),
        });
        queue.enqueue(PendingWrite::Insert {
            kind: team,
            key: RecordKey(2),
            fields: FieldMap::new(),
        });

        let cancelled_insert = queue.cancel_for(team, RecordKey(1));
        assert!(cancelled_insert);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn cancel_without_queued_insert_reports_false() {
        let (_, _, team) = registry();
        let mut queue = ChangeQueue::new();

        queue.enqueue(PendingWrite::Update {
            kind: team,
            key: RecordKey(1),
            changed: FieldMap::new(),
        });

        let cancelled_insert = queue.cancel_for(team, RecordKey(1));
        assert!(!cancelled_insert);
        assert!(queue.is_empty());
    }

    #[test]
    fn failed_drain_keeps_unsent_writes() {
        let (reg, _, team) = registry();
        let mut store = RecordingStore::new(InMemoryStore::new());
        let mut queue = ChangeQueue::new();

        queue.enqueue(PendingWrite::Insert {
            kind: team,
            key: RecordKey(1),
            fields: FieldMap::new(),
        });
        // Updating a row that does not exist fails the drain mid-way.
        queue.enqueue(PendingWrite::Update {
            kind: team,
            key: RecordKey(9),
            changed: FieldMap::new(),
        });
        queue.enqueue(PendingWrite::Delete {
            kind: team,
            key: RecordKey(1),
        });

        let result = queue.drain(&mut store, &reg);
        assert!(result.is_err());

        // The insert went out; the failing update and the delete behind it
        // are still queued.
        assert_eq!(queue.len(), 2);
        assert_eq!(store.counts().inserts, 1);
        assert_eq!(store.counts().deletes, 0);
    }
}
