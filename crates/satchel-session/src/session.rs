//! The persistence context: one [`Session`] per logical transaction.
//!
//! A session owns its identity map, change queue, and store for the
//! lifetime of one transaction. Application code persists, finds, mutates,
//! and removes records through handles; structural writes reach the store
//! either synchronously (identity-strategy inserts, whose keys the store
//! allocates) or at the next flush (everything else). At flush the dirty
//! checker appends implicit updates for every managed record whose fields
//! drifted from their snapshot, then the queue drains in program order.
//!
//! One session serves one thread of control; isolation between concurrent
//! transactions is the store's business, not the context's.

use tracing::{debug, trace};

use satchel_core::{FieldValue, KeyStrategy, KindId, KindRegistry, Record, RecordKey};
use satchel_store::StoreAdapter;

use crate::dirty;
use crate::error::SessionError;
use crate::identity::{IdentityMap, RecordHandle};
use crate::queue::{ChangeQueue, PendingWrite};

/// A transaction-scoped persistence context.
pub struct Session<'r, S: StoreAdapter> {
    registry: &'r KindRegistry,
    store: S,
    identity: IdentityMap,
    queue: ChangeQueue,
}

impl<'r, S: StoreAdapter> Session<'r, S> {
    /// Opens a context at transaction start. The registry is per-process
    /// configuration; the store is owned until commit or rollback hands it
    /// back.
    pub fn begin(registry: &'r KindRegistry, store: S) -> Self {
        Session {
            registry,
            store,
            identity: IdentityMap::new(),
            queue: ChangeQueue::new(),
        }
    }

    /// Makes a transient record managed.
    ///
    /// Identity-strategy kinds insert immediately -- the store must answer
    /// with the generated key before the record can enter the identity map.
    /// Assigned-strategy kinds defer the insert to the next flush and
    /// register under the caller-supplied key now. Either way a snapshot is
    /// taken at this point.
    ///
    /// Persisting over a live managed `(kind, key)` -- including persisting
    /// the same record twice -- is [`SessionError::AlreadyManaged`]; this
    /// context never treats it as a silent no-op.
    pub fn persist(&mut self, mut record: Record) -> Result<RecordHandle, SessionError> {
        let def = self.registry.require(record.kind())?;

        let key = match def.strategy {
            KeyStrategy::Identity => {
                if let Some(key) = record.key() {
                    return Err(SessionError::AlreadyManaged {
                        kind: def.name.clone(),
                        key: key.0,
                    });
                }
                let key = self.store.insert(def, None, record.fields())?;
                record.assign_key(key);
                debug!(kind = %def.name, %key, "persist: identity insert sent");
                key
            }
            KeyStrategy::Assigned => {
                let key = record.key().ok_or_else(|| SessionError::MissingKey {
                    kind: def.name.clone(),
                })?;
                if self.identity.contains(record.kind(), key) {
                    return Err(SessionError::AlreadyManaged {
                        kind: def.name.clone(),
                        key: key.0,
                    });
                }
                self.queue.enqueue(PendingWrite::Insert {
                    kind: record.kind(),
                    key,
                    fields: record.fields().clone(),
                });
                debug!(kind = %def.name, %key, queued = self.queue.len(), "persist: insert deferred");
                key
            }
        };

        let snapshot = record.fields().clone();
        let kind_name = def.name.clone();
        self.identity
            .put(record, Some(snapshot))
            .ok_or(SessionError::AlreadyManaged {
                kind: kind_name,
                key: key.0,
            })
    }

    /// Looks up a record by `(kind, key)`.
    ///
    /// An identity-map hit returns the managed instance without touching
    /// the store -- the first-level-cache guarantee. A hit on a record
    /// queued for deletion is absent (also without a store round trip; the
    /// store may still hold the row until the flush). Only a miss queries
    /// the store, registering the loaded record with a fresh snapshot.
    /// Absence is never cached.
    pub fn find(
        &mut self,
        kind: KindId,
        key: RecordKey,
    ) -> Result<Option<RecordHandle>, SessionError> {
        if let Some(handle) = self.identity.lookup(kind, key) {
            let removed = self.identity.entry(handle).map_or(true, |entry| entry.removed);
            if removed {
                trace!(%kind, %key, "find: removed, absent until flush");
                return Ok(None);
            }
            trace!(%kind, %key, "find: cache hit");
            return Ok(Some(handle));
        }

        let def = self.registry.require(kind)?;
        match self.store.select_by_key(def, key)? {
            Some(fields) => {
                trace!(kind = %def.name, %key, "find: loaded from store");
                let record = Record::from_parts(kind, key, fields.clone());
                self.identity
                    .put(record, Some(fields))
                    .map(Some)
                    .ok_or(SessionError::AlreadyManaged {
                        kind: def.name.clone(),
                        key: key.0,
                    })
            }
            None => {
                trace!(kind = %def.name, %key, "find: absent");
                Ok(None)
            }
        }
    }

    /// Read access to a managed record.
    ///
    /// Stale handles and records queued for deletion fail with
    /// [`SessionError::NotManaged`] -- operating on a detached or removed
    /// record is a programming error, never silently tolerated.
    pub fn record(&self, handle: RecordHandle) -> Result<&Record, SessionError> {
        match self.identity.entry(handle) {
            Some(entry) if !entry.removed => Ok(&entry.record),
            _ => Err(SessionError::NotManaged),
        }
    }

    /// Value of one field of a managed record.
    pub fn field(
        &self,
        handle: RecordHandle,
        name: &str,
    ) -> Result<Option<&FieldValue>, SessionError> {
        self.record(handle).map(|record| record.get(name))
    }

    /// Mutates one field of a managed record.
    ///
    /// The write stays in memory; the dirty checker decides at the next
    /// flush whether an update must be sent.
    pub fn set_field(
        &mut self,
        handle: RecordHandle,
        name: &str,
        value: impl Into<FieldValue>,
    ) -> Result<(), SessionError> {
        match self.identity.entry_mut(handle) {
            Some(entry) if !entry.removed => {
                entry.record.set(name, value);
                Ok(())
            }
            _ => Err(SessionError::NotManaged),
        }
    }

    /// Queues a managed record for deletion.
    ///
    /// Any still-queued insert/update for the key is cancelled; if the
    /// cancelled insert was never sent, the store never hears about the
    /// record at all. The record becomes invisible to [`find`](Self::find)
    /// immediately, and detaches once the delete is flushed.
    pub fn remove(&mut self, handle: RecordHandle) -> Result<(), SessionError> {
        let (kind, key) = match self.identity.entry(handle) {
            Some(entry) if !entry.removed => {
                let key = entry.record.key().ok_or(SessionError::NotManaged)?;
                (entry.record.kind(), key)
            }
            _ => return Err(SessionError::NotManaged),
        };

        let cancelled_insert = self.queue.cancel_for(kind, key);
        if cancelled_insert {
            // The row never reached the store; nothing to delete there.
            self.identity.vacate(handle);
            debug!(%kind, %key, "remove: cancelled unflushed insert");
            return Ok(());
        }

        self.queue.enqueue(PendingWrite::Delete { kind, key });
        if let Some(entry) = self.identity.entry_mut(handle) {
            entry.removed = true;
            entry.snapshot = None;
        }
        debug!(%kind, %key, queued = self.queue.len(), "remove: delete deferred");
        Ok(())
    }

    /// Sends every pending write to the store.
    ///
    /// First the dirty checker runs over all managed, non-removed records
    /// with snapshots, queueing an implicit update (and refreshing the
    /// snapshot) wherever fields drifted; then the queue drains in order.
    /// With nothing dirty and nothing queued, no store call is made, so a
    /// second flush in a row is free.
    ///
    /// On a store error the drain stops: sent writes stay sent, the rest
    /// stay queued, and the caller is expected to roll back.
    pub fn flush(&mut self) -> Result<(), SessionError> {
        let mut dirty = 0;
        for handle in self.identity.live_handles() {
            let Some(entry) = self.identity.entry_mut(handle) else {
                continue;
            };
            if entry.removed {
                continue;
            }
            let Some(snapshot) = entry.snapshot.as_ref() else {
                continue;
            };
            let changed = dirty::diff(entry.record.fields(), snapshot);
            if changed.is_empty() {
                continue;
            }
            let kind = entry.record.kind();
            let key = entry.record.key().ok_or(SessionError::NotManaged)?;
            entry.snapshot = Some(entry.record.fields().clone());
            self.queue.enqueue(PendingWrite::Update { kind, key, changed });
            dirty += 1;
        }

        let sent = self.queue.drain(&mut self.store, self.registry)?;

        // Records whose deletes just went out are detached now.
        for handle in self.identity.live_handles() {
            if self
                .identity
                .entry(handle)
                .map_or(false, |entry| entry.removed)
            {
                self.identity.vacate(handle);
            }
        }

        debug!(dirty, sent, "flush complete");
        Ok(())
    }

    /// Detaches every managed record and discards all snapshots *and* all
    /// unflushed queued writes.
    ///
    /// Clear does not flush first: a deferred assigned-strategy insert that
    /// was never explicitly flushed is simply lost, and a subsequent find
    /// for its key misses. Flush-then-clear to keep it.
    pub fn clear(&mut self) {
        let dropped = self.queue.len();
        self.queue.clear();
        self.identity.clear();
        debug!(dropped_writes = dropped, "context cleared");
    }

    /// Ends the transaction: flushes pending writes, discards all context
    /// state, and hands the store back.
    pub fn commit(mut self) -> Result<S, SessionError> {
        self.flush()?;
        debug!("commit");
        Ok(self.store)
    }

    /// Abandons the transaction: every queued write is discarded unsent and
    /// the store handed back untouched.
    pub fn rollback(self) -> S {
        debug!(dropped_writes = self.queue.len(), "rollback");
        self.store
    }

    /// The underlying store (diagnostics; the engine owns it until
    /// commit/rollback).
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Number of writes waiting for the next flush.
    pub fn pending_writes(&self) -> usize {
        self.queue.len()
    }

    /// True if a live managed (not removed) record exists for `(kind, key)`.
    pub fn is_managed(&self, kind: KindId, key: RecordKey) -> bool {
        self.identity
            .lookup(kind, key)
            .and_then(|handle| self.identity.entry(handle))
            .map_or(false, |entry| !entry.removed)
    }

    /// Number of records currently tracked by the identity map.
    pub fn managed_count(&self) -> usize {
        self.identity.len()
    }
}
