//! The identity map: per-context cache holding at most one live managed
//! record per `(kind, key)`.
//!
//! The map is a generational arena. It owns every managed [`Record`];
//! callers hold [`RecordHandle`] values -- slot index plus generation --
//! never references. Detaching a record (remove, clear, end of context)
//! bumps its slot's generation, so any handle taken before the detach
//! stops resolving instead of silently aliasing a later occupant.

use std::collections::HashMap;

use satchel_core::{FieldMap, KindId, Record, RecordKey};

/// Opaque handle to a managed record.
///
/// Stable for as long as the record stays managed in its context; resolves
/// to nothing afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordHandle {
    slot: u32,
    generation: u32,
}

/// One managed record plus its tracking state.
#[derive(Debug)]
pub(crate) struct Managed {
    /// The live record instance.
    pub record: Record,
    /// Field values captured the moment the record became managed,
    /// refreshed after every flushed update. `None` only transiently.
    pub snapshot: Option<FieldMap>,
    /// Queued for deletion; invisible to `find` but still occupying the
    /// key until the delete is flushed.
    pub removed: bool,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    entry: Option<Managed>,
}

/// Per-context cache keyed by `(kind, key)`.
#[derive(Debug, Default)]
pub struct IdentityMap {
    slots: Vec<Slot>,
    index: HashMap<(KindId, RecordKey), u32>,
    free: Vec<u32>,
}

impl IdentityMap {
    /// Creates an empty identity map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live managed records (including removed-but-unflushed).
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True if nothing is managed.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// True if a live managed record exists for `(kind, key)`.
    pub fn contains(&self, kind: KindId, key: RecordKey) -> bool {
        self.index.contains_key(&(kind, key))
    }

    /// The cache probe: returns the managed instance's handle if present.
    /// Never touches the store -- a miss means the caller falls through.
    pub fn lookup(&self, kind: KindId, key: RecordKey) -> Option<RecordHandle> {
        self.index.get(&(kind, key)).map(|&slot| RecordHandle {
            slot,
            generation: self.slots[slot as usize].generation,
        })
    }

    /// Registers a keyed record as managed.
    ///
    /// Returns `None` if the record has no key or a live managed record
    /// already occupies the key -- both invariant violations the session
    /// surfaces as errors before any state changes.
    pub(crate) fn put(&mut self, record: Record, snapshot: Option<FieldMap>) -> Option<RecordHandle> {
        let key = record.key()?;
        let kind = record.kind();
        if self.index.contains_key(&(kind, key)) {
            return None;
        }

        let entry = Managed {
            record,
            snapshot,
            removed: false,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot as usize].entry = Some(entry);
                slot
            }
            None => {
                let slot = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    entry: Some(entry),
                });
                slot
            }
        };
        self.index.insert((kind, key), slot);
        Some(RecordHandle {
            slot,
            generation: self.slots[slot as usize].generation,
        })
    }

    /// Resolves a handle, generation-checked.
    pub(crate) fn entry(&self, handle: RecordHandle) -> Option<&Managed> {
        let slot = self.slots.get(handle.slot as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.entry.as_ref()
    }

    /// Resolves a handle for mutation, generation-checked.
    pub(crate) fn entry_mut(&mut self, handle: RecordHandle) -> Option<&mut Managed> {
        let slot = self.slots.get_mut(handle.slot as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.entry.as_mut()
    }

    /// Detaches one record, invalidating every outstanding handle to it.
    pub(crate) fn vacate(&mut self, handle: RecordHandle) -> Option<Managed> {
        let slot = self.slots.get_mut(handle.slot as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let entry = slot.entry.take()?;
        slot.generation += 1;
        self.free.push(handle.slot);
        if let Some(key) = entry.record.key() {
            self.index.remove(&(entry.record.kind(), key));
        }
        Some(entry)
    }

    /// Detaches every record, discarding all snapshots. Every outstanding
    /// handle becomes stale.
    pub fn clear(&mut self) {
        for (slot_index, slot) in self.slots.iter_mut().enumerate() {
            if slot.entry.take().is_some() {
                slot.generation += 1;
                self.free.push(slot_index as u32);
            }
        }
        self.index.clear();
    }

    /// Handles of all live entries, in slot (registration) order.
    pub(crate) fn live_handles(&self) -> Vec<RecordHandle> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.entry.is_some())
            .map(|(slot, s)| RecordHandle {
                slot: slot as u32,
                generation: s.generation,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use satchel_core::FieldValue;

    fn team_record(key: i64, name: &str) -> Record {
        Record::with_key(KindId(0), RecordKey(key)).with_field("name", name)
    }

    #[test]
    fn put_then_lookup_returns_same_handle() {
        let mut map = IdentityMap::new();
        let handle = map.put(team_record(1, "TeamA"), None).unwrap();

        let found = map.lookup(KindId(0), RecordKey(1)).unwrap();
        assert_eq!(found, handle);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn lookup_miss_reports_absent() {
        let map = IdentityMap::new();
        assert_eq!(map.lookup(KindId(0), RecordKey(1)), None);
    }

    #[test]
    fn put_rejects_keyless_records() {
        let mut map = IdentityMap::new();
        assert!(map.put(Record::new(KindId(0)), None).is_none());
        assert!(map.is_empty());
    }

    #[test]
    fn put_rejects_key_collision() {
        let mut map = IdentityMap::new();
        map.put(team_record(1, "TeamA"), None).unwrap();
        assert!(map.put(team_record(1, "TeamB"), None).is_none());
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn same_key_different_kind_are_distinct() {
        let mut map = IdentityMap::new();
        map.put(team_record(1, "TeamA"), None).unwrap();
        let other = Record::with_key(KindId(1), RecordKey(1));
        assert!(map.put(other, None).is_some());
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn vacate_detaches_and_invalidates_handles() {
        let mut map = IdentityMap::new();
        let handle = map.put(team_record(1, "TeamA"), None).unwrap();

        let entry = map.vacate(handle).unwrap();
        assert_eq!(
            entry.record.get("name"),
            Some(&FieldValue::Text("TeamA".into()))
        );

        // The handle is stale now.
        assert!(map.entry(handle).is_none());
        assert_eq!(map.lookup(KindId(0), RecordKey(1)), None);
    }

    #[test]
    fn slot_reuse_does_not_resurrect_stale_handles() {
        let mut map = IdentityMap::new();
        let old = map.put(team_record(1, "TeamA"), None).unwrap();
        map.vacate(old).unwrap();

        // Reuses the freed slot under a new generation.
        let new = map.put(team_record(2, "TeamB"), None).unwrap();
        assert!(map.entry(old).is_none());
        assert_eq!(
            map.entry(new).unwrap().record.get("name"),
            Some(&FieldValue::Text("TeamB".into()))
        );
    }

    #[test]
    fn clear_detaches_everything() {
        let mut map = IdentityMap::new();
        let first = map.put(team_record(1, "TeamA"), None).unwrap();
        let second = map.put(team_record(2, "TeamB"), None).unwrap();

        map.clear();

        assert!(map.is_empty());
        assert!(map.entry(first).is_none());
        assert!(map.entry(second).is_none());
        assert_eq!(map.lookup(KindId(0), RecordKey(1)), None);
    }

    #[test]
    fn live_handles_follow_registration_order() {
        let mut map = IdentityMap::new();
        let first = map.put(team_record(1, "TeamA"), None).unwrap();
        let second = map.put(team_record(2, "TeamB"), None).unwrap();

        assert_eq!(map.live_handles(), vec![first, second]);
    }
}
