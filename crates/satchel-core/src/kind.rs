//! Entity kinds and the kind registry.
//!
//! Every record belongs to a registered kind identified by a [`KindId`],
//! providing O(1) identity comparison. The [`KindRegistry`] manages kind
//! registration and lookup; the key-generation strategy is part of the
//! kind definition because it is per-kind static configuration, not
//! per-record state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::id::KindId;

/// How a kind's primary keys come into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyStrategy {
    /// The store allocates the key synchronously on insert. An insert for
    /// an identity kind cannot be deferred, since the key is unknown until
    /// the store answers.
    Identity,
    /// The caller supplies the key before persisting. Inserts may be
    /// deferred to the next flush.
    Assigned,
}

/// Definition of one entity kind: its stable name and key strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindDef {
    /// Stable name, used by stores as the persistent identifier.
    pub name: String,
    /// Key-generation strategy for records of this kind.
    pub strategy: KeyStrategy,
}

/// Registry of all entity kinds known to a process.
///
/// Kinds are registered once at startup and shared across sessions; the
/// registry is never mutated while sessions are live.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KindRegistry {
    /// Definitions indexed by KindId.0.
    kinds: Vec<KindDef>,
    /// Name lookup.
    names: HashMap<String, KindId>,
}

impl KindRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        KindRegistry {
            kinds: Vec::new(),
            names: HashMap::new(),
        }
    }

    /// Registers a kind and returns its new [`KindId`].
    ///
    /// Returns [`CoreError::DuplicateKindName`] if a kind with the same
    /// name already exists.
    pub fn register(&mut self, name: &str, strategy: KeyStrategy) -> Result<KindId, CoreError> {
        if self.names.contains_key(name) {
            return Err(CoreError::DuplicateKindName {
                name: name.to_string(),
            });
        }
        let id = KindId(self.kinds.len() as u32);
        self.kinds.push(KindDef {
            name: name.to_string(),
            strategy,
        });
        self.names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Looks up a kind definition by its [`KindId`].
    pub fn get(&self, id: KindId) -> Option<&KindDef> {
        self.kinds.get(id.0 as usize)
    }

    /// Like [`get`](Self::get), but unknown IDs are an error.
    pub fn require(&self, id: KindId) -> Result<&KindDef, CoreError> {
        self.get(id).ok_or(CoreError::KindNotFound { id })
    }

    /// Looks up a kind's [`KindId`] by name.
    pub fn get_by_name(&self, name: &str) -> Option<KindId> {
        self.names.get(name).copied()
    }

    /// Number of registered kinds.
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// True if no kinds are registered.
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_returns_sequential_ids() {
        let mut reg = KindRegistry::new();
        let member = reg.register("member", KeyStrategy::Identity).unwrap();
        let team = reg.register("team", KeyStrategy::Assigned).unwrap();

        assert_eq!(member, KindId(0));
        assert_eq!(team, KindId(1));
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn lookup_by_id_and_name() {
        let mut reg = KindRegistry::new();
        let team = reg.register("team", KeyStrategy::Assigned).unwrap();

        let def = reg.get(team).unwrap();
        assert_eq!(def.name, "team");
        assert_eq!(def.strategy, KeyStrategy::Assigned);

        assert_eq!(reg.get_by_name("team"), Some(team));
        assert_eq!(reg.get_by_name("nonexistent"), None);
    }

    #[test]
    fn duplicate_name_returns_error() {
        let mut reg = KindRegistry::new();
        reg.register("member", KeyStrategy::Identity).unwrap();

        let result = reg.register("member", KeyStrategy::Assigned);
        match result {
            Err(CoreError::DuplicateKindName { name }) => assert_eq!(name, "member"),
            other => panic!("expected DuplicateKindName, got: {:?}", other),
        }
    }

    #[test]
    fn require_unknown_id_is_an_error() {
        let reg = KindRegistry::new();
        let result = reg.require(KindId(9));
        assert!(matches!(
            result,
            Err(CoreError::KindNotFound { id: KindId(9) })
        ));
    }

    #[test]
    fn serde_roundtrip() {
        let mut reg = KindRegistry::new();
        reg.register("board", KeyStrategy::Identity).unwrap();

        let json = serde_json::to_string(&reg).unwrap();
        let back: KindRegistry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back.get_by_name("board"), Some(KindId(0)));
    }
}
