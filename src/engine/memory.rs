//! In-memory hash engine
//!
//! Keeps every space as a hash map from primary key to tuple, the key
//! being a fixed-length prefix of the tuple's bytes configured when
//! the space is defined. This is the engine embedders start with and
//! the one the test suite runs against.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::space::{Space, SpaceId};
use crate::tuple::Tuple;
use crate::txn::Txn;

use super::{DupMode, Engine, EngineError, EngineResult};

struct SpaceIndex {
    key_len: usize,
    tuples: HashMap<Vec<u8>, Tuple>,
}

impl SpaceIndex {
    fn key_of(&self, tuple: &Tuple) -> Vec<u8> {
        let bytes = tuple.bytes();
        bytes[..self.key_len.min(bytes.len())].to_vec()
    }
}

/// Hash-indexed in-memory engine.
pub struct MemoryEngine {
    spaces: RwLock<HashMap<SpaceId, SpaceIndex>>,
    finished_txns: AtomicU64,
}

impl MemoryEngine {
    /// Creates an engine with no spaces defined.
    pub fn new() -> Self {
        Self {
            spaces: RwLock::new(HashMap::new()),
            finished_txns: AtomicU64::new(0),
        }
    }

    /// Defines a space whose primary key is the first `key_len` bytes
    /// of each tuple. Redefining a space clears its contents.
    pub fn define_space(&self, id: SpaceId, key_len: usize) {
        let mut spaces = self.spaces.write().unwrap_or_else(PoisonError::into_inner);
        spaces.insert(
            id,
            SpaceIndex {
                key_len,
                tuples: HashMap::new(),
            },
        );
    }

    /// Number of tuples currently stored in a space.
    pub fn space_len(&self, id: SpaceId) -> usize {
        let spaces = self.spaces.read().unwrap_or_else(PoisonError::into_inner);
        spaces.get(&id).map_or(0, |index| index.tuples.len())
    }

    /// Looks up a tuple by primary key bytes.
    pub fn get(&self, id: SpaceId, key: &[u8]) -> Option<Tuple> {
        let spaces = self.spaces.read().unwrap_or_else(PoisonError::into_inner);
        spaces.get(&id).and_then(|index| index.tuples.get(key).cloned())
    }

    /// All tuples of a space, in unspecified order.
    pub fn snapshot(&self, id: SpaceId) -> Vec<Tuple> {
        let spaces = self.spaces.read().unwrap_or_else(PoisonError::into_inner);
        spaces
            .get(&id)
            .map(|index| index.tuples.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of transactions finalized against this engine.
    pub fn finished_txns(&self) -> u64 {
        self.finished_txns.load(Ordering::Relaxed)
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for MemoryEngine {
    fn replace(
        &self,
        space: &Space,
        old: Option<&Tuple>,
        new: Option<&Tuple>,
        mode: DupMode,
    ) -> EngineResult<Option<Tuple>> {
        let mut spaces = self.spaces.write().unwrap_or_else(PoisonError::into_inner);
        let index = spaces
            .get_mut(&space.id())
            .ok_or(EngineError::SpaceNotFound { space: space.id() })?;

        match new {
            Some(new) => {
                let key = index.key_of(new);
                let existing = index.tuples.get(&key).cloned();

                // A collision with the tuple being replaced is not a
                // duplicate; only a foreign tuple under the key is.
                let displaces_old = match (&existing, old) {
                    (Some(found), Some(old)) => found.bytes() == old.bytes(),
                    _ => false,
                };

                match mode {
                    DupMode::Insert => {
                        if existing.is_some() && !displaces_old {
                            return Err(EngineError::DuplicateKey { space: space.id() });
                        }
                    }
                    DupMode::Replace => {
                        if existing.is_none() || (old.is_some() && !displaces_old) {
                            return Err(EngineError::TupleNotFound { space: space.id() });
                        }
                    }
                    DupMode::ReplaceOrInsert => {}
                }

                let displaced = index.tuples.insert(key.clone(), new.clone());

                // A replace that changes the primary key also removes
                // the tuple under its old key.
                if let Some(old) = old {
                    let old_key = index.key_of(old);
                    if old_key != key {
                        let removed = index.tuples.remove(&old_key);
                        return Ok(displaced.or(removed));
                    }
                }

                Ok(displaced)
            }
            None => {
                // Pure delete: `old` is guaranteed present by the
                // replace contract.
                let Some(old) = old else {
                    return Err(EngineError::TupleNotFound { space: space.id() });
                };
                let key = index.key_of(old);
                Ok(index.tuples.remove(&key))
            }
        }
    }

    fn txn_finish(&self, _txn: &Txn) {
        self.finished_txns.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn engine_and_space() -> (Arc<MemoryEngine>, Space) {
        let engine = Arc::new(MemoryEngine::new());
        engine.define_space(1, 1);
        let space = Space::new(1, engine.clone());
        (engine, space)
    }

    #[test]
    fn test_insert_and_get() {
        let (engine, space) = engine_and_space();
        let tuple = Tuple::new(b"\x01v=9");

        let displaced = engine
            .replace(&space, None, Some(&tuple), DupMode::Insert)
            .unwrap();
        assert!(displaced.is_none());
        assert_eq!(engine.get(1, b"\x01").unwrap().bytes(), tuple.bytes());
    }

    #[test]
    fn test_insert_duplicate_key_rejected() {
        let (engine, space) = engine_and_space();
        let first = Tuple::new(b"\x01v=9");
        let second = Tuple::new(b"\x01v=10");

        engine
            .replace(&space, None, Some(&first), DupMode::Insert)
            .unwrap();
        let err = engine
            .replace(&space, None, Some(&second), DupMode::Insert)
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateKey { space: 1 }));
        // State is untouched after the error.
        assert_eq!(engine.get(1, b"\x01").unwrap().bytes(), first.bytes());
    }

    #[test]
    fn test_replace_requires_existing() {
        let (engine, space) = engine_and_space();
        let tuple = Tuple::new(b"\x01v=9");

        let err = engine
            .replace(&space, None, Some(&tuple), DupMode::Replace)
            .unwrap_err();
        assert!(matches!(err, EngineError::TupleNotFound { space: 1 }));
    }

    #[test]
    fn test_update_displaces_old_tuple() {
        let (engine, space) = engine_and_space();
        let old = Tuple::new(b"\x01v=9");
        let new = Tuple::new(b"\x01v=10");

        engine
            .replace(&space, None, Some(&old), DupMode::Insert)
            .unwrap();
        let displaced = engine
            .replace(&space, Some(&old), Some(&new), DupMode::Replace)
            .unwrap()
            .unwrap();
        assert_eq!(displaced.bytes(), old.bytes());
        assert_eq!(engine.get(1, b"\x01").unwrap().bytes(), new.bytes());
    }

    #[test]
    fn test_reinstate_over_own_key_is_not_duplicate() {
        let (engine, space) = engine_and_space();
        let old = Tuple::new(b"\x01v=9");
        let new = Tuple::new(b"\x01v=10");

        engine
            .replace(&space, None, Some(&new), DupMode::Insert)
            .unwrap();
        // Rolling back an update: swap `new` out, `old` back in.
        let displaced = engine
            .replace(&space, Some(&new), Some(&old), DupMode::Insert)
            .unwrap()
            .unwrap();
        assert_eq!(displaced.bytes(), new.bytes());
        assert_eq!(engine.get(1, b"\x01").unwrap().bytes(), old.bytes());
    }

    #[test]
    fn test_delete_removes_tuple() {
        let (engine, space) = engine_and_space();
        let tuple = Tuple::new(b"\x01v=9");

        engine
            .replace(&space, None, Some(&tuple), DupMode::Insert)
            .unwrap();
        let displaced = engine
            .replace(&space, Some(&tuple), None, DupMode::Insert)
            .unwrap()
            .unwrap();
        assert_eq!(displaced.bytes(), tuple.bytes());
        assert_eq!(engine.space_len(1), 0);
    }

    #[test]
    fn test_key_change_removes_old_key() {
        let (engine, space) = engine_and_space();
        let old = Tuple::new(b"\x01v=9");
        let new = Tuple::new(b"\x02v=9");

        engine
            .replace(&space, None, Some(&old), DupMode::Insert)
            .unwrap();
        engine
            .replace(&space, Some(&old), Some(&new), DupMode::ReplaceOrInsert)
            .unwrap();
        assert!(engine.get(1, b"\x01").is_none());
        assert!(engine.get(1, b"\x02").is_some());
        assert_eq!(engine.space_len(1), 1);
    }

    #[test]
    fn test_unknown_space_rejected() {
        let engine = Arc::new(MemoryEngine::new());
        let space = Space::new(9, engine.clone());
        let tuple = Tuple::new(b"\x01");
        let err = engine
            .replace(&space, None, Some(&tuple), DupMode::Insert)
            .unwrap_err();
        assert!(matches!(err, EngineError::SpaceNotFound { space: 9 }));
    }
}
