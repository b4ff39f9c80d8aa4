//! Reference-counted immutable tuples
//!
//! A tuple is an opaque byte record. The durability core never looks
//! inside one; it only holds references while a transaction is in
//! flight and passes the bytes through to the engine and the log.
//! Cloning a `Tuple` acquires a reference, dropping one releases it.

use std::fmt;
use std::sync::Arc;

/// An immutable, reference-counted byte record.
#[derive(Clone, PartialEq, Eq)]
pub struct Tuple {
    data: Arc<[u8]>,
}

impl Tuple {
    /// Builds a tuple holding a copy of `bytes`.
    pub fn new(bytes: &[u8]) -> Self {
        Self { data: bytes.into() }
    }

    /// The tuple's bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Length of the tuple in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the tuple is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of live references to this tuple's storage.
    ///
    /// Exposed so tests can assert the acquire/release discipline of
    /// the transaction lifecycle.
    pub fn refcount(&self) -> usize {
        Arc::strong_count(&self.data)
    }

    /// Whether two handles share the same underlying storage.
    pub fn same(&self, other: &Tuple) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl fmt::Debug for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tuple({} bytes)", self.data.len())
    }
}

impl From<Vec<u8>> for Tuple {
    fn from(bytes: Vec<u8>) -> Self {
        Self { data: bytes.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_bumps_refcount() {
        let tuple = Tuple::new(b"k=1 v=9");
        assert_eq!(tuple.refcount(), 1);
        let alias = tuple.clone();
        assert_eq!(tuple.refcount(), 2);
        drop(alias);
        assert_eq!(tuple.refcount(), 1);
    }

    #[test]
    fn test_same_distinguishes_storage() {
        let tuple = Tuple::new(b"abc");
        let alias = tuple.clone();
        let copy = Tuple::new(b"abc");
        assert!(tuple.same(&alias));
        assert!(!tuple.same(&copy));
        assert_eq!(tuple, copy);
    }

    #[test]
    fn test_bytes_round_trip() {
        let tuple = Tuple::from(vec![1u8, 2, 3]);
        assert_eq!(tuple.bytes(), &[1, 2, 3]);
        assert_eq!(tuple.len(), 3);
        assert!(!tuple.is_empty());
    }
}
