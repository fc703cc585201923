//! Ordered key-value context injected into the registry.
//!
//! The registry never owns persistent storage. Every component reads and
//! writes through a [`KvStore`], and the keeper wraps each transition in a
//! [`CacheStore`] so that a failed transition leaves the underlying store
//! untouched.

use {
    itertools::{EitherOrBoth, Itertools},
    std::collections::BTreeMap,
};

/// A `(key, value)` pair yielded by prefix iteration.
pub type KvPair = (Vec<u8>, Vec<u8>);

/// Byte-ordered key-value storage.
pub trait KvStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    fn set(&mut self, key: &[u8], value: Vec<u8>);

    fn delete(&mut self, key: &[u8]);

    /// Every entry whose key starts with `prefix`, in ascending key order.
    fn iter_prefix(&self, prefix: &[u8]) -> Box<dyn Iterator<Item = KvPair> + '_>;

    fn has(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }
}

/// In-memory store backed by a `BTreeMap`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) {
        self.entries.insert(key.to_vec(), value);
    }

    fn delete(&mut self, key: &[u8]) {
        self.entries.remove(key);
    }

    fn iter_prefix(&self, prefix: &[u8]) -> Box<dyn Iterator<Item = KvPair> + '_> {
        let prefix = prefix.to_vec();
        Box::new(
            self.entries
                .range(prefix.clone()..)
                .take_while(move |(key, _)| key.starts_with(&prefix))
                .map(|(key, value)| (key.clone(), value.clone())),
        )
    }
}

/// Write buffer over a parent store.
///
/// Reads fall through to the parent unless the key was written or deleted in
/// the buffer. Nothing reaches the parent until [`CacheStore::write`];
/// dropping the cache discards every buffered write.
pub struct CacheStore<'a, S: KvStore + ?Sized> {
    parent: &'a mut S,
    /// `None` marks a deletion.
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a, S: KvStore + ?Sized> CacheStore<'a, S> {
    pub fn new(parent: &'a mut S) -> Self {
        Self {
            parent,
            writes: BTreeMap::new(),
        }
    }

    /// Number of buffered writes and deletions.
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    /// Flush every buffered write into the parent.
    pub fn write(self) {
        for (key, value) in self.writes {
            match value {
                Some(value) => self.parent.set(&key, value),
                None => self.parent.delete(&key),
            }
        }
    }
}

impl<S: KvStore + ?Sized> KvStore for CacheStore<'_, S> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.writes.get(key) {
            Some(buffered) => buffered.clone(),
            None => self.parent.get(key),
        }
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) {
        self.writes.insert(key.to_vec(), Some(value));
    }

    fn delete(&mut self, key: &[u8]) {
        self.writes.insert(key.to_vec(), None);
    }

    fn iter_prefix(&self, prefix: &[u8]) -> Box<dyn Iterator<Item = KvPair> + '_> {
        let owned_prefix = prefix.to_vec();
        let buffered = self
            .writes
            .range(owned_prefix.clone()..)
            .take_while(move |(key, _)| key.starts_with(&owned_prefix));

        Box::new(
            self.parent
                .iter_prefix(prefix)
                .merge_join_by(buffered, |parent, cached| parent.0.cmp(cached.0))
                .filter_map(|entry| match entry {
                    EitherOrBoth::Left(pair) => Some(pair),
                    EitherOrBoth::Right((key, value)) | EitherOrBoth::Both(_, (key, value)) => {
                        value.as_ref().map(|value| (key.clone(), value.clone()))
                    }
                }),
        )
    }
}
