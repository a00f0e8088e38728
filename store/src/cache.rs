//! Copy-on-write overlay over a parent store.
//!
//! Reads fall through to the parent unless the overlay has a pending write
//! for the key. Writes stay in the overlay until [`CacheStore::into_writes`]
//! hands them back to be applied to the parent. Dropping the overlay discards
//! everything, which is how failed operations leave prior state untouched.
//!
//! Overlays nest: a `CacheStore` is itself a [`KvStore`].

use std::collections::BTreeMap;
use std::ops::Bound;

use crate::kv::{KvStore, Writes};
use crate::StoreError;

pub struct CacheStore<'p> {
    parent: &'p dyn KvStore,
    dirty: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'p> CacheStore<'p> {
    pub fn new(parent: &'p dyn KvStore) -> Self {
        Self {
            parent,
            dirty: BTreeMap::new(),
        }
    }

    /// Number of keys written (or deleted) in the overlay.
    pub fn dirty_len(&self) -> usize {
        self.dirty.len()
    }

    /// Consume the overlay, returning its writes in key order.
    pub fn into_writes(self) -> Writes {
        self.dirty.into_iter().collect()
    }
}

impl KvStore for CacheStore<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        match self.dirty.get(key) {
            Some(pending) => Ok(pending.clone()),
            None => self.parent.get(key),
        }
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) -> Result<(), StoreError> {
        self.dirty.insert(key.to_vec(), Some(value));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.dirty.insert(key.to_vec(), None);
        Ok(())
    }

    fn range(&self, start: &[u8], end: Option<&[u8]>) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = self.parent.range(start, end)?.into_iter().collect();
        let upper = match end {
            Some(e) => Bound::Excluded(e.to_vec()),
            None => Bound::Unbounded,
        };
        for (key, pending) in self.dirty.range((Bound::Included(start.to_vec()), upper)) {
            match pending {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }
}
