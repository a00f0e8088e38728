//! Ordered key-value store trait.

use crate::StoreError;

/// A batch of pending writes. `None` marks a deletion.
pub type Writes = Vec<(Vec<u8>, Option<Vec<u8>>)>;

/// Ordered binary key-value storage.
///
/// Keys compare lexicographically. Every backend (in-memory for tests, or an
/// overlay such as [`crate::CacheStore`]) implements this trait, and the rest
/// of the codebase depends only on it.
pub trait KvStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    fn set(&mut self, key: &[u8], value: Vec<u8>) -> Result<(), StoreError>;

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError>;

    /// All entries with `start <= key < end` in ascending key order.
    /// `end = None` means unbounded.
    fn range(&self, start: &[u8], end: Option<&[u8]>) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError>;

    fn has(&self, key: &[u8]) -> Result<bool, StoreError> {
        Ok(self.get(key)?.is_some())
    }

    /// All entries whose key starts with `prefix`, ascending.
    fn iter_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let end = prefix_end(prefix);
        self.range(prefix, end.as_deref())
    }

    /// Apply a batch of writes in order.
    fn apply(&mut self, writes: Writes) -> Result<(), StoreError> {
        for (key, value) in writes {
            match value {
                Some(v) => self.set(&key, v)?,
                None => self.delete(&key)?,
            }
        }
        Ok(())
    }
}

/// Smallest key strictly greater than every key starting with `prefix`, or
/// `None` if no such key exists (the prefix is empty or all `0xff`).
pub fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}
