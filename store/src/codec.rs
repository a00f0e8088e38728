//! Typed access to store values, encoded with bincode.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::kv::KvStore;
use crate::StoreError;

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    Ok(bincode::serialize(value)?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    Ok(bincode::deserialize(bytes)?)
}

/// Read and decode the value at `key`, if present.
pub fn get_value<T: DeserializeOwned>(store: &dyn KvStore, key: &[u8]) -> Result<Option<T>, StoreError> {
    store.get(key)?.map(|bytes| decode(&bytes)).transpose()
}

/// Encode and write `value` at `key`.
pub fn set_value<T: Serialize>(store: &mut dyn KvStore, key: &[u8], value: &T) -> Result<(), StoreError> {
    store.set(key, encode(value)?)
}

/// Decode every value under `prefix`, in key order.
pub fn prefix_values<T: DeserializeOwned>(store: &dyn KvStore, prefix: &[u8]) -> Result<Vec<T>, StoreError> {
    store
        .iter_prefix(prefix)?
        .into_iter()
        .map(|(_, bytes)| decode(&bytes))
        .collect()
}
