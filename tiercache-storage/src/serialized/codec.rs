//! Payload codec.
//!
//! Values are stored as JSON, the same representation the rest of the
//! workspace uses for cached entities.

use serde::{de::DeserializeOwned, Serialize};
use tiercache_core::StorageError;

pub fn encode<V: Serialize>(value: &V) -> Result<Vec<u8>, StorageError> {
    serde_json::to_vec(value).map_err(|e| StorageError::Serialization {
        reason: e.to_string(),
    })
}

pub fn decode<V: DeserializeOwned>(bytes: &[u8]) -> Result<V, StorageError> {
    serde_json::from_slice(bytes).map_err(|e| StorageError::Deserialization {
        reason: e.to_string(),
    })
}
