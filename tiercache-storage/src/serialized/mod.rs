//! Levels that keep objects as serialized bytes.
//!
//! A [`SerializedLevel`] encodes payloads with the [`codec`] and hands the
//! bytes to a [`SerializableStorage`]. [`FileSystemStorage`] is the store
//! used in production; tests plug in their own.

pub mod codec;
pub mod fs;
pub mod level;

pub use fs::FileSystemStorage;
pub use level::SerializedLevel;

use tiercache_core::{ObjectId, StorageError};

/// Byte store keyed by object id.
///
/// Implementations must be safe to call from several threads.
pub trait SerializableStorage: Send + Sync {
    /// Write `bytes` under `id`, replacing any previous value.
    fn store(&self, id: ObjectId, bytes: &[u8]) -> Result<(), StorageError>;

    /// Read the bytes stored under `id`.
    fn retrieve(&self, id: ObjectId) -> Result<Vec<u8>, StorageError>;

    /// Delete the bytes stored under `id`.
    fn delete(&self, id: ObjectId) -> Result<(), StorageError>;

    /// Total bytes currently occupied by the store.
    fn occupied_size(&self) -> u64;
}
