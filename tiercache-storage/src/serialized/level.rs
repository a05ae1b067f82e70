//! Level that serializes payloads into a byte store.

use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock};

use serde::{de::DeserializeOwned, Serialize};
use tiercache_core::{
    CacheError, CacheResult, ConfigError, FileSystemLevelConfig, ObjectHandle, ObjectId, Severity,
    Signal, StorageError, ThresholdSignal,
};

use super::codec;
use super::fs::FileSystemStorage;
use super::SerializableStorage;
use crate::level::CacheLevel;

/// Level keeping encoded payloads in a [`SerializableStorage`].
///
/// Exposes one critical signal, `occupied_bytes`, which responds while the
/// store occupies fewer than `max_bytes`.
///
/// The set of ids held by the level is tracked next to the store; the store
/// itself is only asked for bytes and for its occupied size.
pub struct SerializedLevel<V, S> {
    name: String,
    storage: S,
    stored: RwLock<HashSet<ObjectId>>,
    occupied_bytes: Arc<ThresholdSignal<u64>>,
    _payload: PhantomData<fn() -> V>,
}

impl<V, S> SerializedLevel<V, S>
where
    S: SerializableStorage,
{
    pub const DEFAULT_NAME: &'static str = "Filesystem cache";

    /// Wrap a store.
    ///
    /// The signal starts from the store's current occupied size, so a store
    /// that already holds data is accounted for.
    ///
    /// # Errors
    ///
    /// Returns a config error if `max_bytes` is zero.
    pub fn new(storage: S, max_bytes: u64, name: Option<String>) -> CacheResult<Self> {
        if max_bytes == 0 {
            return Err(CacheError::Config(ConfigError::InvalidValue {
                field: "max_bytes".to_string(),
                value: max_bytes.to_string(),
                reason: "max_bytes must be greater than 0".to_string(),
            }));
        }

        let occupied_bytes = Arc::new(ThresholdSignal::byte_limit(
            "occupied_bytes",
            max_bytes,
            Severity::Critical,
        ));
        occupied_bytes.set_current(storage.occupied_size());

        Ok(Self {
            name: name.unwrap_or_else(|| Self::DEFAULT_NAME.to_string()),
            storage,
            stored: RwLock::new(HashSet::new()),
            occupied_bytes,
            _payload: PhantomData,
        })
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Number of objects held by this level.
    pub fn len(&self) -> usize {
        self.stored.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn refresh_signal(&self) {
        self.occupied_bytes.set_current(self.storage.occupied_size());
    }

    fn backend_error(&self, source: StorageError) -> CacheError {
        CacheError::backend(self.name.clone(), source)
    }

    fn not_found(&self, id: ObjectId) -> CacheError {
        CacheError::NotFound {
            id,
            level: self.name.clone(),
        }
    }
}

impl<V> SerializedLevel<V, FileSystemStorage> {
    /// Build a filesystem level from its configuration.
    ///
    /// # Errors
    ///
    /// Returns a config error if the configuration does not validate, or a
    /// backend error if the directory cannot be used.
    pub fn from_config(config: &FileSystemLevelConfig) -> CacheResult<Self> {
        config.validate()?;
        let name = config
            .name
            .clone()
            .unwrap_or_else(|| Self::DEFAULT_NAME.to_string());
        let storage = FileSystemStorage::new(&config.directory)
            .map_err(|e| CacheError::backend(name.clone(), e))?;
        Self::new(storage, config.max_bytes, Some(name))
    }
}

impl<V, S> CacheLevel<V> for SerializedLevel<V, S>
where
    V: Serialize + DeserializeOwned,
    S: SerializableStorage,
{
    fn allocate(&self, handle: &mut ObjectHandle<V>) -> CacheResult<()> {
        let id = handle.id();
        let failure = |reason: String| CacheError::AllocationFailure { id, reason };

        let payload = handle
            .payload()
            .ok_or_else(|| failure("handle carries no payload".to_string()))?;
        let bytes = codec::encode(payload).map_err(|e| failure(e.to_string()))?;

        let mut stored = self
            .stored
            .write()
            .map_err(|_| failure(StorageError::LockPoisoned.to_string()))?;

        self.storage
            .store(id, &bytes)
            .map_err(|e| failure(e.to_string()))?;
        stored.insert(id);
        handle.clear_payload();
        self.refresh_signal();

        tracing::trace!(level = %self.name, object_id = %id, bytes = bytes.len(), "Object stored");
        Ok(())
    }

    fn free(&self, id: ObjectId) -> CacheResult<ObjectHandle<V>> {
        let mut stored = self
            .stored
            .write()
            .map_err(|_| self.backend_error(StorageError::LockPoisoned))?;

        if !stored.contains(&id) {
            return Err(self.not_found(id));
        }

        let bytes = self
            .storage
            .retrieve(id)
            .map_err(|e| self.backend_error(e))?;
        let payload: V = codec::decode(&bytes).map_err(|e| self.backend_error(e))?;
        self.storage.delete(id).map_err(|e| self.backend_error(e))?;

        stored.remove(&id);
        self.refresh_signal();

        Ok(ObjectHandle::with_payload(id, payload))
    }

    fn retrieve(&self, id: ObjectId) -> CacheResult<ObjectHandle<V>> {
        let stored = self
            .stored
            .read()
            .map_err(|_| self.backend_error(StorageError::LockPoisoned))?;

        if !stored.contains(&id) {
            return Err(self.not_found(id));
        }

        let bytes = self
            .storage
            .retrieve(id)
            .map_err(|e| self.backend_error(e))?;
        let payload: V = codec::decode(&bytes).map_err(|e| self.backend_error(e))?;

        Ok(ObjectHandle::with_payload(id, payload))
    }

    fn contains(&self, id: ObjectId) -> bool {
        self.stored
            .read()
            .map(|s| s.contains(&id))
            .unwrap_or(false)
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn signals(&self) -> Vec<Arc<dyn Signal>> {
        vec![self.occupied_bytes.clone() as Arc<dyn Signal>]
    }
}
