//! In-memory level backed by a `HashMap`.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tiercache_core::{
    CacheError, CacheResult, MemoryLevelConfig, ObjectHandle, ObjectId, Severity, Signal,
    StorageError, ThresholdSignal,
};

use crate::level::CacheLevel;

/// Map-backed level.
///
/// Exposes two signals:
/// - `object_count` (critical): object count is at most `max_objects`
/// - `load_percent` (warn): fill ratio is at most `danger_load_percent`
///
/// # Example
///
/// ```ignore
/// let level: InMemoryLevel<String> = InMemoryLevel::new(&MemoryLevelConfig::new(10, 80))?;
/// let mut handle = ObjectHandle::new("value".to_string());
/// level.allocate(&mut handle)?;
/// assert!(level.contains(handle.id()));
/// ```
pub struct InMemoryLevel<V> {
    name: String,
    storage: RwLock<HashMap<ObjectId, V>>,
    object_count: Arc<ThresholdSignal<usize>>,
    load_percent: Arc<ThresholdSignal<usize>>,
}

impl<V> InMemoryLevel<V> {
    pub const DEFAULT_NAME: &'static str = "In-memory cache";

    /// Create an empty level.
    ///
    /// # Errors
    ///
    /// Returns a config error if `config` does not validate.
    pub fn new(config: &MemoryLevelConfig) -> CacheResult<Self> {
        config.validate()?;

        let object_count = Arc::new(ThresholdSignal::max_count(
            "object_count",
            config.max_objects,
            Severity::Critical,
        ));
        let load_percent = Arc::new(ThresholdSignal::load_percent(
            "load_percent",
            config.max_objects,
            config.danger_load_percent,
            Severity::Warn,
        ));
        object_count.set_current(0);
        load_percent.set_current(0);

        Ok(Self {
            name: config
                .name
                .clone()
                .unwrap_or_else(|| Self::DEFAULT_NAME.to_string()),
            storage: RwLock::new(HashMap::new()),
            object_count,
            load_percent,
        })
    }

    /// Number of objects currently held.
    pub fn len(&self) -> usize {
        self.storage.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids currently held, in no particular order.
    pub fn ids(&self) -> Vec<ObjectId> {
        self.storage
            .read()
            .map(|s| s.keys().copied().collect())
            .unwrap_or_default()
    }

    fn update_signals(&self, size: usize) {
        self.object_count.set_current(size);
        self.load_percent.set_current(size);
    }
}

impl<V> CacheLevel<V> for InMemoryLevel<V>
where
    V: Clone + Send + Sync,
{
    fn allocate(&self, handle: &mut ObjectHandle<V>) -> CacheResult<()> {
        let id = handle.id();
        if !handle.has_payload() {
            return Err(CacheError::AllocationFailure {
                id,
                reason: "handle carries no payload".to_string(),
            });
        }

        let mut storage = self
            .storage
            .write()
            .map_err(|_| CacheError::AllocationFailure {
                id,
                reason: StorageError::LockPoisoned.to_string(),
            })?;

        if let Some(payload) = handle.take_payload() {
            storage.insert(id, payload);
        }
        self.update_signals(storage.len());

        tracing::trace!(level = %self.name, object_id = %id, size = storage.len(), "Object stored");
        Ok(())
    }

    fn free(&self, id: ObjectId) -> CacheResult<ObjectHandle<V>> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| CacheError::backend(self.name.clone(), StorageError::LockPoisoned))?;

        let payload = storage.remove(&id).ok_or_else(|| CacheError::NotFound {
            id,
            level: self.name.clone(),
        })?;
        self.update_signals(storage.len());

        Ok(ObjectHandle::with_payload(id, payload))
    }

    fn retrieve(&self, id: ObjectId) -> CacheResult<ObjectHandle<V>> {
        let storage = self
            .storage
            .read()
            .map_err(|_| CacheError::backend(self.name.clone(), StorageError::LockPoisoned))?;

        storage
            .get(&id)
            .map(|payload| ObjectHandle::with_payload(id, payload.clone()))
            .ok_or_else(|| CacheError::NotFound {
                id,
                level: self.name.clone(),
            })
    }

    fn contains(&self, id: ObjectId) -> bool {
        self.storage
            .read()
            .map(|s| s.contains_key(&id))
            .unwrap_or(false)
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn signals(&self) -> Vec<Arc<dyn Signal>> {
        vec![
            self.object_count.clone() as Arc<dyn Signal>,
            self.load_percent.clone() as Arc<dyn Signal>,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tiercache_core::{new_object_id, ConfigError};

    fn level(max_objects: usize, danger: u8) -> InMemoryLevel<String> {
        InMemoryLevel::new(&MemoryLevelConfig::new(max_objects, danger)).unwrap()
    }

    #[test]
    fn test_new_level_is_healthy() {
        let level = level(10, 80);
        assert!(level.is_empty());
        assert_eq!(level.name(), "In-memory cache");
        assert_eq!(
            level.breached(&[Severity::Info, Severity::Warn, Severity::Critical]),
            0
        );
    }

    #[test]
    fn test_custom_name() {
        let level: InMemoryLevel<u8> =
            InMemoryLevel::new(&MemoryLevelConfig::new(5, 50).with_name("hot")).unwrap();
        assert_eq!(level.name(), "hot");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result: CacheResult<InMemoryLevel<u8>> =
            InMemoryLevel::new(&MemoryLevelConfig::new(10, 150));
        assert!(matches!(
            result,
            Err(CacheError::Config(ConfigError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn test_allocate_takes_payload() {
        let level = level(10, 80);
        let mut handle = ObjectHandle::new("a".to_string());

        level.allocate(&mut handle).unwrap();

        assert!(!handle.has_payload());
        assert!(level.contains(handle.id()));
        assert_eq!(level.len(), 1);
    }

    #[test]
    fn test_allocate_without_payload_fails_and_changes_nothing() {
        let level = level(10, 80);
        let mut handle: ObjectHandle<String> = ObjectHandle::empty(new_object_id());

        let err = level.allocate(&mut handle).unwrap_err();

        assert!(matches!(err, CacheError::AllocationFailure { .. }));
        assert!(!level.contains(handle.id()));
        assert!(level.is_empty());
    }

    #[test]
    fn test_retrieve_keeps_object_free_removes_it() {
        let level = level(10, 80);
        let mut handle = ObjectHandle::new("a".to_string());
        let id = handle.id();
        level.allocate(&mut handle).unwrap();

        let read = level.retrieve(id).unwrap();
        assert_eq!(read.payload().map(String::as_str), Some("a"));
        assert!(level.contains(id));

        let freed = level.free(id).unwrap();
        assert_eq!(freed.id(), id);
        assert_eq!(freed.into_payload().as_deref(), Some("a"));
        assert!(!level.contains(id));
    }

    #[test]
    fn test_missing_object_is_not_found() {
        let level = level(10, 80);
        let id = new_object_id();
        assert!(level.free(id).unwrap_err().is_not_found());
        assert!(level.retrieve(id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_signals_follow_size() {
        let level = level(10, 80);
        for _ in 0..8 {
            level.allocate(&mut ObjectHandle::new("x".to_string())).unwrap();
        }
        assert_eq!(level.breached(&[Severity::Warn]), 0);

        let mut ninth = ObjectHandle::new("x".to_string());
        level.allocate(&mut ninth).unwrap();
        assert_eq!(level.breached(&[Severity::Warn]), 1);
        assert_eq!(level.breached(&[Severity::Critical]), 0);

        for _ in 0..2 {
            level.allocate(&mut ObjectHandle::new("x".to_string())).unwrap();
        }
        assert_eq!(level.breached(&[Severity::Critical]), 1);

        level.free(ninth.id()).unwrap();
        assert_eq!(level.breached(&[Severity::Critical]), 0);
        assert_eq!(level.breached(&[Severity::Warn]), 1);
    }

    #[test]
    fn test_concurrent_allocations() {
        let level = Arc::new(level(1000, 80));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let level = Arc::clone(&level);
                thread::spawn(move || {
                    for i in 0..50 {
                        let mut handle = ObjectHandle::new(format!("{t}-{i}"));
                        level.allocate(&mut handle).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(level.len(), 400);
    }
}
