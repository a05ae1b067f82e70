//! Client-facing cache: a hierarchy paired with a migration strategy.

use std::fmt;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tiercache_core::{
    CacheResult, HierarchyConfig, HierarchyReport, LevelConfig, ObjectHandle, ObjectId,
};

use crate::hierarchy::{CacheHierarchy, LevelList};
use crate::level::CacheLevel;
use crate::memory::InMemoryLevel;
use crate::serialized::{FileSystemStorage, SerializedLevel};
use crate::strategy::{DemotionStrategy, MigrationStrategy};

/// Receipt for an object placed in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CachedObject(ObjectId);

impl CachedObject {
    pub fn id(&self) -> ObjectId {
        self.0
    }
}

impl fmt::Display for CachedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Multi-level object cache.
///
/// Every mutation is followed by a rebalancing pass, so after
/// `cache_object` or `release` returns the hierarchy is as healthy as the
/// strategy can make it.
///
/// # Example
///
/// ```ignore
/// let config = HierarchyConfig::from_json_str(r#"{"levels": [
///     {"kind": "memory", "max_objects": 10, "danger_load_percent": 80},
///     {"kind": "file_system", "directory": "/tmp/tiercache", "max_bytes": 1048576}
/// ]}"#)?;
/// let cache: ObjectsCache<String> = ObjectsCache::from_config(&config)?;
///
/// let receipt = cache.cache_object("hello".to_string())?;
/// assert_eq!(cache.get(&receipt)?, "hello");
/// cache.release(&receipt);
/// ```
pub struct ObjectsCache<V> {
    hierarchy: Arc<dyn CacheHierarchy<V>>,
    strategy: Arc<dyn MigrationStrategy<V>>,
}

impl<V> ObjectsCache<V> {
    pub fn new(
        hierarchy: Arc<dyn CacheHierarchy<V>>,
        strategy: Arc<dyn MigrationStrategy<V>>,
    ) -> Self {
        Self {
            hierarchy,
            strategy,
        }
    }

    /// Place an object, then rebalance.
    ///
    /// # Errors
    ///
    /// `AllocationFailure` if no level accepted the object. The hierarchy is
    /// left as it was.
    pub fn cache_object(&self, payload: V) -> CacheResult<CachedObject> {
        let mut handle = ObjectHandle::new(payload);
        self.strategy.allocate(&mut handle, self.hierarchy.as_ref())?;
        self.strategy.reallocate(self.hierarchy.as_ref());
        Ok(CachedObject(handle.id()))
    }

    /// Drop an object from every level, then rebalance. Unknown receipts are
    /// ignored.
    pub fn release(&self, object: &CachedObject) {
        self.strategy.release(object.id(), self.hierarchy.as_ref());
        self.strategy.reallocate(self.hierarchy.as_ref());
    }

    /// Read an object.
    ///
    /// # Errors
    ///
    /// `NotFound` if the object was released or never cached here.
    pub fn get(&self, object: &CachedObject) -> CacheResult<V> {
        self.strategy.retrieve(object.id(), self.hierarchy.as_ref())
    }

    pub fn status(&self) -> HierarchyReport {
        self.hierarchy.report()
    }

    pub fn hierarchy(&self) -> &Arc<dyn CacheHierarchy<V>> {
        &self.hierarchy
    }
}

impl<V> ObjectsCache<V>
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Build a cache with a [`DemotionStrategy`] over the configured levels.
    ///
    /// # Errors
    ///
    /// Config errors for an invalid configuration, backend errors for a
    /// filesystem level whose directory cannot be used.
    pub fn from_config(config: &HierarchyConfig) -> CacheResult<Self> {
        config.validate()?;

        let mut levels: Vec<Arc<dyn CacheLevel<V>>> = Vec::with_capacity(config.levels.len());
        for level in &config.levels {
            let built: Arc<dyn CacheLevel<V>> = match level {
                LevelConfig::Memory(memory) => Arc::new(InMemoryLevel::new(memory)?),
                LevelConfig::FileSystem(fs) => {
                    Arc::new(SerializedLevel::<V, FileSystemStorage>::from_config(fs)?)
                }
            };
            tracing::info!(level = %built.name(), index = levels.len(), "Cache level configured");
            levels.push(built);
        }

        Ok(Self::new(
            Arc::new(LevelList::new(levels)),
            Arc::new(DemotionStrategy::new()),
        ))
    }
}
