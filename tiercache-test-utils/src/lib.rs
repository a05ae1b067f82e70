//! tiercache Test Utilities
//!
//! Shared test infrastructure for the tiercache workspace:
//! - A fault-injecting byte store
//! - Proptest generators for configs, payloads and operation sequences
//! - Fixtures for common hierarchies
//! - Assertions for cache-specific invariants
//! - One-shot tracing setup for tests

// Re-export core types for convenience
pub use tiercache_core::{
    new_object_id, CacheError, CacheResult, ConfigError, FileSystemLevelConfig, HealthStatus,
    HierarchyConfig, HierarchyReport, LevelConfig, MemoryLevelConfig, ObjectHandle, ObjectId,
    Severity, Signal, StorageError, ThresholdSignal,
};
pub use tiercache_storage::{
    CacheHierarchy, CacheLevel, CachedObject, DemotionStrategy, InMemoryLevel, LevelList,
    MigrationStrategy, ObjectsCache, SerializableStorage, SerializedLevel,
};

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Once};

use serde::{Deserialize, Serialize};

// ============================================================================
// FAULT INJECTION
// ============================================================================

/// In-memory [`SerializableStorage`] whose operations can be made to fail.
///
/// Each toggle affects only its own operation. Failures leave the stored
/// bytes untouched.
#[derive(Debug, Default)]
pub struct FlakyStorage {
    data: Mutex<HashMap<ObjectId, Vec<u8>>>,
    fail_store: AtomicBool,
    fail_retrieve: AtomicBool,
    fail_delete: AtomicBool,
}

impl FlakyStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_store(&self, fail: bool) {
        self.fail_store.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_retrieve(&self, fail: bool) {
        self.fail_retrieve.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    /// Number of entries currently stored.
    pub fn entries(&self) -> usize {
        self.data.lock().map(|d| d.len()).unwrap_or(0)
    }

    fn poisoned() -> StorageError {
        StorageError::LockPoisoned
    }
}

impl SerializableStorage for FlakyStorage {
    fn store(&self, id: ObjectId, bytes: &[u8]) -> Result<(), StorageError> {
        if self.fail_store.load(Ordering::SeqCst) {
            return Err(StorageError::StoreFailed {
                id,
                reason: "injected store failure".to_string(),
            });
        }
        let mut data = self.data.lock().map_err(|_| Self::poisoned())?;
        data.insert(id, bytes.to_vec());
        Ok(())
    }

    fn retrieve(&self, id: ObjectId) -> Result<Vec<u8>, StorageError> {
        if self.fail_retrieve.load(Ordering::SeqCst) {
            return Err(StorageError::RetrieveFailed {
                id,
                reason: "injected retrieve failure".to_string(),
            });
        }
        let data = self.data.lock().map_err(|_| Self::poisoned())?;
        data.get(&id)
            .cloned()
            .ok_or(StorageError::DataNotFound { id })
    }

    fn delete(&self, id: ObjectId) -> Result<(), StorageError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StorageError::DeleteFailed {
                id,
                reason: "injected delete failure".to_string(),
            });
        }
        let mut data = self.data.lock().map_err(|_| Self::poisoned())?;
        data.remove(&id)
            .map(|_| ())
            .ok_or(StorageError::DataNotFound { id })
    }

    fn occupied_size(&self) -> u64 {
        self.data
            .lock()
            .map(|d| d.values().map(|bytes| bytes.len() as u64).sum())
            .unwrap_or(0)
    }
}

// ============================================================================
// TRACING
// ============================================================================

static TRACING: Once = Once::new();

/// Install a test subscriber once per process.
///
/// Filtered by `RUST_LOG`; output goes through the test harness so it only
/// shows for failing tests.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for tiercache types.

    use super::*;
    use proptest::prelude::*;

    /// Generate a fresh UUIDv7 object id.
    pub fn arb_object_id() -> impl Strategy<Value = ObjectId> {
        Just(()).prop_map(|_| new_object_id())
    }

    pub fn arb_severity() -> impl Strategy<Value = Severity> {
        prop_oneof![
            Just(Severity::Info),
            Just(Severity::Warn),
            Just(Severity::Critical),
        ]
    }

    /// Valid in-memory level configuration.
    pub fn arb_memory_config() -> impl Strategy<Value = MemoryLevelConfig> {
        (1usize..64, 0u8..=100).prop_map(|(max, danger)| MemoryLevelConfig::new(max, danger))
    }

    /// Valid hierarchy of one to four in-memory levels.
    pub fn arb_memory_hierarchy_config() -> impl Strategy<Value = HierarchyConfig> {
        prop::collection::vec(arb_memory_config().prop_map(LevelConfig::Memory), 1..=4)
            .prop_map(HierarchyConfig::new)
    }

    pub fn arb_document() -> impl Strategy<Value = Document> {
        ("[a-z]{1,12}", "[a-zA-Z0-9 ]{0,64}", any::<u32>()).prop_map(|(title, body, revision)| {
            Document {
                title,
                body,
                revision,
            }
        })
    }

    /// One client operation against a cache.
    ///
    /// `Release` and `Get` pick a previously returned receipt by index,
    /// modulo the number of receipts so far.
    #[derive(Debug, Clone)]
    pub enum CacheOp {
        Cache(u32),
        Release(usize),
        Get(usize),
    }

    pub fn arb_cache_op() -> impl Strategy<Value = CacheOp> {
        prop_oneof![
            3 => any::<u32>().prop_map(CacheOp::Cache),
            1 => any::<usize>().prop_map(CacheOp::Release),
            1 => any::<usize>().prop_map(CacheOp::Get),
        ]
    }

    pub fn arb_cache_ops(max_len: usize) -> impl Strategy<Value = Vec<CacheOp>> {
        prop::collection::vec(arb_cache_op(), 0..=max_len)
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

/// Serializable payload used across tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub body: String,
    pub revision: u32,
}

pub mod fixtures {
    //! Pre-built levels and hierarchies.

    use super::*;

    pub fn document(title: &str) -> Document {
        Document {
            title: title.to_string(),
            body: format!("body of {title}"),
            revision: 1,
        }
    }

    /// In-memory level holding at most `max_objects`, warning above
    /// `danger_load_percent`.
    ///
    /// # Panics
    ///
    /// Panics if the configuration does not validate.
    pub fn memory_level<V>(max_objects: usize, danger_load_percent: u8) -> Arc<InMemoryLevel<V>> {
        Arc::new(
            InMemoryLevel::new(&MemoryLevelConfig::new(max_objects, danger_load_percent))
                .expect("valid memory level config"),
        )
    }

    /// Serialized level over a [`FlakyStorage`].
    ///
    /// # Panics
    ///
    /// Panics if `max_bytes` is zero.
    pub fn flaky_level<V>(max_bytes: u64) -> Arc<SerializedLevel<V, FlakyStorage>> {
        Arc::new(
            SerializedLevel::new(FlakyStorage::new(), max_bytes, Some("flaky".to_string()))
                .expect("non-zero byte budget"),
        )
    }

    /// Hierarchy over the given levels, in order.
    pub fn hierarchy<V>(levels: Vec<Arc<dyn CacheLevel<V>>>) -> Arc<LevelList<V>> {
        Arc::new(LevelList::new(levels))
    }

    /// Cache over the given levels with a fresh [`DemotionStrategy`].
    pub fn demotion_cache<V: 'static>(levels: Vec<Arc<dyn CacheLevel<V>>>) -> ObjectsCache<V> {
        ObjectsCache::new(hierarchy(levels), Arc::new(DemotionStrategy::new()))
    }

    /// Memory level (max 10, warn above 80%) followed by an effectively
    /// unbounded memory level.
    pub fn two_level_cache<V>() -> (Arc<InMemoryLevel<V>>, Arc<InMemoryLevel<V>>, ObjectsCache<V>)
    where
        V: Clone + Send + Sync + 'static,
    {
        let hot = memory_level::<V>(10, 80);
        let cold = memory_level::<V>(1_000_000, 100);
        let cache = demotion_cache(vec![
            hot.clone() as Arc<dyn CacheLevel<V>>,
            cold.clone() as Arc<dyn CacheLevel<V>>,
        ]);
        (hot, cold, cache)
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for cache invariants.

    use super::*;

    /// Assert that a CacheResult is a NotFound error.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &CacheResult<T>) {
        match result {
            Err(CacheError::NotFound { .. }) => {}
            other => panic!("Expected NotFound error, got: {:?}", other),
        }
    }

    /// Assert that a CacheResult is an AllocationFailure.
    #[track_caller]
    pub fn assert_allocation_failure<T: std::fmt::Debug>(result: &CacheResult<T>) {
        match result {
            Err(CacheError::AllocationFailure { .. }) => {}
            other => panic!("Expected AllocationFailure, got: {:?}", other),
        }
    }

    /// Assert that a CacheResult is a Config error.
    #[track_caller]
    pub fn assert_config_error<T: std::fmt::Debug>(result: &CacheResult<T>) {
        match result {
            Err(CacheError::Config(_)) => {}
            other => panic!("Expected Config error, got: {:?}", other),
        }
    }

    /// Assert that every id lives in exactly one level.
    #[track_caller]
    pub fn assert_single_residency<V>(levels: &[Arc<dyn CacheLevel<V>>], ids: &[ObjectId]) {
        for id in ids {
            let holders: Vec<String> = levels
                .iter()
                .filter(|level| level.contains(*id))
                .map(|level| level.name())
                .collect();
            assert_eq!(
                holders.len(),
                1,
                "Object {} should live in exactly one level, found in {:?}",
                id,
                holders
            );
        }
    }

    /// Assert that no level holds `id`.
    #[track_caller]
    pub fn assert_absent<V>(levels: &[Arc<dyn CacheLevel<V>>], id: ObjectId) {
        for level in levels {
            assert!(
                !level.contains(id),
                "Object {} should be gone, still in {}",
                id,
                level.name()
            );
        }
    }

    /// Assert that no level except the last has a breached warn or critical
    /// signal.
    #[track_caller]
    pub fn assert_settled<V>(levels: &[Arc<dyn CacheLevel<V>>]) {
        let Some((_, upper)) = levels.split_last() else {
            return;
        };
        for level in upper {
            assert_eq!(
                level.breached(&[Severity::Warn, Severity::Critical]),
                0,
                "Level {} should be healthy after rebalancing",
                level.name()
            );
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_flaky_storage_round_trip() {
        let storage = FlakyStorage::new();
        let id = new_object_id();

        storage.store(id, b"abc").unwrap();
        assert_eq!(storage.retrieve(id).unwrap(), b"abc");
        assert_eq!(storage.occupied_size(), 3);
        assert_eq!(storage.entries(), 1);

        storage.delete(id).unwrap();
        assert_eq!(storage.occupied_size(), 0);
        assert_eq!(
            storage.delete(id).unwrap_err(),
            StorageError::DataNotFound { id }
        );
    }

    #[test]
    fn test_flaky_storage_toggles() {
        let storage = FlakyStorage::new();
        let id = new_object_id();
        storage.store(id, b"abc").unwrap();

        storage.set_fail_store(true);
        assert!(matches!(
            storage.store(new_object_id(), b"x"),
            Err(StorageError::StoreFailed { .. })
        ));
        assert_eq!(storage.entries(), 1);

        storage.set_fail_retrieve(true);
        assert!(matches!(
            storage.retrieve(id),
            Err(StorageError::RetrieveFailed { .. })
        ));

        storage.set_fail_delete(true);
        assert!(matches!(
            storage.delete(id),
            Err(StorageError::DeleteFailed { .. })
        ));
        assert_eq!(storage.entries(), 1);
    }

    #[test]
    fn test_two_level_cache_fixture() {
        let (hot, cold, cache) = fixtures::two_level_cache::<u32>();
        let receipts: Vec<CachedObject> = (0..11).map(|i| cache.cache_object(i).unwrap()).collect();

        assert_eq!(hot.len(), 8);
        assert_eq!(cold.len(), 3);

        let levels = cache.hierarchy().levels();
        let ids: Vec<ObjectId> = receipts.iter().map(CachedObject::id).collect();
        assertions::assert_single_residency(&levels, &ids);
        assertions::assert_settled(&levels);
    }

    #[test]
    fn test_flaky_level_fixture() {
        let level = fixtures::flaky_level::<Document>(1024);
        let mut handle = ObjectHandle::new(fixtures::document("a"));
        level.allocate(&mut handle).unwrap();
        assert_eq!(level.storage().entries(), 1);
        assert_eq!(level.name(), "flaky");
    }

    #[test]
    fn test_assertion_helpers() {
        let not_found: CacheResult<()> = Err(CacheError::NotFound {
            id: new_object_id(),
            level: "l".to_string(),
        });
        assertions::assert_not_found(&not_found);

        let config: CacheResult<()> = Err(CacheError::Config(ConfigError::MissingRequired {
            field: "levels".to_string(),
        }));
        assertions::assert_config_error(&config);
    }

    #[test]
    fn test_init_test_tracing_is_idempotent() {
        init_test_tracing();
        init_test_tracing();
        tracing::debug!("tracing initialized twice without panicking");
    }

    proptest! {
        #[test]
        fn prop_generated_configs_validate(config in generators::arb_memory_hierarchy_config()) {
            prop_assert!(config.validate().is_ok());
        }

        #[test]
        fn prop_generated_documents_encode(document in generators::arb_document()) {
            let json = serde_json::to_string(&document).unwrap();
            let back: Document = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(back, document);
        }
    }
}
