//! Migration strategy: placement, demotion and release across a hierarchy.
//!
//! # Placement
//!
//! New objects go to the first level without a breached critical signal.
//! The last level is never refused, so allocation only fails on an empty
//! hierarchy or when the chosen backend rejects the write.
//!
//! # Demotion
//!
//! After every mutation the cache runs [`MigrationStrategy::reallocate`].
//! Each level except the last is visited once, front to back. While a level
//! has a breached warn or critical signal, the objects it holds are moved to
//! the next level, oldest allocation first. Objects only ever move one level
//! down per visit and never move up.
//!
//! # Failures
//!
//! Demotion and release are housekeeping: backend failures are logged and
//! skipped, never returned. A demotion whose write into the next level fails
//! puts the object back where it was.

use std::sync::{Arc, Mutex, MutexGuard};

use tiercache_core::{CacheError, CacheResult, ObjectHandle, ObjectId, Severity, StorageError};

use crate::hierarchy::CacheHierarchy;
use crate::level::CacheLevel;

/// Severities that keep new objects out of a level.
const PLACEMENT_GATE: &[Severity] = &[Severity::Critical];

/// Severities that make a level shed objects to the next one.
const DEMOTION_TRIGGER: &[Severity] = &[Severity::Warn, Severity::Critical];

/// Decides where objects live within a hierarchy.
///
/// Implementations serialize their own operations; callers may share one
/// strategy between threads.
pub trait MigrationStrategy<V>: Send + Sync {
    /// Place a new object.
    ///
    /// On success the payload has been moved into a level. On failure it is
    /// left in `handle`.
    ///
    /// # Errors
    ///
    /// `AllocationFailure` if the hierarchy has no levels or the chosen level
    /// rejects the write.
    fn allocate(
        &self,
        handle: &mut ObjectHandle<V>,
        hierarchy: &dyn CacheHierarchy<V>,
    ) -> CacheResult<()>;

    /// Rebalance the hierarchy by demoting objects out of unhealthy levels.
    fn reallocate(&self, hierarchy: &dyn CacheHierarchy<V>);

    /// Remove an object from every level holding it. Unknown ids are ignored.
    fn release(&self, id: ObjectId, hierarchy: &dyn CacheHierarchy<V>);

    /// Rebalance, then read the object from the first level holding it.
    ///
    /// # Errors
    ///
    /// `NotFound` if no level holds the id.
    fn retrieve(&self, id: ObjectId, hierarchy: &dyn CacheHierarchy<V>) -> CacheResult<V>;
}

/// First-fit placement with oldest-first, one-level-at-a-time demotion.
///
/// Keeps the ids it placed in allocation order; that order drives the
/// demotion scan. Ids are dropped from the list once released.
#[derive(Debug, Default)]
pub struct DemotionStrategy {
    tracked: Mutex<Vec<ObjectId>>,
}

impl DemotionStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids currently tracked, oldest allocation first.
    pub fn tracked_ids(&self) -> Vec<ObjectId> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ObjectId>> {
        self.tracked.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Strategy lock poisoned, continuing with tracked ids as they are");
            poisoned.into_inner()
        })
    }

    /// Demotion pass. Caller holds the lock.
    fn reallocate_locked<V>(&self, tracked: &[ObjectId], levels: &[Arc<dyn CacheLevel<V>>]) {
        for (index, pair) in levels.windows(2).enumerate() {
            let (level, next) = (&pair[0], &pair[1]);
            if level.breached(DEMOTION_TRIGGER) == 0 {
                continue;
            }

            let mut demoted = 0usize;
            for &id in tracked {
                if level.breached(DEMOTION_TRIGGER) == 0 {
                    break;
                }
                if !level.contains(id) {
                    continue;
                }
                if demote(id, level.as_ref(), next.as_ref()) {
                    demoted += 1;
                }
            }

            tracing::debug!(
                level = %level.name(),
                index,
                next = %next.name(),
                demoted,
                healthy = level.breached(DEMOTION_TRIGGER) == 0,
                "Demotion pass over level finished"
            );
        }
    }
}

/// Move one object from `from` to `to`.
///
/// Returns whether the object now lives in `to`. If the write into `to`
/// fails the object is written back into `from`.
fn demote<V>(id: ObjectId, from: &dyn CacheLevel<V>, to: &dyn CacheLevel<V>) -> bool {
    let mut handle = match from.free(id) {
        Ok(handle) => handle,
        Err(e) => {
            tracing::warn!(error = %e, object_id = %id, level = %from.name(), "Failed to free object for demotion");
            return false;
        }
    };

    match to.allocate(&mut handle) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                error = %e,
                object_id = %id,
                from = %from.name(),
                to = %to.name(),
                "Demotion failed, restoring object"
            );
            if let Err(restore) = from.allocate(&mut handle) {
                tracing::error!(
                    error = %restore,
                    object_id = %id,
                    level = %from.name(),
                    "Object lost: could not restore after failed demotion"
                );
            }
            false
        }
    }
}

impl<V> MigrationStrategy<V> for DemotionStrategy {
    fn allocate(
        &self,
        handle: &mut ObjectHandle<V>,
        hierarchy: &dyn CacheHierarchy<V>,
    ) -> CacheResult<()> {
        let mut tracked = self.lock();
        let levels = hierarchy.levels();
        let id = handle.id();

        for (index, level) in levels.iter().enumerate() {
            let is_last = index + 1 == levels.len();
            let critical = level.breached(PLACEMENT_GATE);
            if critical > 0 && !is_last {
                continue;
            }

            level.allocate(handle)?;
            if !tracked.contains(&id) {
                tracked.push(id);
            }

            tracing::debug!(
                object_id = %id,
                level = %level.name(),
                index,
                last_resort = critical > 0,
                "Object allocated"
            );
            return Ok(());
        }

        Err(CacheError::AllocationFailure {
            id,
            reason: "cache hierarchy has no levels".to_string(),
        })
    }

    fn reallocate(&self, hierarchy: &dyn CacheHierarchy<V>) {
        let tracked = self.lock();
        let levels = hierarchy.levels();
        self.reallocate_locked(&tracked, &levels);
    }

    fn release(&self, id: ObjectId, hierarchy: &dyn CacheHierarchy<V>) {
        let mut tracked = self.lock();
        let levels = hierarchy.levels();

        for level in levels.iter().filter(|level| level.contains(id)) {
            if let Err(e) = level.free(id) {
                tracing::warn!(error = %e, object_id = %id, level = %level.name(), "Failed to release object");
            }
        }

        // Keep tracking anything a failed free left behind.
        if !levels.iter().any(|level| level.contains(id)) {
            tracked.retain(|tracked_id| *tracked_id != id);
        }
    }

    fn retrieve(&self, id: ObjectId, hierarchy: &dyn CacheHierarchy<V>) -> CacheResult<V> {
        let tracked = self.lock();
        let levels = hierarchy.levels();
        self.reallocate_locked(&tracked, &levels);

        let level = levels
            .iter()
            .find(|level| level.contains(id))
            .ok_or_else(|| CacheError::NotFound {
                id,
                level: "cache hierarchy".to_string(),
            })?;

        level
            .retrieve(id)?
            .into_payload()
            .ok_or_else(|| CacheError::backend(level.name(), StorageError::DataNotFound { id }))
    }
}

// =============================================================================
// TESTS
// =============================================================================
