//! Ordered list of cache levels.

use std::sync::Arc;

use tiercache_core::HierarchyReport;

use crate::level::CacheLevel;

/// Ordered sequence of levels, preferred (fastest) first.
///
/// The hierarchy does not keep objects from living in two levels at once;
/// that is the strategy's job.
pub trait CacheHierarchy<V>: Send + Sync {
    /// Snapshot of the levels, in order. Callers work on the snapshot for
    /// the duration of one operation.
    fn levels(&self) -> Vec<Arc<dyn CacheLevel<V>>>;

    /// Status of every level.
    fn report(&self) -> HierarchyReport {
        HierarchyReport::new(
            self.levels()
                .iter()
                .enumerate()
                .map(|(index, level)| level.report(index))
                .collect(),
        )
    }
}

/// Fixed list of levels.
pub struct LevelList<V> {
    levels: Vec<Arc<dyn CacheLevel<V>>>,
}

impl<V> LevelList<V> {
    pub fn new(levels: Vec<Arc<dyn CacheLevel<V>>>) -> Self {
        Self { levels }
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<dyn CacheLevel<V>>> {
        self.levels.get(index)
    }
}

impl<V> CacheHierarchy<V> for LevelList<V> {
    fn levels(&self) -> Vec<Arc<dyn CacheLevel<V>>> {
        self.levels.clone()
    }
}
