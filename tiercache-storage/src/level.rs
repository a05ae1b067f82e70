//! Cache level contract.
//!
//! Every backend (in-memory map, serialized store, ...) is a level. The
//! strategy only talks to levels through this trait and only looks at their
//! signals, never at their raw storage.

use std::sync::Arc;

use tiercache_core::{CacheResult, LevelReport, ObjectHandle, ObjectId, Severity, Signal, SignalReport};

/// One tier of the cache hierarchy.
///
/// # Contract
///
/// - `contains(id)` is true exactly when the level holds an entry for `id`.
/// - A failed `allocate` leaves the level unchanged and leaves the payload in
///   the handle.
/// - A failed `free` leaves the object in the level.
/// - Signals are advisory. A level accepts writes even when all of its
///   signals are breached.
/// - Every operation is safe to call concurrently from several threads.
pub trait CacheLevel<V>: Send + Sync {
    /// Store the handle's payload under its id.
    ///
    /// On success the payload has been taken out of the handle.
    ///
    /// # Errors
    ///
    /// `AllocationFailure` if the handle carries no payload or the backend
    /// rejects the write.
    fn allocate(&self, handle: &mut ObjectHandle<V>) -> CacheResult<()>;

    /// Remove an object and return it.
    ///
    /// # Errors
    ///
    /// `NotFound` if the id is absent, `Backend` if the backend fails.
    fn free(&self, id: ObjectId) -> CacheResult<ObjectHandle<V>>;

    /// Return an object without removing it.
    ///
    /// # Errors
    ///
    /// `NotFound` if the id is absent, `Backend` if the backend fails.
    fn retrieve(&self, id: ObjectId) -> CacheResult<ObjectHandle<V>>;

    fn contains(&self, id: ObjectId) -> bool;

    /// Diagnostic label.
    fn name(&self) -> String {
        format!("unnamed level #{:p}", self)
    }

    /// Current signals of this level.
    fn signals(&self) -> Vec<Arc<dyn Signal>>;

    /// Number of breached signals whose severity is in `severities`.
    fn breached(&self, severities: &[Severity]) -> usize {
        self.signals()
            .iter()
            .filter(|signal| severities.contains(&signal.severity()))
            .filter(|signal| !signal.is_responding())
            .count()
    }

    /// Snapshot of this level's signals at position `index`.
    fn report(&self, index: usize) -> LevelReport {
        let signals = self
            .signals()
            .iter()
            .map(|signal| SignalReport::from_signal(signal.as_ref()))
            .collect();
        LevelReport::new(self.name(), index, signals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiercache_core::{CacheError, HealthStatus, ThresholdSignal};

    /// A level with fixed signals and no storage.
    struct SignalOnlyLevel {
        signals: Vec<Arc<ThresholdSignal<usize>>>,
    }

    impl CacheLevel<u32> for SignalOnlyLevel {
        fn allocate(&self, handle: &mut ObjectHandle<u32>) -> CacheResult<()> {
            Err(CacheError::AllocationFailure {
                id: handle.id(),
                reason: "no storage".to_string(),
            })
        }

        fn free(&self, id: ObjectId) -> CacheResult<ObjectHandle<u32>> {
            Err(CacheError::NotFound {
                id,
                level: self.name(),
            })
        }

        fn retrieve(&self, id: ObjectId) -> CacheResult<ObjectHandle<u32>> {
            self.free(id)
        }

        fn contains(&self, _id: ObjectId) -> bool {
            false
        }

        fn signals(&self) -> Vec<Arc<dyn Signal>> {
            self.signals
                .iter()
                .map(|s| s.clone() as Arc<dyn Signal>)
                .collect()
        }
    }

    fn level() -> SignalOnlyLevel {
        let critical = Arc::new(ThresholdSignal::max_count("count", 1, Severity::Critical));
        let warn = Arc::new(ThresholdSignal::max_count("warn", 1, Severity::Warn));
        let info = Arc::new(ThresholdSignal::max_count("info", 1, Severity::Info));
        SignalOnlyLevel {
            signals: vec![critical, warn, info],
        }
    }

    #[test]
    fn test_breached_counts_only_requested_severities() {
        let level = level();
        // Unmeasured signals are breached.
        assert_eq!(level.breached(&[Severity::Critical]), 1);
        assert_eq!(level.breached(&[Severity::Warn, Severity::Critical]), 2);
        assert_eq!(level.breached(&[]), 0);

        for signal in &level.signals {
            signal.set_current(0);
        }
        assert_eq!(
            level.breached(&[Severity::Info, Severity::Warn, Severity::Critical]),
            0
        );

        level.signals[1].set_current(2);
        assert_eq!(level.breached(&[Severity::Critical]), 0);
        assert_eq!(level.breached(&[Severity::Warn, Severity::Critical]), 1);
    }

    #[test]
    fn test_default_name_and_report() {
        let level = level();
        assert!(level.name().starts_with("unnamed level #"));

        for signal in &level.signals {
            signal.set_current(0);
        }
        let report = level.report(3);
        assert_eq!(report.index, 3);
        assert_eq!(report.signals.len(), 3);
        assert_eq!(report.status, HealthStatus::Healthy);
    }
}
