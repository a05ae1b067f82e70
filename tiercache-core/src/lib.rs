//! tiercache Core - Shared Types
//!
//! Identity, handles, threshold signals, configuration, errors and status
//! reports. The behaviour that moves objects between levels lives in
//! `tiercache-storage`; this crate only describes the pieces it works with.

pub mod config;
pub mod error;
pub mod handle;
pub mod health;
pub mod signal;

pub use config::{FileSystemLevelConfig, HierarchyConfig, LevelConfig, MemoryLevelConfig};
pub use error::{CacheError, CacheResult, ConfigError, StorageError};
pub use handle::ObjectHandle;
pub use health::{HealthStatus, HierarchyReport, LevelReport, SignalReport};
pub use signal::{Severity, Signal, ThresholdSignal};

use uuid::Uuid;

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Identifier of a cached object.
///
/// UUIDv7 embeds a Unix timestamp, so ids sort by creation time.
pub type ObjectId = Uuid;

/// Generate a new UUIDv7 ObjectId.
pub fn new_object_id() -> ObjectId {
    Uuid::now_v7()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_object_id_is_unique() {
        let a = new_object_id();
        let b = new_object_id();
        assert_ne!(a, b);
        assert_eq!(a.get_version_num(), 7);
    }
}
