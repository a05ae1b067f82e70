//! Error types for tiercache operations

use crate::ObjectId;
use thiserror::Error;

/// Backend storage errors.
///
/// Raised by the stores behind a level (filesystem, codec). Levels wrap them
/// into [`CacheError`] before they reach the strategy.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Failed to store data for {id}: {reason}")]
    StoreFailed { id: ObjectId, reason: String },

    #[error("Failed to retrieve data for {id}: {reason}")]
    RetrieveFailed { id: ObjectId, reason: String },

    #[error("Failed to delete data for {id}: {reason}")]
    DeleteFailed { id: ObjectId, reason: String },

    #[error("Data not found in storage for {id}")]
    DataNotFound { id: ObjectId },

    #[error("Bad storage directory {path}: {reason}")]
    BadDirectory { path: String, reason: String },

    #[error("Serialization error: {reason}")]
    Serialization { reason: String },

    #[error("Deserialization error: {reason}")]
    Deserialization { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to parse configuration: {reason}")]
    Parse { reason: String },
}

/// Master error type for all tiercache errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    /// No level accepted the object, or the chosen level rejected the write.
    #[error("Allocation of {id} failed: {reason}")]
    AllocationFailure { id: ObjectId, reason: String },

    #[error("Object {id} not found in {level}")]
    NotFound { id: ObjectId, level: String },

    #[error("Backend failure in {level}: {source}")]
    Backend {
        level: String,
        #[source]
        source: StorageError,
    },

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl CacheError {
    /// Wrap a backend error raised inside the named level.
    pub fn backend(level: impl Into<String>, source: StorageError) -> Self {
        CacheError::Backend {
            level: level.into(),
            source,
        }
    }

    /// Whether this is a `NotFound` error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound { .. })
    }
}

/// Result type alias for tiercache operations.
pub type CacheResult<T> = Result<T, CacheError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_storage_error_display_store_failed() {
        let err = StorageError::StoreFailed {
            id: Uuid::nil(),
            reason: "disk full".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Failed to store"));
        assert!(msg.contains("00000000-0000-0000-0000-000000000000"));
        assert!(msg.contains("disk full"));
    }

    #[test]
    fn test_config_error_display_invalid_value() {
        let err = ConfigError::InvalidValue {
            field: "max_objects".to_string(),
            value: "0".to_string(),
            reason: "must be greater than 0".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("max_objects"));
        assert!(msg.contains("0"));
        assert!(msg.contains("must be greater than 0"));
    }

    #[test]
    fn test_cache_error_display_not_found() {
        let err = CacheError::NotFound {
            id: Uuid::nil(),
            level: "In-memory cache".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("not found"));
        assert!(msg.contains("In-memory cache"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_cache_error_backend_keeps_source() {
        let err = CacheError::backend("Filesystem cache", StorageError::LockPoisoned);
        let msg = format!("{}", err);
        assert!(msg.contains("Filesystem cache"));
        assert!(msg.contains("lock poisoned"));
        assert!(!err.is_not_found());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_cache_error_from_config() {
        let err = CacheError::from(ConfigError::MissingRequired {
            field: "levels".to_string(),
        });
        assert!(matches!(err, CacheError::Config(_)));
    }
}
