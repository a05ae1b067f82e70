//! Configuration types
//!
//! Plain structs validated up front. Level constructors call `validate()`
//! before building anything, so an out-of-range parameter is reported
//! immediately with the offending field named.

use crate::{CacheError, CacheResult, ConfigError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default capacity of an in-memory level, in objects.
pub const DEFAULT_MAX_OBJECTS: usize = 100;

/// Default warn threshold of an in-memory level, in percent of capacity.
pub const DEFAULT_DANGER_LOAD_PERCENT: u8 = 80;

/// Default byte budget of a filesystem level (64 MiB).
pub const DEFAULT_MAX_BYTES: u64 = 64 * 1024 * 1024;

fn invalid(field: &str, value: impl ToString, reason: &str) -> CacheError {
    CacheError::Config(ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    })
}

/// In-memory level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryLevelConfig {
    /// Diagnostic name; backends fall back to their own default.
    pub name: Option<String>,
    /// Object count above which the level is critically full.
    pub max_objects: usize,
    /// Fill percentage above which the level starts demoting objects.
    pub danger_load_percent: u8,
}

impl Default for MemoryLevelConfig {
    fn default() -> Self {
        Self {
            name: None,
            max_objects: DEFAULT_MAX_OBJECTS,
            danger_load_percent: DEFAULT_DANGER_LOAD_PERCENT,
        }
    }
}

impl MemoryLevelConfig {
    pub fn new(max_objects: usize, danger_load_percent: u8) -> Self {
        Self {
            name: None,
            max_objects,
            danger_load_percent,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Validates:
    /// - max_objects > 0
    /// - danger_load_percent in [0, 100]
    pub fn validate(&self) -> CacheResult<()> {
        if self.max_objects == 0 {
            return Err(invalid(
                "max_objects",
                self.max_objects,
                "max_objects must be greater than 0",
            ));
        }

        if self.danger_load_percent > 100 {
            return Err(invalid(
                "danger_load_percent",
                self.danger_load_percent,
                "danger_load_percent is a percentage and must be within [0, 100]",
            ));
        }

        Ok(())
    }
}

/// Filesystem level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSystemLevelConfig {
    #[serde(default)]
    pub name: Option<String>,
    /// Directory holding one file per cached object. Created if missing.
    pub directory: PathBuf,
    /// Occupied bytes at or above which the level is critically full.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
}

fn default_max_bytes() -> u64 {
    DEFAULT_MAX_BYTES
}

impl FileSystemLevelConfig {
    pub fn new(directory: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            name: None,
            directory: directory.into(),
            max_bytes,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Validates:
    /// - directory is not empty
    /// - max_bytes > 0
    pub fn validate(&self) -> CacheResult<()> {
        if self.directory.as_os_str().is_empty() {
            return Err(CacheError::Config(ConfigError::MissingRequired {
                field: "directory".to_string(),
            }));
        }

        if self.max_bytes == 0 {
            return Err(invalid(
                "max_bytes",
                self.max_bytes,
                "max_bytes must be greater than 0",
            ));
        }

        Ok(())
    }
}

/// One level of a configured hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LevelConfig {
    Memory(MemoryLevelConfig),
    FileSystem(FileSystemLevelConfig),
}

impl LevelConfig {
    pub fn validate(&self) -> CacheResult<()> {
        match self {
            LevelConfig::Memory(config) => config.validate(),
            LevelConfig::FileSystem(config) => config.validate(),
        }
    }
}

/// Ordered list of levels, fastest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyConfig {
    pub levels: Vec<LevelConfig>,
}

impl HierarchyConfig {
    pub fn new(levels: Vec<LevelConfig>) -> Self {
        Self { levels }
    }

    /// Parse a JSON document and validate it.
    pub fn from_json_str(json: &str) -> CacheResult<Self> {
        let config: HierarchyConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse {
                reason: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Validates:
    /// - at least one level
    /// - every level is valid
    pub fn validate(&self) -> CacheResult<()> {
        if self.levels.is_empty() {
            return Err(CacheError::Config(ConfigError::MissingRequired {
                field: "levels".to_string(),
            }));
        }

        for level in &self.levels {
            level.validate()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_defaults_are_valid() {
        let config = MemoryLevelConfig::default();
        assert_eq!(config.max_objects, 100);
        assert_eq!(config.danger_load_percent, 80);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_memory_rejects_zero_capacity() {
        let err = MemoryLevelConfig::new(0, 80).validate().unwrap_err();
        match err {
            CacheError::Config(ConfigError::InvalidValue { field, .. }) => {
                assert_eq!(field, "max_objects")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_memory_rejects_percent_above_hundred() {
        let err = MemoryLevelConfig::new(10, 101).validate().unwrap_err();
        assert!(err.to_string().contains("danger_load_percent"));
        assert!(MemoryLevelConfig::new(10, 100).validate().is_ok());
        assert!(MemoryLevelConfig::new(10, 0).validate().is_ok());
    }

    #[test]
    fn test_filesystem_validation() {
        assert!(FileSystemLevelConfig::new("/tmp/cache", 1024).validate().is_ok());
        assert!(FileSystemLevelConfig::new("", 1024).validate().is_err());
        assert!(FileSystemLevelConfig::new("/tmp/cache", 0).validate().is_err());
    }

    #[test]
    fn test_hierarchy_requires_levels() {
        let err = HierarchyConfig::new(vec![]).validate().unwrap_err();
        assert!(matches!(
            err,
            CacheError::Config(ConfigError::MissingRequired { .. })
        ));
    }

    #[test]
    fn test_hierarchy_from_json() {
        let json = r#"{
            "levels": [
                { "kind": "memory", "name": "hot", "max_objects": 10, "danger_load_percent": 80 },
                { "kind": "memory", "max_objects": 100 },
                { "kind": "file_system", "directory": "/var/cache/tiercache" }
            ]
        }"#;
        let config = HierarchyConfig::from_json_str(json).unwrap();
        assert_eq!(config.levels.len(), 3);
        assert_eq!(
            config.levels[0],
            LevelConfig::Memory(MemoryLevelConfig::new(10, 80).with_name("hot"))
        );
        assert_eq!(
            config.levels[1],
            LevelConfig::Memory(MemoryLevelConfig::new(100, DEFAULT_DANGER_LOAD_PERCENT))
        );
        match &config.levels[2] {
            LevelConfig::FileSystem(fs) => assert_eq!(fs.max_bytes, DEFAULT_MAX_BYTES),
            other => panic!("unexpected level: {other:?}"),
        }
    }

    #[test]
    fn test_hierarchy_from_json_rejects_invalid_level() {
        let json = r#"{ "levels": [ { "kind": "memory", "max_objects": 0 } ] }"#;
        assert!(HierarchyConfig::from_json_str(json).is_err());

        let err = HierarchyConfig::from_json_str("not json").unwrap_err();
        assert!(matches!(err, CacheError::Config(ConfigError::Parse { .. })));
    }
}
