//! tiercache Storage - Levels, Backends and Migration
//!
//! A cache is an ordered list of levels, fastest first. Each level reports
//! its own health through threshold signals; the migration strategy reads
//! those signals to decide where new objects go and which objects get pushed
//! one level down.
//!
//! # Example
//!
//! ```ignore
//! let hot = InMemoryLevel::new(&MemoryLevelConfig::new(10, 80))?;
//! let cold = SerializedLevel::from_config(&FileSystemLevelConfig::new("/tmp/cold", 1 << 20))?;
//! let cache = ObjectsCache::new(
//!     Arc::new(LevelList::new(vec![Arc::new(hot), Arc::new(cold)])),
//!     Arc::new(DemotionStrategy::new()),
//! );
//!
//! let receipt = cache.cache_object(document)?;
//! let copy = cache.get(&receipt)?;
//! println!("{}", cache.status().render());
//! ```

pub mod facade;
pub mod hierarchy;
pub mod level;
pub mod memory;
pub mod serialized;
pub mod strategy;

pub use facade::{CachedObject, ObjectsCache};
pub use hierarchy::{CacheHierarchy, LevelList};
pub use level::CacheLevel;
pub use memory::InMemoryLevel;
pub use serialized::{FileSystemStorage, SerializableStorage, SerializedLevel};
pub use strategy::{DemotionStrategy, MigrationStrategy};
