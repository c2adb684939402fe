//! Generic caching layer for query results.
//!
//! This module provides a catalog-agnostic cache that:
//! - Stores serialized query results keyed by semantic query identity
//! - Tracks a staleness window and a garbage-collection window per entry
//! - Supports direct get/set/patch/invalidate for optimistic updates
//! - Never collects an entry while a view observes it
//! - Provides basic offline mode (serve stale cache when network unavailable)

mod layer;
mod storage;
mod traits;

pub use layer::{CacheLayer, CacheObserver};
pub use storage::MemoryStorage;
pub use traits::{CachePolicy, CacheResult, CacheSource, Cacheable, QueryKey};
