//! Core traits and types for the caching system.

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};

/// Trait for values that can be cached.
///
/// Values are stored serialized, so anything that round-trips through
/// `serde_json` qualifies. The entity type guards against reading an entry
/// back as the wrong type.
pub trait Cacheable: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
  /// Entity type name for storage organization (e.g., "product", "product_list")
  fn entity_type() -> &'static str;
}

/// Semantic identity of a cached query.
pub trait QueryKey {
  /// Stable, fixed-length hash used as the storage key
  fn cache_hash(&self) -> String;

  /// Human-readable description for logs
  fn description(&self) -> String;
}

/// How long an entry stays fresh, and how long it survives without being used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
  /// After this, the entry is refetched on next access
  pub stale_time: Duration,
  /// After this long without access, the entry may be evicted
  pub gc_time: Duration,
}

impl CachePolicy {
  pub fn new(stale_time: Duration, gc_time: Duration) -> Self {
    Self {
      stale_time,
      gc_time,
    }
  }
}

impl Default for CachePolicy {
  fn default() -> Self {
    Self {
      stale_time: Duration::minutes(5),
      gc_time: Duration::minutes(10),
    }
  }
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was cached (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
    }
  }

  /// Create a new cache result from cached data that is still fresh.
  pub fn from_cache(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::CacheFresh,
      cached_at: Some(cached_at),
    }
  }

  /// Create a new cache result for offline mode.
  pub fn offline(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Offline,
      cached_at: Some(cached_at),
    }
  }
}

/// Indicates where cached data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Data from cache, still considered fresh
  CacheFresh,
  /// Network unavailable, serving stale cached data
  Offline,
}

impl CacheSource {
  /// Short label for view titles; network data needs none
  pub fn label(&self) -> Option<&'static str> {
    match self {
      CacheSource::Network => None,
      CacheSource::CacheFresh => Some("cached"),
      CacheSource::Offline => Some("offline"),
    }
  }
}
