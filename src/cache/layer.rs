//! Cache layer that orchestrates caching logic with network fetching.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

use super::storage::{CacheEntry, CacheStorage};
use super::traits::{CachePolicy, CacheResult, Cacheable, QueryKey};

/// A value read back from the cache
#[derive(Debug, Clone)]
pub struct Cached<T> {
  pub data: T,
  pub cached_at: DateTime<Utc>,
  pub is_stale: bool,
}

type ObserverCounts = Arc<Mutex<HashMap<String, usize>>>;

fn counts(observers: &ObserverCounts) -> MutexGuard<'_, HashMap<String, usize>> {
  // Plain counters; a poisoning panic cannot leave them half-written
  observers.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Keeps one entry out of garbage collection for as long as it is alive.
///
/// Views showing cached data hold one; the gc window only applies to entries
/// nobody is looking at.
#[derive(Debug)]
pub struct CacheObserver {
  key: String,
  observers: ObserverCounts,
}

impl Drop for CacheObserver {
  fn drop(&mut self) {
    let mut map = counts(&self.observers);
    if let Some(count) = map.get_mut(&self.key) {
      *count -= 1;
      if *count == 0 {
        map.remove(&self.key);
      }
    }
  }
}

/// Cache service shared by everything that reads or patches query results.
///
/// Cloning is cheap and every clone sees the same storage. Each write bumps a
/// generation counter so views can tell when to re-read.
pub struct CacheLayer<S: CacheStorage> {
  storage: Arc<S>,
  generation: Arc<AtomicU64>,
  observers: ObserverCounts,
}

impl<S: CacheStorage> CacheLayer<S> {
  /// Create a new cache layer with the given storage backend.
  pub fn new(storage: S) -> Self {
    Self {
      storage: Arc::new(storage),
      generation: Arc::new(AtomicU64::new(0)),
      observers: Arc::default(),
    }
  }

  /// Pin `key` against garbage collection until the returned guard drops.
  pub fn observe(&self, key: &impl QueryKey) -> CacheObserver {
    let hash = key.cache_hash();
    *counts(&self.observers).entry(hash.clone()).or_insert(0) += 1;
    debug!(key = %key.description(), "cache entry observed");
    CacheObserver {
      key: hash,
      observers: Arc::clone(&self.observers),
    }
  }

  /// Counter bumped on every write, patch, invalidation and eviction
  pub fn generation(&self) -> u64 {
    self.generation.load(Ordering::Acquire)
  }

  fn bump(&self) {
    self.generation.fetch_add(1, Ordering::AcqRel);
  }

  /// Read a value, marking it as used.
  pub fn get<T: Cacheable>(&self, key: &impl QueryKey) -> Result<Option<Cached<T>>> {
    self.get_at(key, Utc::now())
  }

  pub fn get_at<T: Cacheable>(
    &self,
    key: &impl QueryKey,
    now: DateTime<Utc>,
  ) -> Result<Option<Cached<T>>> {
    let entry = match self.storage.get(&key.cache_hash(), now)? {
      Some(entry) => entry,
      None => return Ok(None),
    };

    if entry.entity_type != T::entity_type() {
      warn!(
        key = %key.description(),
        stored = entry.entity_type,
        requested = T::entity_type(),
        "cache entry type mismatch"
      );
      return Ok(None);
    }

    let is_stale = entry.is_stale(now);
    let data: T = serde_json::from_value(entry.data)
      .map_err(|e| eyre!("Failed to deserialize {}: {}", key.description(), e))?;

    Ok(Some(Cached {
      data,
      cached_at: entry.cached_at,
      is_stale,
    }))
  }

  /// Store a value under `key`, replacing any previous entry.
  pub fn set<T: Cacheable>(&self, key: &impl QueryKey, value: &T, policy: CachePolicy) -> Result<()> {
    self.set_at(key, value, policy, Utc::now())
  }

  pub fn set_at<T: Cacheable>(
    &self,
    key: &impl QueryKey,
    value: &T,
    policy: CachePolicy,
    now: DateTime<Utc>,
  ) -> Result<()> {
    let data = serde_json::to_value(value)
      .map_err(|e| eyre!("Failed to serialize {}: {}", key.description(), e))?;
    self.storage.put(
      &key.cache_hash(),
      CacheEntry::new(T::entity_type(), data, policy, now),
    )?;
    self.bump();
    debug!(key = %key.description(), "cache set");
    Ok(())
  }

  /// Modify a cached value in place.
  ///
  /// Returns `Ok(None)` and leaves the cache untouched when nothing is cached
  /// under `key`. The entry keeps its policy; its timestamps move to now.
  pub fn patch<T, R, F>(&self, key: &impl QueryKey, f: F) -> Result<Option<R>>
  where
    T: Cacheable,
    F: FnOnce(&mut T) -> R,
  {
    let now = Utc::now();
    let mut outcome = None;

    let found = self.storage.update(&key.cache_hash(), |entry| {
      if entry.entity_type != T::entity_type() {
        return Err(eyre!(
          "Cannot patch {} as {}: stored as {}",
          key.description(),
          T::entity_type(),
          entry.entity_type
        ));
      }

      let mut value: T = serde_json::from_value(entry.data.clone())
        .map_err(|e| eyre!("Failed to deserialize {}: {}", key.description(), e))?;
      let result = f(&mut value);
      entry.data = serde_json::to_value(&value)
        .map_err(|e| eyre!("Failed to serialize {}: {}", key.description(), e))?;
      entry.cached_at = now;
      entry.last_used = now;
      outcome = Some(result);
      Ok(())
    })?;

    if found {
      self.bump();
      debug!(key = %key.description(), "cache patched");
    }

    Ok(outcome)
  }

  /// Remove the entry for `key`, returning whether one existed.
  pub fn invalidate(&self, key: &impl QueryKey) -> Result<bool> {
    let removed = self.storage.remove(&key.cache_hash())?;
    if removed {
      self.bump();
      debug!(key = %key.description(), "cache invalidated");
    }
    Ok(removed)
  }

  /// Evict unobserved entries whose gc window has passed. Returns how many
  /// were dropped.
  pub fn collect_garbage(&self) -> Result<usize> {
    self.collect_garbage_at(Utc::now())
  }

  pub fn collect_garbage_at(&self, now: DateTime<Utc>) -> Result<usize> {
    let observed: HashSet<String> = counts(&self.observers).keys().cloned().collect();
    let evicted = self.storage.evict_expired(now, &observed)?;
    if !evicted.is_empty() {
      self.bump();
      debug!(count = evicted.len(), "cache entries evicted");
    }
    Ok(evicted.len())
  }

  /// Read-through fetch.
  ///
  /// 1. Fresh cache entry - return it
  /// 2. Stale or missing - fetch from network and store
  /// 3. Network failure with a stale entry - serve the stale entry (offline)
  pub async fn fetch<T, F, Fut>(
    &self,
    key: &impl QueryKey,
    policy: CachePolicy,
    fetcher: F,
  ) -> Result<CacheResult<T>>
  where
    T: Cacheable,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    let cached = self.get::<T>(key)?;

    if let Some(cached) = &cached {
      if !cached.is_stale {
        debug!(key = %key.description(), "cache hit");
        return Ok(CacheResult::from_cache(cached.data.clone(), cached.cached_at));
      }
    }

    debug!(key = %key.description(), stale = cached.is_some(), "cache miss");
    match fetcher().await {
      Ok(data) => {
        self.set(key, &data, policy)?;
        Ok(CacheResult::from_network(data))
      }
      Err(e) => match cached {
        Some(cached) => {
          warn!(key = %key.description(), error = %e, "serving stale cache");
          Ok(CacheResult::offline(cached.data, cached.cached_at))
        }
        None => Err(e),
      },
    }
  }
}

impl<S: CacheStorage> Clone for CacheLayer<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      generation: Arc::clone(&self.generation),
      observers: Arc::clone(&self.observers),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::storage::MemoryStorage;
  use crate::cache::traits::CacheSource;
  use chrono::Duration;
  use serde::{Deserialize, Serialize};

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct Counter {
    value: u32,
  }

  impl Cacheable for Counter {
    fn entity_type() -> &'static str {
      "counter"
    }
  }

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct Label(String);

  impl Cacheable for Label {
    fn entity_type() -> &'static str {
      "label"
    }
  }

  struct Key(&'static str);

  impl QueryKey for Key {
    fn cache_hash(&self) -> String {
      self.0.to_string()
    }

    fn description(&self) -> String {
      self.0.to_string()
    }
  }

  fn layer() -> CacheLayer<MemoryStorage> {
    CacheLayer::new(MemoryStorage::new())
  }

  #[test]
  fn test_set_then_get() {
    let cache = layer();
    cache
      .set(&Key("a"), &Counter { value: 3 }, CachePolicy::default())
      .unwrap();
    let got = cache.get::<Counter>(&Key("a")).unwrap().unwrap();
    assert_eq!(got.data, Counter { value: 3 });
    assert!(!got.is_stale);
  }

  #[test]
  fn test_get_with_wrong_type_misses() {
    let cache = layer();
    cache
      .set(&Key("a"), &Counter { value: 3 }, CachePolicy::default())
      .unwrap();
    assert!(cache.get::<Label>(&Key("a")).unwrap().is_none());
  }

  #[test]
  fn test_patch_missing_is_noop() {
    let cache = layer();
    let before = cache.generation();
    let outcome = cache
      .patch(&Key("a"), |c: &mut Counter| c.value += 1)
      .unwrap();
    assert!(outcome.is_none());
    assert_eq!(cache.generation(), before);
    assert!(cache.get::<Counter>(&Key("a")).unwrap().is_none());
  }

  #[test]
  fn test_patch_modifies_in_place() {
    let cache = layer();
    cache
      .set(&Key("a"), &Counter { value: 1 }, CachePolicy::default())
      .unwrap();
    let before = cache.generation();

    let outcome = cache
      .patch(&Key("a"), |c: &mut Counter| {
        c.value += 1;
        c.value
      })
      .unwrap();

    assert_eq!(outcome, Some(2));
    assert!(cache.generation() > before);
    assert_eq!(cache.get::<Counter>(&Key("a")).unwrap().unwrap().data.value, 2);
  }

  #[test]
  fn test_patch_with_wrong_type_errors() {
    let cache = layer();
    cache
      .set(&Key("a"), &Counter { value: 1 }, CachePolicy::default())
      .unwrap();
    let result = cache.patch(&Key("a"), |l: &mut Label| l.0.push('x'));
    assert!(result.is_err());
  }

  #[test]
  fn test_invalidate() {
    let cache = layer();
    cache
      .set(&Key("a"), &Counter { value: 1 }, CachePolicy::default())
      .unwrap();
    assert!(cache.invalidate(&Key("a")).unwrap());
    assert!(!cache.invalidate(&Key("a")).unwrap());
    assert!(cache.get::<Counter>(&Key("a")).unwrap().is_none());
  }

  #[test]
  fn test_get_reports_staleness() {
    let cache = layer();
    let t0 = Utc::now();
    let policy = CachePolicy::new(Duration::minutes(30), Duration::minutes(60));
    cache
      .set_at(&Key("a"), &Counter { value: 1 }, policy, t0)
      .unwrap();

    let fresh = cache
      .get_at::<Counter>(&Key("a"), t0 + Duration::minutes(29))
      .unwrap()
      .unwrap();
    assert!(!fresh.is_stale);

    let stale = cache
      .get_at::<Counter>(&Key("a"), t0 + Duration::minutes(31))
      .unwrap()
      .unwrap();
    assert!(stale.is_stale);
  }

  #[test]
  fn test_collect_garbage_drops_unused_entries() {
    let cache = layer();
    let t0 = Utc::now();
    let policy = CachePolicy::new(Duration::minutes(30), Duration::minutes(60));
    cache
      .set_at(&Key("a"), &Counter { value: 1 }, policy, t0)
      .unwrap();
    cache
      .set_at(&Key("b"), &Counter { value: 2 }, policy, t0)
      .unwrap();

    // "b" is read at +50m, which keeps it alive past +60m
    cache
      .get_at::<Counter>(&Key("b"), t0 + Duration::minutes(50))
      .unwrap();

    assert_eq!(
      cache
        .collect_garbage_at(t0 + Duration::minutes(61))
        .unwrap(),
      1
    );
    assert!(cache.get::<Counter>(&Key("a")).unwrap().is_none());
    assert!(cache.get::<Counter>(&Key("b")).unwrap().is_some());
  }

  #[test]
  fn test_observed_entry_survives_gc_until_released() {
    let cache = layer();
    let t0 = Utc::now();
    let policy = CachePolicy::new(Duration::minutes(5), Duration::minutes(10));
    cache
      .set_at(&Key("a"), &Counter { value: 1 }, policy, t0)
      .unwrap();

    let first = cache.observe(&Key("a"));
    let second = cache.clone().observe(&Key("a"));
    assert_eq!(cache.collect_garbage_at(t0 + Duration::minutes(11)).unwrap(), 0);

    drop(first);
    assert_eq!(cache.collect_garbage_at(t0 + Duration::minutes(11)).unwrap(), 0);

    drop(second);
    assert_eq!(cache.collect_garbage_at(t0 + Duration::minutes(11)).unwrap(), 1);
    assert!(cache.get::<Counter>(&Key("a")).unwrap().is_none());
  }

  #[tokio::test]
  async fn test_fetch_miss_goes_to_network_and_stores() {
    let cache = layer();
    let result = cache
      .fetch(&Key("a"), CachePolicy::default(), || async {
        Ok(Counter { value: 9 })
      })
      .await
      .unwrap();
    assert_eq!(result.source, CacheSource::Network);
    assert_eq!(cache.get::<Counter>(&Key("a")).unwrap().unwrap().data.value, 9);
  }

  #[tokio::test]
  async fn test_fetch_fresh_hit_skips_network() {
    let cache = layer();
    cache
      .set(&Key("a"), &Counter { value: 1 }, CachePolicy::default())
      .unwrap();
    let result = cache
      .fetch(&Key("a"), CachePolicy::default(), || async {
        Err::<Counter, _>(eyre!("network must not be called"))
      })
      .await
      .unwrap();
    assert_eq!(result.source, CacheSource::CacheFresh);
    assert_eq!(result.data.value, 1);
  }

  #[tokio::test]
  async fn test_fetch_stale_with_network_failure_serves_offline() {
    let cache = layer();
    let policy = CachePolicy::new(Duration::zero(), Duration::minutes(10));
    cache
      .set_at(
        &Key("a"),
        &Counter { value: 1 },
        policy,
        Utc::now() - Duration::seconds(5),
      )
      .unwrap();

    let result = cache
      .fetch(&Key("a"), policy, || async {
        Err::<Counter, _>(eyre!("offline"))
      })
      .await
      .unwrap();
    assert_eq!(result.source, CacheSource::Offline);
    assert_eq!(result.data.value, 1);
  }

  #[tokio::test]
  async fn test_fetch_miss_with_network_failure_errors() {
    let cache = layer();
    let result = cache
      .fetch(&Key("a"), CachePolicy::default(), || async {
        Err::<Counter, _>(eyre!("Failed to fetch"))
      })
      .await;
    assert!(result.is_err());
  }
}
