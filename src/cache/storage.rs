//! Cache storage trait and in-memory implementation.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use super::traits::CachePolicy;

/// A single stored entry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
  /// Entity type the data was stored as
  pub entity_type: &'static str,
  /// Serialized value
  pub data: serde_json::Value,
  /// When the value was last written
  pub cached_at: DateTime<Utc>,
  /// When the value was last read or written
  pub last_used: DateTime<Utc>,
  /// Staleness and eviction windows for this entry
  pub policy: CachePolicy,
}

impl CacheEntry {
  pub fn new(
    entity_type: &'static str,
    data: serde_json::Value,
    policy: CachePolicy,
    now: DateTime<Utc>,
  ) -> Self {
    Self {
      entity_type,
      data,
      cached_at: now,
      last_used: now,
      policy,
    }
  }

  pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
    now - self.cached_at > self.policy.stale_time
  }

  pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
    now - self.last_used > self.policy.gc_time
  }
}

/// Trait for cache storage backends.
pub trait CacheStorage: Send + Sync {
  /// Get an entry by key, marking it as used at `now`.
  fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<CacheEntry>>;

  /// Insert or replace an entry.
  fn put(&self, key: &str, entry: CacheEntry) -> Result<()>;

  /// Modify an entry in place under the storage lock.
  ///
  /// Returns `Ok(false)` without calling `f` if the key is absent.
  fn update<F>(&self, key: &str, f: F) -> Result<bool>
  where
    F: FnOnce(&mut CacheEntry) -> Result<()>;

  /// Remove an entry, returning whether it existed.
  fn remove(&self, key: &str) -> Result<bool>;

  /// Drop every entry unused for longer than its gc window, except the keys
  /// in `keep`. Returns evicted keys.
  fn evict_expired(&self, now: DateTime<Utc>, keep: &HashSet<String>) -> Result<Vec<String>>;
}

/// In-memory storage. Entries live for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
  entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, CacheEntry>>> {
    self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))
  }
}

impl CacheStorage for MemoryStorage {
  fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<CacheEntry>> {
    let mut entries = self.lock()?;
    Ok(entries.get_mut(key).map(|entry| {
      entry.last_used = now;
      entry.clone()
    }))
  }

  fn put(&self, key: &str, entry: CacheEntry) -> Result<()> {
    self.lock()?.insert(key.to_string(), entry);
    Ok(())
  }

  fn update<F>(&self, key: &str, f: F) -> Result<bool>
  where
    F: FnOnce(&mut CacheEntry) -> Result<()>,
  {
    let mut entries = self.lock()?;
    match entries.get_mut(key) {
      Some(entry) => {
        f(entry)?;
        Ok(true)
      }
      None => Ok(false),
    }
  }

  fn remove(&self, key: &str) -> Result<bool> {
    Ok(self.lock()?.remove(key).is_some())
  }

  fn evict_expired(&self, now: DateTime<Utc>, keep: &HashSet<String>) -> Result<Vec<String>> {
    let mut entries = self.lock()?;
    let expired: Vec<String> = entries
      .iter()
      .filter(|(key, entry)| entry.is_expired(now) && !keep.contains(*key))
      .map(|(key, _)| key.clone())
      .collect();

    for key in &expired {
      entries.remove(key);
    }

    Ok(expired)
  }
}
