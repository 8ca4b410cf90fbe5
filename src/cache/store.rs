//! In-memory query cache shared by all query controllers.

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

use super::key::QueryKey;
use super::traits::Cacheable;
use crate::error::{QueryError, QueryResult};

/// Lifecycle status of a cache entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EntryStatus {
  /// Entry exists but nothing has been fetched for it
  #[default]
  Idle,
  /// A fetch for this key is in flight
  Fetching,
  /// Last fetch succeeded
  Success,
  /// Last fetch failed; previous data (if any) is kept
  Error,
}

/// A single cache entry. There is exactly one per distinct key.
#[derive(Debug, Clone)]
pub struct CacheEntry {
  pub key: QueryKey,
  /// Serialized snapshot of the data; decoded into a fresh value on every read
  pub data: Option<Value>,
  pub fetched_at: Option<DateTime<Utc>>,
  pub status: EntryStatus,
  pub error: Option<QueryError>,
  /// Set by `invalidate_prefix`, cleared by the next successful `set`
  pub invalidated: bool,
}

impl CacheEntry {
  fn new(key: QueryKey) -> Self {
    Self {
      key,
      data: None,
      fetched_at: None,
      status: EntryStatus::Idle,
      error: None,
      invalidated: false,
    }
  }

  /// Whether the data is younger than `stale_time` and not invalidated.
  pub fn is_fresh(&self, stale_time: Duration) -> bool {
    if self.invalidated {
      return false;
    }
    match self.fetched_at {
      Some(at) => Utc::now() - at < stale_time,
      None => false,
    }
  }
}

/// Typed data read from the cache.
#[derive(Debug, Clone)]
pub struct CachedData<T> {
  pub data: T,
  pub fetched_at: Option<DateTime<Utc>>,
}

/// Key-value store from `QueryKey` to `CacheEntry`.
///
/// This is a cheap handle: clones share the same entries. Create one at
/// startup and hand it to every controller that should see the same data.
/// Entries never expire on their own.
#[derive(Clone, Default)]
pub struct QueryCache {
  entries: Arc<Mutex<HashMap<QueryKey, CacheEntry>>>,
}

impl QueryCache {
  pub fn new() -> Self {
    Self::default()
  }

  fn entries(&self) -> MutexGuard<'_, HashMap<QueryKey, CacheEntry>> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Get a copy of the entry for `key`.
  pub fn get(&self, key: &QueryKey) -> Option<CacheEntry> {
    self.entries().get(key).cloned()
  }

  /// Get the entry's data decoded as `T`.
  ///
  /// A payload that does not decode as `T` is treated as a miss.
  pub fn get_data<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<CachedData<T>> {
    let (value, fetched_at) = {
      let entries = self.entries();
      let entry = entries.get(key)?;
      (entry.data.clone()?, entry.fetched_at)
    };

    match serde_json::from_value(value) {
      Ok(data) => Some(CachedData { data, fetched_at }),
      Err(e) => {
        warn!(key = %key, error = %e, "Cached data has an unexpected shape, ignoring it");
        None
      }
    }
  }

  /// Store fresh data: `status = Success`, `fetched_at = now`, error cleared.
  pub fn set<T: Serialize>(&self, key: &QueryKey, data: &T) -> QueryResult<()> {
    let value = serde_json::to_value(data)?;
    let mut entries = self.entries();
    let entry = entries
      .entry(key.clone())
      .or_insert_with(|| CacheEntry::new(key.clone()));
    entry.data = Some(value);
    entry.fetched_at = Some(Utc::now());
    entry.status = EntryStatus::Success;
    entry.error = None;
    entry.invalidated = false;
    Ok(())
  }

  /// Record a failure. Previous data stays visible.
  pub fn set_error(&self, key: &QueryKey, error: QueryError) {
    let mut entries = self.entries();
    let entry = entries
      .entry(key.clone())
      .or_insert_with(|| CacheEntry::new(key.clone()));
    entry.status = EntryStatus::Error;
    entry.error = Some(error);
  }

  /// Mark `key` as being fetched without discarding its data.
  ///
  /// Returns the status the entry had before, so an aborted fetch can put it
  /// back with `restore_status`.
  pub fn mark_fetching(&self, key: &QueryKey) -> EntryStatus {
    let mut entries = self.entries();
    let entry = entries
      .entry(key.clone())
      .or_insert_with(|| CacheEntry::new(key.clone()));
    std::mem::replace(&mut entry.status, EntryStatus::Fetching)
  }

  /// Undo `mark_fetching` for a fetch that was cancelled.
  ///
  /// Only the status is touched, and only if the entry is still fetching.
  pub fn restore_status(&self, key: &QueryKey, status: EntryStatus) {
    if let Some(entry) = self.entries().get_mut(key) {
      if entry.status == EntryStatus::Fetching {
        entry.status = status;
      }
    }
  }

  /// Invalidate every entry whose key starts with `prefix`. Returns the count.
  pub fn invalidate_prefix(&self, prefix: &[Value]) -> usize {
    let mut count = 0;
    for entry in self.entries().values_mut() {
      if entry.key.starts_with(prefix) {
        entry.invalidated = true;
        count += 1;
      }
    }
    count
  }

  pub fn len(&self) -> usize {
    self.entries().len()
  }

  /// Write every entity to its own single-entity entry.
  ///
  /// Each entry receives a serialized copy; later changes to either side do
  /// not affect the other. Returns the number of entries written.
  pub fn seed_entities<T: Cacheable>(&self, entities: &[T]) -> QueryResult<usize> {
    for entity in entities {
      self.set(&entity.entity_query_key(), entity)?;
    }
    debug!(
      entity_type = T::entity_type(),
      count = entities.len(),
      "Seeded entity cache"
    );
    Ok(entities.len())
  }
}

impl std::fmt::Debug for QueryCache {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("QueryCache")
      .field("entries", &self.len())
      .finish()
  }
}
