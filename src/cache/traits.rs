//! Core traits for the caching system.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};

use super::key::QueryKey;

/// Trait for entities that can be cached individually.
///
/// List results are made of entities; each entity can also be written to its
/// own cache entry so that a later single-entity lookup hits a warm cache.
pub trait Cacheable: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
  /// Unique identifier for this entity (e.g. the issue number)
  fn cache_key(&self) -> String;

  /// Entity type name, used as the first key part (e.g. "issues")
  fn entity_type() -> &'static str;

  /// Cache key of the single-entity entry: `[entity_type, cache_key]`.
  fn entity_query_key(&self) -> QueryKey {
    entity_query_key::<Self>(&self.cache_key())
  }
}

/// Build the single-entity key for a given entity key without an instance.
pub fn entity_query_key<T: Cacheable>(entity_key: &str) -> QueryKey {
  QueryKey::new(vec![json!(T::entity_type()), Value::String(entity_key.to_string())])
}
