//! Composite keys identifying cacheable queries.

use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::hash::{Hash, Hasher};

/// An ordered, serializable tuple identifying a query,
/// e.g. `["issues", {"labels": ["bug"], "pageNum": 1}]`.
///
/// Two keys are equal iff their serialized forms are equal. Object members
/// are serialized in sorted order, array elements in the order given, so
/// label order is significant.
#[derive(Clone)]
pub struct QueryKey {
  parts: Vec<Value>,
  serialized: String,
}

impl QueryKey {
  pub fn new(parts: Vec<Value>) -> Self {
    let serialized = Value::Array(parts.clone()).to_string();
    Self { parts, serialized }
  }

  /// Canonical serialized form, used for equality and hashing.
  pub fn as_str(&self) -> &str {
    &self.serialized
  }

  /// Whether this key begins with all of `prefix`'s parts.
  pub fn starts_with(&self, prefix: &[Value]) -> bool {
    self.parts.len() >= prefix.len() && self.parts.iter().zip(prefix).all(|(a, b)| a == b)
  }
}

impl PartialEq for QueryKey {
  fn eq(&self, other: &Self) -> bool {
    self.serialized == other.serialized
  }
}

impl Eq for QueryKey {}

impl Hash for QueryKey {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.serialized.hash(state);
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl fmt::Debug for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "QueryKey({})", self.serialized)
  }
}

impl Serialize for QueryKey {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    self.parts.serialize(serializer)
  }
}
