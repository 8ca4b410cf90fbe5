use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An issue as returned by the issues API.
///
/// Treated as a read-only record; only `id` and `number` act as keys.
/// Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
  pub id: String,
  pub number: u64,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub assignee: Option<String>,
  /// Comment references; only the count is displayed
  #[serde(default)]
  pub comments: Vec<Value>,
  #[serde(default)]
  pub created_by: String,
  /// ISO 8601 timestamp
  #[serde(default)]
  pub created_date: String,
  #[serde(default)]
  pub labels: Vec<String>,
  #[serde(default)]
  pub status: String,
}

/// Response of the issue search endpoint.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchResults {
  pub count: u64,
  #[serde(default)]
  pub items: Vec<Issue>,
}
