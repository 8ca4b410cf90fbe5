//! Caching implementations for issue types.

use serde::Serialize;
use serde_json::{json, Value};

use crate::cache::{entity_query_key, Cacheable, QueryKey};

use super::types::Issue;

// ============================================================================
// Cacheable implementations
// ============================================================================

impl Cacheable for Issue {
  fn cache_key(&self) -> String {
    self.number.to_string()
  }

  fn entity_type() -> &'static str {
    "issues"
  }
}

// ============================================================================
// Query key types
// ============================================================================

/// Parameters of the paginated issue list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueFilter {
  /// Label filter; order is kept as given and is part of the key
  pub labels: Vec<String>,
  /// An empty status means no status filter
  #[serde(skip_serializing_if = "status_is_absent")]
  pub status: Option<String>,
  /// 1-based page number
  pub page_num: u32,
}

impl Default for IssueFilter {
  fn default() -> Self {
    Self {
      labels: Vec::new(),
      status: None,
      page_num: 1,
    }
  }
}

fn status_is_absent(status: &Option<String>) -> bool {
  status.as_deref().map_or(true, str::is_empty)
}

impl IssueFilter {
  /// Build a filter, dropping an empty status and clamping the page to 1.
  pub fn new(labels: Vec<String>, status: Option<String>, page_num: u32) -> Self {
    Self {
      labels,
      status: status.filter(|s| !s.is_empty()),
      page_num: page_num.max(1),
    }
  }

  pub fn with_page(&self, page_num: u32) -> Self {
    Self {
      page_num,
      ..self.clone()
    }
  }
}

/// Query keys for the issues API.
#[derive(Clone, Debug)]
pub enum IssueQueryKey {
  /// One page of the filtered issue list
  List(IssueFilter),
  /// Full-text search
  Search { term: String },
  /// A single issue by number
  Detail { number: u64 },
}

impl IssueQueryKey {
  pub fn query_key(&self) -> QueryKey {
    match self {
      Self::List(filter) => QueryKey::new(vec![
        json!(Issue::entity_type()),
        serde_json::to_value(filter).unwrap_or(Value::Null),
      ]),
      Self::Search { term } => QueryKey::new(vec![
        json!(Issue::entity_type()),
        json!("search"),
        json!(term),
      ]),
      Self::Detail { number } => entity_query_key::<Issue>(&number.to_string()),
    }
  }

  pub fn description(&self) -> String {
    match self {
      Self::List(filter) => {
        let mut parts = vec![format!("page {}", filter.page_num)];
        if !filter.labels.is_empty() {
          parts.push(format!("labels {}", filter.labels.join(",")));
        }
        if let Some(status) = filter.status.as_deref().filter(|s| !s.is_empty()) {
          parts.push(format!("status {}", status));
        }
        format!("issues: {}", parts.join(", "))
      }
      Self::Search { term } => format!("search: {}", term),
      Self::Detail { number } => format!("issue #{}", number),
    }
  }
}

impl From<IssueQueryKey> for QueryKey {
  fn from(key: IssueQueryKey) -> Self {
    key.query_key()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_list_key_shape() {
    let filter = IssueFilter {
      labels: vec!["bug".to_string(), "ui".to_string()],
      status: Some("todo".to_string()),
      page_num: 2,
    };
    let key = IssueQueryKey::List(filter).query_key();
    assert_eq!(
      key.as_str(),
      r#"["issues",{"labels":["bug","ui"],"pageNum":2,"status":"todo"}]"#
    );
  }

  #[test]
  fn test_list_key_omits_absent_status() {
    let key = IssueQueryKey::List(IssueFilter::default()).query_key();
    assert_eq!(key.as_str(), r#"["issues",{"labels":[],"pageNum":1}]"#);
  }

  #[test]
  fn test_empty_status_is_same_key_as_none() {
    let empty = IssueFilter {
      status: Some(String::new()),
      ..IssueFilter::default()
    };
    assert_eq!(
      IssueQueryKey::List(empty.clone()).query_key(),
      IssueQueryKey::List(IssueFilter::default()).query_key()
    );
    assert_eq!(
      IssueQueryKey::List(empty).description(),
      "issues: page 1"
    );

    let built = IssueFilter::new(vec!["bug".to_string()], Some(String::new()), 0);
    assert_eq!(built.status, None);
    assert_eq!(built.page_num, 1);
  }

  #[test]
  fn test_pages_have_distinct_keys() {
    let filter = IssueFilter::default();
    assert_ne!(
      IssueQueryKey::List(filter.clone()).query_key(),
      IssueQueryKey::List(filter.with_page(2)).query_key()
    );
  }

  #[test]
  fn test_search_and_detail_keys() {
    assert_eq!(
      IssueQueryKey::Search {
        term: "bug".to_string()
      }
      .query_key()
      .as_str(),
      r#"["issues","search","bug"]"#
    );
    assert_eq!(
      QueryKey::from(IssueQueryKey::Detail { number: 42 }).as_str(),
      r#"["issues","42"]"#
    );
  }

  #[test]
  fn test_description() {
    let filter = IssueFilter {
      labels: vec!["bug".to_string()],
      status: None,
      page_num: 3,
    };
    assert_eq!(
      IssueQueryKey::List(filter).description(),
      "issues: page 3, labels bug"
    );
    assert_eq!(
      IssueQueryKey::Detail { number: 7 }.description(),
      "issue #7"
    );
  }
}
