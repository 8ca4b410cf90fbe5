//! Issue query controllers built on `Query<T>`.
//!
//! Each controller owns one logical query against the shared `QueryCache`:
//! - `IssueListQuery`: paginated list, keeps previous data, seeds detail entries
//! - `IssueSearchQuery`: term search, disabled while the term is empty
//! - `IssueDetailQuery`: one issue, served from the seeded entry when present
//!
//! Controllers are independent; activity on one never cancels another.

mod detail;
mod list;
mod search;

#[cfg(test)]
pub(crate) mod testing;

pub use detail::IssueDetailQuery;
pub use list::IssueListQuery;
pub use search::IssueSearchQuery;

#[cfg(test)]
mod tests {
  use super::testing::{issues, FakeSource};
  use super::*;
  use crate::api::{IssueFilter, SearchResults};
  use crate::cache::QueryCache;
  use chrono::Duration;
  use std::sync::Arc;

  #[tokio::test]
  async fn test_search_does_not_cancel_list() {
    let source = FakeSource::new();
    let cache = QueryCache::new();
    let mut list = IssueListQuery::new(
      Arc::new(source.clone()),
      cache.clone(),
      IssueFilter::default(),
      Duration::zero(),
    );
    let mut search = IssueSearchQuery::new(Arc::new(source.clone()), cache.clone(), Duration::zero());

    search.set_term("bug");
    tokio::task::yield_now().await;
    assert!(!source.list_aborted(&IssueFilter::default()));
    assert!(list.snapshot().is_fetching());

    assert!(source.respond_search(
      "bug",
      Ok(SearchResults {
        count: 1,
        items: issues(7..=7),
      })
    ));
    assert!(source.respond_list(&IssueFilter::default(), Ok(issues(1..=20))));
    search.settle().await;
    list.settle().await;

    assert_eq!(list.snapshot().data.map(|d| d.len()), Some(20));
    assert_eq!(search.snapshot().data.map(|r| r.count), Some(1));
  }
}
