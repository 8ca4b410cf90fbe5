use chrono::Duration;
use std::sync::Arc;
use tokio::sync::watch;

use crate::api::{IssueQueryKey, IssueSource, SearchResults};
use crate::cache::QueryCache;
use crate::query::{Query, QuerySnapshot};

/// Issue search, keyed by the search term.
///
/// Disabled while the term is empty. Unlike the list, search results are
/// not copied into the single-issue cache.
pub struct IssueSearchQuery {
  source: Arc<dyn IssueSource>,
  term: String,
  activated: bool,
  query: Query<SearchResults>,
}

impl IssueSearchQuery {
  pub fn new(source: Arc<dyn IssueSource>, cache: QueryCache, stale_time: Duration) -> Self {
    Self {
      source,
      term: String::new(),
      activated: false,
      query: Query::<SearchResults>::new("search", cache).with_stale_time(stale_time),
    }
  }

  /// Whether a non-empty term has ever been searched.
  pub fn has_activated(&self) -> bool {
    self.activated
  }

  pub fn is_enabled(&self) -> bool {
    self.query.is_enabled()
  }

  /// Search for `term`; an empty term disables the query.
  pub fn set_term(&mut self, term: impl Into<String>) {
    let term = term.into();
    if term == self.term {
      return;
    }
    self.term = term;

    if self.term.is_empty() {
      self.query.disable();
      return;
    }

    self.activated = true;
    let key = IssueQueryKey::Search {
      term: self.term.clone(),
    }
    .query_key();
    let source = self.source.clone();
    let term = self.term.clone();
    self.query.request(key, move || source.search_issues(&term));
  }

  pub fn refetch(&mut self) -> bool {
    let source = self.source.clone();
    let term = self.term.clone();
    self.query.refetch(move || source.search_issues(&term))
  }

  pub fn poll(&mut self) -> bool {
    self.query.poll()
  }

  pub async fn settle(&mut self) -> bool {
    self.query.settle().await
  }

  pub fn snapshot(&self) -> QuerySnapshot<SearchResults> {
    self.query.snapshot()
  }

  pub fn subscribe(&self) -> watch::Receiver<QuerySnapshot<SearchResults>> {
    self.query.subscribe()
  }
}
