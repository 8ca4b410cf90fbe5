use chrono::Duration;
use std::sync::Arc;
use tokio::sync::watch;

use crate::api::{Issue, IssueFilter, IssueQueryKey, IssueSource};
use crate::cache::QueryCache;
use crate::query::{Query, QuerySnapshot};

/// Paginated issue list.
///
/// Keeps the previous page visible while the next one loads, and seeds the
/// single-issue cache entries from every page it receives.
pub struct IssueListQuery {
  source: Arc<dyn IssueSource>,
  filter: IssueFilter,
  query: Query<Vec<Issue>>,
}

impl IssueListQuery {
  /// Create the query and start fetching `filter` immediately.
  pub fn new(
    source: Arc<dyn IssueSource>,
    cache: QueryCache,
    filter: IssueFilter,
    stale_time: Duration,
  ) -> Self {
    let query = Query::<Vec<Issue>>::new("issues", cache)
      .keep_previous_data()
      .with_stale_time(stale_time)
      .on_success(|cache, issues| cache.seed_entities(issues).map(|_| ()));

    let mut list = Self {
      source,
      filter,
      query,
    };
    list.fetch();
    list
  }

  pub fn filter(&self) -> &IssueFilter {
    &self.filter
  }

  pub fn page_num(&self) -> u32 {
    self.filter.page_num
  }

  /// Switch to a new label/status/page combination.
  pub fn set_filter(&mut self, filter: IssueFilter) {
    self.filter = filter;
    self.fetch();
  }

  /// Switch page, keeping labels and status. Page 0 is ignored.
  pub fn set_page(&mut self, page_num: u32) {
    if page_num == 0 {
      return;
    }
    self.set_filter(self.filter.with_page(page_num));
  }

  pub fn refetch(&mut self) -> bool {
    let source = self.source.clone();
    let filter = self.filter.clone();
    self.query.refetch(move || source.list_issues(&filter))
  }

  pub fn poll(&mut self) -> bool {
    self.query.poll()
  }

  pub async fn settle(&mut self) -> bool {
    self.query.settle().await
  }

  pub fn snapshot(&self) -> QuerySnapshot<Vec<Issue>> {
    self.query.snapshot()
  }

  pub fn subscribe(&self) -> watch::Receiver<QuerySnapshot<Vec<Issue>>> {
    self.query.subscribe()
  }

  fn fetch(&mut self) {
    let key = IssueQueryKey::List(self.filter.clone()).query_key();
    let source = self.source.clone();
    let filter = self.filter.clone();
    self.query.request(key, move || source.list_issues(&filter));
  }
}
