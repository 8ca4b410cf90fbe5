use chrono::Duration;
use std::sync::Arc;

use crate::api::{Issue, IssueQueryKey, IssueSource};
use crate::cache::QueryCache;
use crate::query::{Query, QuerySnapshot};

/// A single issue by number.
///
/// Shows the copy seeded by the issue list right away and refreshes it in
/// the background.
pub struct IssueDetailQuery {
  source: Arc<dyn IssueSource>,
  number: u64,
  query: Query<Issue>,
}

impl IssueDetailQuery {
  pub fn new(
    source: Arc<dyn IssueSource>,
    cache: QueryCache,
    number: u64,
    stale_time: Duration,
  ) -> Self {
    let mut query = Query::<Issue>::new("issue", cache).with_stale_time(stale_time);
    let key = IssueQueryKey::Detail { number }.query_key();
    let fetch_source = source.clone();
    query.request(key, move || fetch_source.get_issue(number));

    Self {
      source,
      number,
      query,
    }
  }

  pub fn number(&self) -> u64 {
    self.number
  }

  pub fn refetch(&mut self) -> bool {
    let source = self.source.clone();
    let number = self.number;
    self.query.refetch(move || source.get_issue(number))
  }

  pub fn poll(&mut self) -> bool {
    self.query.poll()
  }

  pub async fn settle(&mut self) -> bool {
    self.query.settle().await
  }

  pub fn snapshot(&self) -> QuerySnapshot<Issue> {
    self.query.snapshot()
  }
}
