//! Scripted `IssueSource` for controller tests.
//!
//! Every call returns a future that stays pending until the test responds to
//! it, so tests decide the order in which responses arrive.

use futures::future::{BoxFuture, FutureExt};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

use crate::api::{Issue, IssueFilter, IssueQueryKey, IssueSource, SearchResults};
use crate::error::{QueryError, QueryResult};

type Pending<T> = HashMap<String, oneshot::Sender<QueryResult<T>>>;

#[derive(Default)]
struct State {
  lists: Pending<Vec<Issue>>,
  searches: Pending<SearchResults>,
  details: Pending<Issue>,
  requests: Vec<String>,
}

#[derive(Clone, Default)]
pub(crate) struct FakeSource {
  state: Arc<Mutex<State>>,
}

fn gate<T: Send + 'static>(
  pending: &mut Pending<T>,
  id: String,
) -> BoxFuture<'static, QueryResult<T>> {
  let (tx, rx) = oneshot::channel();
  pending.insert(id, tx);
  async move { rx.await.unwrap_or(Err(QueryError::Cancelled)) }.boxed()
}

fn respond<T>(pending: &mut Pending<T>, id: &str, result: QueryResult<T>) -> bool {
  match pending.remove(id) {
    Some(tx) => tx.send(result).is_ok(),
    None => false,
  }
}

fn list_id(filter: &IssueFilter) -> String {
  IssueQueryKey::List(filter.clone()).description()
}

impl FakeSource {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  /// Descriptions of every request made, in order.
  pub(crate) fn requests(&self) -> Vec<String> {
    self.state.lock().unwrap().requests.clone()
  }

  /// Release the pending list request for `filter`.
  /// Returns false if there was none or it was aborted.
  pub(crate) fn respond_list(&self, filter: &IssueFilter, result: QueryResult<Vec<Issue>>) -> bool {
    respond(&mut self.state.lock().unwrap().lists, &list_id(filter), result)
  }

  pub(crate) fn respond_search(&self, term: &str, result: QueryResult<SearchResults>) -> bool {
    respond(&mut self.state.lock().unwrap().searches, term, result)
  }

  pub(crate) fn respond_detail(&self, number: u64, result: QueryResult<Issue>) -> bool {
    respond(
      &mut self.state.lock().unwrap().details,
      &number.to_string(),
      result,
    )
  }

  /// Whether the pending list request for `filter` was dropped by its caller.
  pub(crate) fn list_aborted(&self, filter: &IssueFilter) -> bool {
    self
      .state
      .lock()
      .unwrap()
      .lists
      .get(&list_id(filter))
      .map(|tx| tx.is_closed())
      .unwrap_or(false)
  }
}

impl IssueSource for FakeSource {
  fn list_issues(&self, filter: &IssueFilter) -> BoxFuture<'static, QueryResult<Vec<Issue>>> {
    let id = list_id(filter);
    let mut state = self.state.lock().unwrap();
    state.requests.push(id.clone());
    gate(&mut state.lists, id)
  }

  fn search_issues(&self, term: &str) -> BoxFuture<'static, QueryResult<SearchResults>> {
    let mut state = self.state.lock().unwrap();
    state.requests.push(format!("search: {}", term));
    gate(&mut state.searches, term.to_string())
  }

  fn get_issue(&self, number: u64) -> BoxFuture<'static, QueryResult<Issue>> {
    let mut state = self.state.lock().unwrap();
    state.requests.push(format!("issue #{}", number));
    gate(&mut state.details, number.to_string())
  }
}

pub(crate) fn issue(number: u64) -> Issue {
  Issue {
    id: format!("id-{}", number),
    number,
    title: format!("Issue {}", number),
    assignee: None,
    comments: vec![],
    created_by: "u1".to_string(),
    created_date: "2024-01-01T00:00:00.000Z".to_string(),
    labels: vec!["bug".to_string()],
    status: "todo".to_string(),
  }
}

pub(crate) fn issues(numbers: std::ops::RangeInclusive<u64>) -> Vec<Issue> {
  numbers.map(issue).collect()
}
