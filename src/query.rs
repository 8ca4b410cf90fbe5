//! Keyed async queries backed by the shared `QueryCache`.
//!
//! Inspired by TanStack Query, a `Query<T>` is one logical consumer of the
//! cache (e.g. "the issue list"). Each call to `request` names the key the
//! consumer wants now; the query serves whatever the cache has for it,
//! fetches in the background, and cancels the fetch for a key that is no
//! longer wanted.
//!
//! # Example
//!
//! ```ignore
//! let mut query = Query::new("issues", cache.clone()).keep_previous_data();
//!
//! // On parameter change
//! query.request(key, move || async move { source.list_issues(&filter).await }.boxed());
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//!
//! // In render
//! let snapshot = query.snapshot();
//! if snapshot.is_loading() {
//!     render_spinner();
//! }
//! ```

use chrono::{DateTime, Duration, Utc};
use futures::future::BoxFuture;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cache::{EntryStatus, QueryCache, QueryKey};
use crate::error::{QueryError, QueryResult};

/// Whether the query has data to show for its current key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
  /// No data yet (including a disabled query that never ran)
  Loading,
  /// Data is available
  Success,
  /// The last fetch for the current key failed
  Error,
}

/// Whether a request is currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
  Idle,
  Fetching,
}

/// Lifecycle of a query: `Idle → Fetching → Success | Error`, and back to
/// `Fetching` on the next key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPhase {
  Idle,
  Fetching,
  Success,
  Error,
}

/// Point-in-time view of a query, as handed to the rendering layer.
#[derive(Debug, Clone)]
pub struct QuerySnapshot<T> {
  pub data: Option<T>,
  pub status: QueryStatus,
  pub fetch_status: FetchStatus,
  pub error: Option<QueryError>,
  pub phase: QueryPhase,
  /// The shown data belongs to a key other than the one last requested
  pub is_previous_data: bool,
  /// When the shown data was fetched
  pub updated_at: Option<DateTime<Utc>>,
}

impl<T> QuerySnapshot<T> {
  /// Snapshot of a query that has never run.
  pub fn idle() -> Self {
    Self {
      data: None,
      status: QueryStatus::Loading,
      fetch_status: FetchStatus::Idle,
      error: None,
      phase: QueryPhase::Idle,
      is_previous_data: false,
      updated_at: None,
    }
  }

  pub fn is_loading(&self) -> bool {
    self.status == QueryStatus::Loading
  }

  pub fn is_fetching(&self) -> bool {
    self.fetch_status == FetchStatus::Fetching
  }

  pub fn is_success(&self) -> bool {
    self.status == QueryStatus::Success
  }

  pub fn is_error(&self) -> bool {
    self.status == QueryStatus::Error
  }

  /// Disabled and never fetched.
  pub fn is_pre_activation(&self) -> bool {
    self.is_loading() && !self.is_fetching()
  }

  pub fn error_message(&self) -> Option<String> {
    self.error.as_ref().map(|e| e.to_string())
  }
}

/// Options for a query.
#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
  /// Keep showing the last data while a new key loads
  pub keep_previous_data: bool,
  /// How long fetched data counts as fresh. Zero means always revalidate
  pub stale_time: Duration,
}

impl Default for QueryOptions {
  fn default() -> Self {
    Self {
      keep_previous_data: false,
      stale_time: Duration::zero(),
    }
  }
}

/// Runs after a successful fetch and before the result is stored and published
type SuccessHook<T> = Box<dyn Fn(&QueryCache, &T) -> QueryResult<()> + Send + Sync>;

struct Displayed<T> {
  key: QueryKey,
  data: T,
  fetched_at: Option<DateTime<Utc>>,
}

struct InFlight<T> {
  id: u64,
  key: QueryKey,
  /// Cache entry status before this fetch marked it as fetching
  entry_status: EntryStatus,
  /// Query phase before this fetch started
  phase: QueryPhase,
  receiver: oneshot::Receiver<QueryResult<T>>,
  handle: JoinHandle<()>,
}

/// A keyed query with at most one request in flight.
///
/// Results are only ever applied through `poll` or `settle`, on the thread
/// that owns the query. A superseded request is aborted and its receiver
/// dropped, so its result can never reach the cache.
pub struct Query<T> {
  name: &'static str,
  cache: QueryCache,
  options: QueryOptions,
  key: Option<QueryKey>,
  phase: QueryPhase,
  displayed: Option<Displayed<T>>,
  error: Option<QueryError>,
  in_flight: Option<InFlight<T>>,
  next_request_id: u64,
  on_success: Option<SuccessHook<T>>,
  notify: watch::Sender<QuerySnapshot<T>>,
}

impl<T> Query<T>
where
  T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
  /// Create a disabled query named `name` on top of `cache`.
  pub fn new(name: &'static str, cache: QueryCache) -> Self {
    let (notify, _) = watch::channel(QuerySnapshot::idle());
    Self {
      name,
      cache,
      options: QueryOptions::default(),
      key: None,
      phase: QueryPhase::Idle,
      displayed: None,
      error: None,
      in_flight: None,
      next_request_id: 1,
      on_success: None,
      notify,
    }
  }

  /// Keep the previous key's data visible while a new key loads.
  pub fn keep_previous_data(mut self) -> Self {
    self.options.keep_previous_data = true;
    self
  }

  /// Set how long fetched data is considered fresh.
  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.options.stale_time = stale_time;
    self
  }

  /// Run `hook` on every successful result before it is stored and published.
  pub fn on_success<F>(mut self, hook: F) -> Self
  where
    F: Fn(&QueryCache, &T) -> QueryResult<()> + Send + Sync + 'static,
  {
    self.on_success = Some(Box::new(hook));
    self
  }

  pub fn is_enabled(&self) -> bool {
    self.key.is_some()
  }

  /// Ask for the data of `key`.
  ///
  /// Requesting the current key again is a no-op. For a new key, any
  /// in-flight request is cancelled, cached data for the key is shown at
  /// once, and a fetch starts unless that data is still fresh. Returns
  /// whether a fetch was started.
  pub fn request<F>(&mut self, key: QueryKey, fetch: F) -> bool
  where
    F: FnOnce() -> BoxFuture<'static, QueryResult<T>>,
  {
    if self.key.as_ref() == Some(&key) {
      return false;
    }

    self.cancel_in_flight();
    self.key = Some(key.clone());
    self.error = None;

    let fresh = self
      .cache
      .get(&key)
      .map(|entry| entry.is_fresh(self.options.stale_time))
      .unwrap_or(false);

    match self.cache.get_data::<T>(&key) {
      Some(cached) => {
        self.displayed = Some(Displayed {
          key: key.clone(),
          data: cached.data,
          fetched_at: cached.fetched_at,
        });
      }
      None if !self.options.keep_previous_data => self.displayed = None,
      None => {}
    }

    if fresh && self.displayed.is_some() {
      debug!(query = self.name, key = %key, "Serving fresh cached data");
      self.phase = QueryPhase::Success;
      self.publish();
      return false;
    }

    self.start(key, fetch);
    true
  }

  /// Fetch the current key again, even if a request is in flight.
  ///
  /// Returns false if the query is disabled.
  pub fn refetch<F>(&mut self, fetch: F) -> bool
  where
    F: FnOnce() -> BoxFuture<'static, QueryResult<T>>,
  {
    let Some(key) = self.key.clone() else {
      return false;
    };
    self.cancel_in_flight();
    self.start(key, fetch);
    true
  }

  /// Deactivate the query: cancel any request and forget the key and data.
  ///
  /// The snapshot goes back to the pre-activation state (`Loading` + `Idle`).
  pub fn disable(&mut self) {
    self.cancel_in_flight();
    let was_enabled = self.key.take().is_some();
    self.displayed = None;
    self.error = None;
    self.phase = QueryPhase::Idle;
    if was_enabled {
      debug!(query = self.name, "Query disabled");
    }
    self.publish();
  }

  /// Apply the result of the in-flight request if it has arrived.
  ///
  /// Returns `true` if the state changed. Call this in the event loop tick.
  pub fn poll(&mut self) -> bool {
    let Some(in_flight) = self.in_flight.as_mut() else {
      return false;
    };

    let result = match in_flight.receiver.try_recv() {
      Ok(result) => result,
      Err(oneshot::error::TryRecvError::Empty) => return false,
      // Task ended without a result (aborted or panicked)
      Err(oneshot::error::TryRecvError::Closed) => Err(QueryError::Cancelled),
    };

    self.complete(result);
    true
  }

  /// Wait for the in-flight request and apply its result.
  ///
  /// Returns `false` immediately if nothing is in flight.
  pub async fn settle(&mut self) -> bool {
    let Some(in_flight) = self.in_flight.as_mut() else {
      return false;
    };

    let result = (&mut in_flight.receiver)
      .await
      .unwrap_or(Err(QueryError::Cancelled));

    self.complete(result);
    true
  }

  /// Current state for rendering.
  pub fn snapshot(&self) -> QuerySnapshot<T> {
    let is_previous_data = match (&self.displayed, &self.key) {
      (Some(displayed), Some(key)) => displayed.key != *key,
      _ => false,
    };

    let status = if self.error.is_some() {
      QueryStatus::Error
    } else if self.displayed.is_some() {
      QueryStatus::Success
    } else {
      QueryStatus::Loading
    };

    QuerySnapshot {
      data: self.displayed.as_ref().map(|d| d.data.clone()),
      status,
      fetch_status: if self.in_flight.is_some() {
        FetchStatus::Fetching
      } else {
        FetchStatus::Idle
      },
      error: self.error.clone(),
      phase: self.phase,
      is_previous_data,
      updated_at: self.displayed.as_ref().and_then(|d| d.fetched_at),
    }
  }

  /// Subscribe to snapshot changes.
  pub fn subscribe(&self) -> watch::Receiver<QuerySnapshot<T>> {
    self.notify.subscribe()
  }

  fn start<F>(&mut self, key: QueryKey, fetch: F)
  where
    F: FnOnce() -> BoxFuture<'static, QueryResult<T>>,
  {
    let id = self.next_request_id;
    self.next_request_id += 1;

    let entry_status = self.cache.mark_fetching(&key);
    let (tx, receiver) = oneshot::channel();
    let future = fetch();
    let handle = tokio::spawn(async move {
      // Ignore send errors - the receiver is dropped when superseded
      let _ = tx.send(future.await);
    });

    debug!(query = self.name, key = %key, request_id = id, "Fetch started");

    self.in_flight = Some(InFlight {
      id,
      key,
      entry_status,
      phase: self.phase,
      receiver,
      handle,
    });
    self.phase = QueryPhase::Fetching;
    self.publish();
  }

  fn complete(&mut self, result: QueryResult<T>) {
    let Some(in_flight) = self.in_flight.take() else {
      return;
    };
    let key = in_flight.key;

    match result {
      Ok(data) => match self.store(&key, &data) {
        Ok(fetched_at) => {
          debug!(
            query = self.name,
            key = %key,
            request_id = in_flight.id,
            "Fetch succeeded"
          );
          self.displayed = Some(Displayed {
            key,
            data,
            fetched_at,
          });
          self.error = None;
          self.phase = QueryPhase::Success;
        }
        Err(error) => self.fail(key, in_flight.id, error),
      },
      Err(error) if error.is_cancelled() => {
        self.cache.restore_status(&key, in_flight.entry_status);
        self.phase = in_flight.phase;
        debug!(
          query = self.name,
          key = %key,
          request_id = in_flight.id,
          "Fetch ended without a result"
        );
      }
      Err(error) => self.fail(key, in_flight.id, error),
    }

    self.publish();
  }

  /// Run the success hook, then store the data. Returns the fetch timestamp.
  fn store(&self, key: &QueryKey, data: &T) -> QueryResult<Option<DateTime<Utc>>> {
    if let Some(hook) = &self.on_success {
      if let Err(e) = hook(&self.cache, data) {
        warn!(query = self.name, key = %key, error = %e, "Success hook failed");
      }
    }
    self.cache.set(key, data)?;
    Ok(self.cache.get(key).and_then(|entry| entry.fetched_at))
  }

  fn fail(&mut self, key: QueryKey, id: u64, error: QueryError) {
    warn!(
      query = self.name,
      key = %key,
      request_id = id,
      error = %error,
      "Fetch failed"
    );
    self.cache.set_error(&key, error.clone());
    self.error = Some(error);
    self.phase = QueryPhase::Error;
  }

  fn publish(&self) {
    self.notify.send_replace(self.snapshot());
  }
}

impl<T> Query<T> {
  /// Abort the in-flight request, if any, and revert its fetching mark.
  fn cancel_in_flight(&mut self) {
    if let Some(in_flight) = self.in_flight.take() {
      in_flight.handle.abort();
      self
        .cache
        .restore_status(&in_flight.key, in_flight.entry_status);
      debug!(
        query = self.name,
        key = %in_flight.key,
        request_id = in_flight.id,
        "Fetch cancelled"
      );
    }
  }
}

impl<T> Drop for Query<T> {
  fn drop(&mut self) {
    self.cancel_in_flight();
  }
}

// Query is not Clone: it owns its in-flight request.
// Share its state through `subscribe()` instead.

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("name", &self.name)
      .field("key", &self.key)
      .field("phase", &self.phase)
      .field("options", &self.options)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use futures::FutureExt;
  use serde_json::json;
  use std::sync::atomic::{AtomicBool, Ordering};
  use std::sync::Arc;

  /// A fetch whose result is released by sending on the returned channel.
  pub(crate) fn gated<T: Send + 'static>() -> (
    oneshot::Sender<QueryResult<T>>,
    impl FnOnce() -> BoxFuture<'static, QueryResult<T>>,
  ) {
    let (tx, rx) = oneshot::channel();
    let fetch = move || {
      async move { rx.await.unwrap_or(Err(QueryError::Cancelled)) }.boxed()
    };
    (tx, fetch)
  }

  fn ready<T: Send + 'static>(
    result: QueryResult<T>,
  ) -> impl FnOnce() -> BoxFuture<'static, QueryResult<T>> {
    move || async move { result }.boxed()
  }

  fn page(n: u32) -> QueryKey {
    QueryKey::new(vec![json!("numbers"), json!({ "page": n })])
  }

  #[tokio::test]
  async fn test_query_success() {
    let cache = QueryCache::new();
    let mut query: Query<Vec<u32>> = Query::new("numbers", cache.clone());

    assert_eq!(query.snapshot().phase, QueryPhase::Idle);
    assert!(query.snapshot().is_pre_activation());

    assert!(query.request(page(1), ready(Ok(vec![1, 2, 3]))));
    assert_eq!(query.snapshot().phase, QueryPhase::Fetching);
    assert!(query.snapshot().is_loading());
    assert!(query.snapshot().is_fetching());
    assert_eq!(cache.get(&page(1)).unwrap().status, EntryStatus::Fetching);

    assert!(query.settle().await);

    let snapshot = query.snapshot();
    assert_eq!(query.snapshot().phase, QueryPhase::Success);
    assert!(snapshot.is_success());
    assert!(!snapshot.is_fetching());
    assert_eq!(snapshot.data, Some(vec![1, 2, 3]));
    assert!(snapshot.updated_at.is_some());
    assert_eq!(cache.get(&page(1)).unwrap().status, EntryStatus::Success);
  }

  #[tokio::test]
  async fn test_query_error() {
    let cache = QueryCache::new();
    let mut query: Query<Vec<u32>> = Query::new("numbers", cache.clone());

    query.request(
      page(1),
      ready(Err(QueryError::Network("Something went wrong".to_string()))),
    );
    query.settle().await;

    let snapshot = query.snapshot();
    assert_eq!(query.snapshot().phase, QueryPhase::Error);
    assert!(snapshot.is_error());
    assert_eq!(
      snapshot.error_message().as_deref(),
      Some("Something went wrong")
    );
    assert_eq!(cache.get(&page(1)).unwrap().status, EntryStatus::Error);
  }

  #[tokio::test]
  async fn test_poll_before_result_is_noop() {
    let mut query: Query<u32> = Query::new("numbers", QueryCache::new());
    let (tx, fetch) = gated();

    query.request(page(1), fetch);
    assert!(!query.poll());
    assert!(query.snapshot().is_fetching());

    tx.send(Ok(7)).unwrap();
    query.settle().await;
    assert_eq!(query.snapshot().data, Some(7));
    assert!(!query.poll());
  }

  #[tokio::test]
  async fn test_same_key_is_deduplicated() {
    let mut query: Query<u32> = Query::new("numbers", QueryCache::new());
    let (_tx, fetch) = gated();

    assert!(query.request(page(1), fetch));
    let called = Arc::new(AtomicBool::new(false));
    let flag = called.clone();
    assert!(!query.request(page(1), move || {
      flag.store(true, Ordering::SeqCst);
      async { Ok(0) }.boxed()
    }));
    assert!(!called.load(Ordering::SeqCst));
  }

  #[tokio::test]
  async fn test_late_response_never_overwrites_newer_key() {
    let cache = QueryCache::new();
    let mut query: Query<Vec<u32>> = Query::new("numbers", cache.clone());
    let (tx1, fetch1) = gated();
    let (tx2, fetch2) = gated();

    query.request(page(1), fetch1);
    query.request(page(2), fetch2);

    tx2.send(Ok(vec![2])).unwrap();
    query.settle().await;

    // The first request resolves after the second
    let _ = tx1.send(Ok(vec![1]));
    tokio::task::yield_now().await;
    assert!(!query.poll());
    assert!(!query.settle().await);

    assert_eq!(query.snapshot().data, Some(vec![2]));
    let first = cache.get(&page(1)).unwrap();
    assert!(first.data.is_none());
    assert!(first.fetched_at.is_none());
    assert_eq!(first.status, EntryStatus::Idle);
    assert_eq!(cache.get(&page(2)).unwrap().data, Some(json!([2])));
  }

  #[tokio::test]
  async fn test_cancelled_request_leaves_cache_untouched() {
    let cache = QueryCache::new();
    cache.set(&page(1), &vec![10]).unwrap();
    cache.set_error(&page(1), QueryError::Network("old".to_string()));
    let before = cache.get(&page(1)).unwrap();

    let mut query: Query<Vec<u32>> = Query::new("numbers", cache.clone());
    let (tx, fetch) = gated();
    query.request(page(1), fetch);
    query.disable();
    let _ = tx.send(Ok(vec![99]));
    tokio::task::yield_now().await;

    let after = cache.get(&page(1)).unwrap();
    assert_eq!(after.data, before.data);
    assert_eq!(after.fetched_at, before.fetched_at);
    assert_eq!(after.error, before.error);
    assert_eq!(after.status, before.status);
  }

  #[tokio::test]
  async fn test_dropping_query_mid_fetch_restores_entry_status() {
    let cache = QueryCache::new();
    let key = QueryKey::new(vec![json!("numbers"), json!("7")]);
    let tx = {
      let mut query: Query<u32> = Query::new("numbers", cache.clone());
      let (tx, fetch) = gated();
      query.request(key.clone(), fetch);
      assert_eq!(cache.get(&key).unwrap().status, EntryStatus::Fetching);
      tx
    };

    tokio::task::yield_now().await;
    assert!(tx.is_closed());
    let entry = cache.get(&key).unwrap();
    assert_eq!(entry.status, EntryStatus::Idle);
    assert!(entry.data.is_none());

    // A later consumer of the key starts from a clean entry
    let mut query: Query<u32> = Query::new("numbers", cache.clone());
    let (_tx, fetch) = gated();
    query.request(key.clone(), fetch);
    query.disable();
    assert_eq!(cache.get(&key).unwrap().status, EntryStatus::Idle);
  }

  #[tokio::test]
  async fn test_keep_previous_data_while_fetching() {
    let mut query: Query<Vec<u32>> =
      Query::new("numbers", QueryCache::new()).keep_previous_data();

    query.request(page(1), ready(Ok(vec![1])));
    query.settle().await;

    let (tx, fetch) = gated();
    query.request(page(2), fetch);
    let snapshot = query.snapshot();
    assert_eq!(snapshot.data, Some(vec![1]));
    assert!(snapshot.is_previous_data);
    assert!(snapshot.is_fetching());
    assert!(snapshot.is_success());

    tx.send(Ok(vec![2])).unwrap();
    query.settle().await;
    let snapshot = query.snapshot();
    assert_eq!(snapshot.data, Some(vec![2]));
    assert!(!snapshot.is_previous_data);
  }

  #[tokio::test]
  async fn test_without_keep_previous_data_new_key_is_loading() {
    let mut query: Query<Vec<u32>> = Query::new("numbers", QueryCache::new());
    query.request(page(1), ready(Ok(vec![1])));
    query.settle().await;

    let (_tx, fetch) = gated();
    query.request(page(2), fetch);
    let snapshot = query.snapshot();
    assert!(snapshot.data.is_none());
    assert!(snapshot.is_loading());
    assert!(!snapshot.is_previous_data);
  }

  #[tokio::test]
  async fn test_cached_key_is_served_while_revalidating() {
    let mut query: Query<Vec<u32>> =
      Query::new("numbers", QueryCache::new()).keep_previous_data();
    query.request(page(1), ready(Ok(vec![1])));
    query.settle().await;
    query.request(page(2), ready(Ok(vec![2])));
    query.settle().await;

    let (_tx, fetch) = gated();
    assert!(query.request(page(1), fetch));
    let snapshot = query.snapshot();
    assert_eq!(snapshot.data, Some(vec![1]));
    assert!(!snapshot.is_previous_data);
    assert!(snapshot.is_fetching());
  }

  #[tokio::test]
  async fn test_fresh_data_is_not_refetched() {
    let mut query: Query<Vec<u32>> =
      Query::new("numbers", QueryCache::new()).with_stale_time(Duration::minutes(5));
    query.request(page(1), ready(Ok(vec![1])));
    query.settle().await;
    query.request(page(2), ready(Ok(vec![2])));
    query.settle().await;

    assert!(!query.request(page(1), ready(Ok(vec![100]))));
    let snapshot = query.snapshot();
    assert_eq!(snapshot.data, Some(vec![1]));
    assert!(!snapshot.is_fetching());
  }

  #[tokio::test]
  async fn test_error_keeps_previous_data_visible() {
    let mut query: Query<Vec<u32>> =
      Query::new("numbers", QueryCache::new()).keep_previous_data();
    query.request(page(1), ready(Ok(vec![1])));
    query.settle().await;

    query.request(
      page(2),
      ready(Err(QueryError::Network("offline".to_string()))),
    );
    query.settle().await;

    let snapshot = query.snapshot();
    assert!(snapshot.is_error());
    assert_eq!(snapshot.data, Some(vec![1]));
  }

  #[tokio::test]
  async fn test_refetch_replaces_pending_request() {
    let cache = QueryCache::new();
    let mut query: Query<u32> = Query::new("numbers", cache.clone());
    let (tx1, fetch1) = gated();
    let (tx2, fetch2) = gated();

    query.request(page(1), fetch1);
    assert!(query.refetch(fetch2));

    let _ = tx1.send(Ok(1));
    tx2.send(Ok(2)).unwrap();
    query.settle().await;
    assert_eq!(query.snapshot().data, Some(2));
    assert_eq!(cache.get(&page(1)).unwrap().data, Some(json!(2)));
  }

  #[tokio::test]
  async fn test_refetch_when_disabled_is_noop() {
    let mut query: Query<u32> = Query::new("numbers", QueryCache::new());
    assert!(!query.refetch(ready(Ok(1))));
    assert!(!query.snapshot().is_fetching());
  }

  #[tokio::test]
  async fn test_disable_returns_to_pre_activation() {
    let mut query: Query<u32> = Query::new("numbers", QueryCache::new());
    query.request(page(1), ready(Ok(1)));
    query.settle().await;

    query.disable();
    let snapshot = query.snapshot();
    assert!(!query.is_enabled());
    assert_eq!(query.snapshot().phase, QueryPhase::Idle);
    assert!(snapshot.is_pre_activation());
    assert!(!snapshot.is_error());
    assert!(snapshot.data.is_none());
  }

  #[tokio::test]
  async fn test_success_hook_runs_before_publish() {
    let cache = QueryCache::new();
    let saw_fetching = Arc::new(AtomicBool::new(false));
    let flag = saw_fetching.clone();
    let mut query: Query<u32> = Query::new("numbers", cache.clone()).on_success(move |cache, _| {
      let status = cache.get(&page(1)).map(|entry| entry.status);
      flag.store(status == Some(EntryStatus::Fetching), Ordering::SeqCst);
      cache.set(&QueryKey::new(vec![json!("derived")]), &true)
    });

    query.request(page(1), ready(Ok(5)));
    query.settle().await;

    assert!(saw_fetching.load(Ordering::SeqCst));
    assert!(cache.get(&QueryKey::new(vec![json!("derived")])).is_some());
  }

  #[tokio::test]
  async fn test_subscribers_are_notified() {
    let mut query: Query<u32> = Query::new("numbers", QueryCache::new());
    let mut rx = query.subscribe();

    query.request(page(1), ready(Ok(3)));
    assert!(rx.has_changed().unwrap());
    assert!(rx.borrow_and_update().is_fetching());

    query.settle().await;
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().data, Some(3));
  }
}
