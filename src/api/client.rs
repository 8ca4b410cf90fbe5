use crate::config::ApiConfig;
use crate::error::{QueryError, QueryResult};
use color_eyre::{eyre::eyre, Result};
use futures::future::{BoxFuture, FutureExt};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::cache::IssueFilter;
use super::types::{Issue, SearchResults};

/// Source of issue data for the query controllers.
///
/// Returned futures own everything they need, so they can be spawned and
/// aborted independently of the source.
pub trait IssueSource: Send + Sync + 'static {
  /// One page of the filtered issue list
  fn list_issues(&self, filter: &IssueFilter) -> BoxFuture<'static, QueryResult<Vec<Issue>>>;

  /// Full-text search
  fn search_issues(&self, term: &str) -> BoxFuture<'static, QueryResult<SearchResults>>;

  /// A single issue by number
  fn get_issue(&self, number: u64) -> BoxFuture<'static, QueryResult<Issue>>;
}

/// HTTP client for the issues API
#[derive(Clone)]
pub struct IssuesClient {
  http: reqwest::Client,
  base_url: Url,
}

impl IssuesClient {
  pub fn new(config: &ApiConfig) -> Result<Self> {
    let mut base_url = Url::parse(&config.base_url)
      .map_err(|e| eyre!("Invalid API base URL {}: {}", config.base_url, e))?;

    // Endpoints are joined relative to the base, keep any path prefix
    if !base_url.path().ends_with('/') {
      let path = format!("{}/", base_url.path());
      base_url.set_path(&path);
    }

    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, base_url })
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  fn endpoint(&self, path: &str) -> QueryResult<Url> {
    self
      .base_url
      .join(path)
      .map_err(|e| QueryError::Network(format!("Invalid endpoint {}: {}", path, e)))
  }

  /// `api/issues?labels[]=..&status=..&page=..`
  pub fn list_url(&self, filter: &IssueFilter) -> QueryResult<Url> {
    let mut url = self.endpoint("api/issues")?;
    {
      let mut pairs = url.query_pairs_mut();
      for label in &filter.labels {
        pairs.append_pair("labels[]", label);
      }
      if let Some(status) = filter.status.as_deref().filter(|s| !s.is_empty()) {
        pairs.append_pair("status", status);
      }
      if filter.page_num > 0 {
        pairs.append_pair("page", &filter.page_num.to_string());
      }
    }
    if url.query() == Some("") {
      url.set_query(None);
    }
    Ok(url)
  }

  /// `api/search/issues?q=..`
  pub fn search_url(&self, term: &str) -> QueryResult<Url> {
    let mut url = self.endpoint("api/search/issues")?;
    url.query_pairs_mut().append_pair("q", term);
    Ok(url)
  }

  /// `api/issues/{number}`
  pub fn issue_url(&self, number: u64) -> QueryResult<Url> {
    self.endpoint(&format!("api/issues/{}", number))
  }

  /// GET `url` and decode the JSON body.
  ///
  /// Non-2xx responses become `QueryError::Http` carrying the server's error
  /// message when the body has one; undecodable bodies become
  /// `QueryError::MalformedResponse`.
  pub async fn get_json<T: DeserializeOwned>(&self, url: Url) -> QueryResult<T> {
    debug!(url = %url, "GET");

    let response = self.http.get(url).send().await?;
    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
      return Err(QueryError::Http {
        status: status.as_u16(),
        message: error_message(status, &body),
      });
    }

    Ok(serde_json::from_slice(&body)?)
  }

  fn spawn_get<T>(&self, url: QueryResult<Url>) -> BoxFuture<'static, QueryResult<T>>
  where
    T: DeserializeOwned + Send + 'static,
  {
    let client = self.clone();
    async move { client.get_json(url?).await }.boxed()
  }
}

impl IssueSource for IssuesClient {
  fn list_issues(&self, filter: &IssueFilter) -> BoxFuture<'static, QueryResult<Vec<Issue>>> {
    self.spawn_get(self.list_url(filter))
  }

  fn search_issues(&self, term: &str) -> BoxFuture<'static, QueryResult<SearchResults>> {
    self.spawn_get(self.search_url(term))
  }

  fn get_issue(&self, number: u64) -> BoxFuture<'static, QueryResult<Issue>> {
    self.spawn_get(self.issue_url(number))
  }
}

/// Extract a readable message from an error response body.
fn error_message(status: StatusCode, body: &[u8]) -> String {
  let parsed: Option<Value> = serde_json::from_slice(body).ok();

  parsed
    .as_ref()
    .and_then(|v| {
      v.pointer("/error/message")
        .or_else(|| v.get("message"))
        .or_else(|| v.get("error"))
    })
    .and_then(Value::as_str)
    .map(String::from)
    .unwrap_or_else(|| format!("Request failed with status {}", status))
}
