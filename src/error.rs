//! Error types for query and API operations.

/// Errors that can occur while fetching data for a query.
///
/// Errors are `Clone` because they are stored in cache entries and query
/// snapshots, which are handed out as copies.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
  /// The request never produced a response (connection, DNS, timeout).
  #[error("{0}")]
  Network(String),

  /// The server answered with a non-2xx status.
  #[error("{message}")]
  Http {
    /// HTTP status code.
    status: u16,
    /// Message taken from the error body, or the status line.
    message: String,
  },

  /// The request was superseded by a newer one and aborted.
  ///
  /// This never reaches a snapshot or the cache.
  #[error("request was cancelled")]
  Cancelled,

  /// The response body could not be decoded into the expected shape.
  #[error("malformed response: {0}")]
  MalformedResponse(String),
}

impl QueryError {
  pub fn is_cancelled(&self) -> bool {
    matches!(self, QueryError::Cancelled)
  }
}

impl From<reqwest::Error> for QueryError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_decode() {
      QueryError::MalformedResponse(err.to_string())
    } else if let Some(status) = err.status() {
      QueryError::Http {
        status: status.as_u16(),
        message: err.to_string(),
      }
    } else {
      QueryError::Network(err.to_string())
    }
  }
}

impl From<serde_json::Error> for QueryError {
  fn from(err: serde_json::Error) -> Self {
    QueryError::MalformedResponse(err.to_string())
  }
}

/// Result type for query operations.
pub type QueryResult<T> = std::result::Result<T, QueryError>;
