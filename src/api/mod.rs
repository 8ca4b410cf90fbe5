//! Issues API: data types, query keys and the HTTP client.

mod cache;
mod client;
mod types;

pub use cache::{IssueFilter, IssueQueryKey};
pub use client::{IssueSource, IssuesClient};
pub use types::{Issue, SearchResults};
