//! Client-side query cache.
//!
//! This module provides a domain-agnostic cache that:
//! - Keys entries by a composite, serializable `QueryKey`
//! - Keeps one entry per key with data, fetch timestamp, status and error
//! - Keeps data visible while refetching and after errors
//! - Can seed single-entity entries from list results

mod key;
pub(crate) mod store;
mod traits;

pub use key::QueryKey;
pub use store::{EntryStatus, QueryCache};
pub use traits::{entity_query_key, Cacheable};
