//! Source client for the remote auction-listing site
//!
//! The scrape engine only depends on the [`SourceClient`] trait; the HTTP
//! and HTML-parsing details live behind it and are swappable (tests use
//! in-memory fakes).

mod http;
mod parse;

pub use http::{build_http_client, HttpSourceClient};
pub use parse::{parse_item_page, parse_stack_page, ParsedItemPage, ParsedStackPage};

use crate::config::ServerEntry;
use crate::model::ItemRecord;
use async_trait::async_trait;
use thiserror::Error;

/// Typed failure from a single item fetch
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Network error, 5xx, rate-limit response: worth retrying
    #[error("transient fetch failure: {0}")]
    Transient(String),

    /// The item cannot be listed on the auction house (Exclusive / No
    /// Auction / No Sale); definitive, never retried
    #[error("item '{name}' is not sellable on the auction house")]
    NotSellable { name: String },

    /// The source has no item with this ID; definitive, never retried
    #[error("item does not exist")]
    NotFound,

    /// Response arrived but could not be interpreted; retried, since the
    /// source occasionally serves truncated pages
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Whether the worker retry policy applies to this failure
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Transient(_) | FetchError::Malformed(_))
    }
}

/// Fetches one item's market record from the listing source
///
/// Implementations must be safe to share across the worker pool.
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Fetches and normalizes the record for `item_id` on `server`
    async fn fetch_item(&self, item_id: u32, server: &ServerEntry)
        -> Result<ItemRecord, FetchError>;
}
