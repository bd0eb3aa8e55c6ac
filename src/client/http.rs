//! HTTP source client for the auction-listing site
//!
//! Mirrors the site's access pattern: a POST to the item page with the
//! server ID as form data selects the active server, and a separate GET on
//! the "?stack=1" page fetches the stack variant for stackable items.

use crate::client::parse::{parse_item_page, parse_stack_page};
use crate::client::{FetchError, SourceClient};
use crate::config::{ServerEntry, SourceConfig};
use crate::model::ItemRecord;
use crate::scrape::RateLimiter;
use crate::MinerError;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Builds an HTTP client with the configured identity and timeouts
pub fn build_http_client(config: &SourceConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Source client backed by the real listing site
pub struct HttpSourceClient {
    client: Client,
    base_url: Url,
    limiter: Option<Arc<RateLimiter>>,
}

impl HttpSourceClient {
    /// Creates a client from the source configuration
    pub fn new(config: &SourceConfig) -> Result<Self, MinerError> {
        let base_url = Url::parse(&config.base_url)?;
        let client = build_http_client(config)?;

        Ok(Self {
            client,
            base_url,
            limiter: None,
        })
    }

    /// Paces the extra stack-variant request on the shared limiter
    ///
    /// The engine already holds a grant for the item fetch itself; this
    /// keeps the second request of stackable items under the same ceiling.
    pub fn with_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Fetches and parses the stack-variant page
    ///
    /// Failures here degrade the record (no stack fields) rather than
    /// failing the whole item, matching the site's flaky stack pages.
    async fn fetch_stack(
        &self,
        item_id: u32,
        stack_path: &str,
    ) -> Option<(u32, Option<u32>, Option<f64>)> {
        let stack_url = match self.base_url.join(stack_path) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Bad stack link for item {}: {}", item_id, e);
                return None;
            }
        };

        if let Some(limiter) = &self.limiter {
            limiter.acquire().await;
        }

        let response = match self.client.get(stack_url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Stack fetch failed for item {}: {}", item_id, e);
                return None;
            }
        };

        if !response.status().is_success() {
            return None;
        }

        let body = response.text().await.ok()?;
        let stack = parse_stack_page(&body);

        // Without a size badge the stack size is unknown; drop the stack
        // data rather than invent one.
        if stack.stack_size == 0 {
            return None;
        }

        Some((stack.stack_size, stack.price, stack.sold_per_day))
    }
}

#[async_trait]
impl SourceClient for HttpSourceClient {
    async fn fetch_item(
        &self,
        item_id: u32,
        server: &ServerEntry,
    ) -> Result<ItemRecord, FetchError> {
        let url = self
            .base_url
            .join(&format!("item/{}", item_id))
            .map_err(|e| FetchError::Malformed(format!("bad item URL: {}", e)))?;

        // POSTing the server ID selects the active server for the page
        let response = self
            .client
            .post(url)
            .form(&[("sid", server.sid.to_string())])
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::Transient("rate limited by source".to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::Transient(format!("HTTP {}", status.as_u16())));
        }

        let body = response.text().await.map_err(classify_request_error)?;
        let page = parse_item_page(&body);

        // A page without an item name is the site's rendering of a
        // nonexistent item ID.
        let name = match page.name {
            Some(name) => name,
            None => return Err(FetchError::NotFound),
        };

        if !page.sellable {
            return Err(FetchError::NotSellable { name });
        }

        let mut stack_size = page.stack_size;
        let mut stack_price = None;
        let mut stack_sold_per_day = None;

        if stack_size == 0 {
            if let Some(stack_path) = page.stack_path.as_deref() {
                if let Some((size, price, spd)) = self.fetch_stack(item_id, stack_path).await {
                    stack_size = size;
                    stack_price = price;
                    stack_sold_per_day = spd;
                }
            }
        }

        Ok(ItemRecord {
            item_id,
            name,
            price: page.price,
            stack_price,
            sold_per_day: page.sold_per_day,
            stack_sold_per_day,
            category: page.category,
            stack_size,
            server: server.name.clone(),
        }
        .normalized())
    }
}

/// Classifies reqwest errors into the fetch taxonomy
fn classify_request_error(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Transient("request timeout".to_string())
    } else if error.is_connect() {
        FetchError::Transient("connection failed".to_string())
    } else if error.is_decode() {
        FetchError::Malformed(error.to_string())
    } else {
        FetchError::Transient(error.to_string())
    }
}
