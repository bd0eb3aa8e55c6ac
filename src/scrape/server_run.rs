//! One server's pass over the configured ID range
//!
//! A server run wires a worker pool to a fresh ID range and progress tracker
//! for a single server, and carries the pieces a run needs but does not own
//! (client, limiter, skip-cache) as shared handles.

use crate::client::SourceClient;
use crate::config::{ScrapeConfig, ServerEntry};
use crate::model::ItemRecord;
use crate::scrape::events::{RunStatus, ScrapeEvent};
use crate::scrape::policy::RetryPolicy;
use crate::scrape::progress::ProgressState;
use crate::scrape::rate_limit::RateLimiter;
use crate::scrape::skip_cache::SkipCache;
use crate::scrape::worker::{CancelHandle, IdRange, WorkerPool};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Everything produced by one server's pass over the range
#[derive(Debug)]
pub struct ServerRunResult {
    pub server: ServerEntry,
    pub records: HashMap<u32, ItemRecord>,
    pub status: RunStatus,
}

/// Executes the configured ID range against a single server
pub struct ServerRun {
    server: ServerEntry,
    from_id: u32,
    to_id: u32,
    pool: WorkerPool,
}

impl ServerRun {
    pub fn new(
        server: ServerEntry,
        config: &ScrapeConfig,
        client: Arc<dyn SourceClient>,
        limiter: Arc<RateLimiter>,
        skip_cache: Arc<SkipCache>,
    ) -> Self {
        let pool = WorkerPool::new(
            client,
            limiter,
            skip_cache,
            RetryPolicy::from_config(config),
            config.thread_count as usize,
            config.failure_threshold,
        );

        Self {
            server,
            from_id: config.from_id,
            to_id: config.to_id,
            pool,
        }
    }

    /// Runs the scrape to completion (or cancellation / abort)
    pub async fn execute(
        self,
        events: UnboundedSender<ScrapeEvent>,
        cancel: CancelHandle,
    ) -> ServerRunResult {
        let total = u64::from(self.to_id) - u64::from(self.from_id) + 1;
        let range = Arc::new(IdRange::new(self.from_id, self.to_id));
        let progress = Arc::new(ProgressState::new(total));

        tracing::info!(
            "Starting run on {}: items {}..={}",
            self.server.name,
            self.from_id,
            self.to_id
        );

        let (records, status) = self
            .pool
            .run(
                self.server.clone(),
                range,
                Arc::clone(&progress),
                events.clone(),
                cancel,
            )
            .await;

        // Final snapshot so the sink always sees the terminal counts.
        let _ = events.send(ScrapeEvent::Progress(progress.snapshot(&self.server.name)));

        tracing::info!(
            "Run on {} {}: {} records",
            self.server.name,
            status,
            records.len()
        );

        ServerRunResult {
            server: self.server,
            records,
            status,
        }
    }
}
