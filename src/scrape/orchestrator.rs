//! Top-level coordination of a whole scrape
//!
//! The orchestrator resolves the server selection, loads the persisted
//! skip-cache, runs one server run per selected server (sequentially or
//! concurrently per configuration), funnels all events through a single
//! consumer loop into the sink, aggregates cross-server prices, and persists
//! the skip-cache back out.

use crate::config::{Config, MultiServerMode};
use crate::client::SourceClient;
use crate::model::CrossServerRow;
use crate::output::EventSink;
use crate::scrape::aggregate::aggregate_servers;
use crate::scrape::events::{RunStatus, ScrapeEvent};
use crate::scrape::progress::ProgressState;
use crate::scrape::rate_limit::RateLimiter;
use crate::scrape::server_run::{ServerRun, ServerRunResult};
use crate::scrape::skip_cache::SkipCache;
use crate::scrape::worker::CancelHandle;
use crate::storage::SkipStore;
use crate::{MinerError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Everything a finished scrape produced
#[derive(Debug)]
pub struct ScrapeOutcome {
    /// One result per executed server run, in execution order
    pub per_server: Vec<ServerRunResult>,

    /// Comparison rows (empty unless 2+ servers were selected)
    pub cross_server: Vec<CrossServerRow>,

    /// Combined terminal status across all runs
    pub status: RunStatus,
}

/// Coordinates server runs, event delivery, aggregation, and persistence
pub struct ScrapeOrchestrator {
    config: Config,
    client: Arc<dyn SourceClient>,
    store: Arc<dyn SkipStore>,
    sink: Arc<dyn EventSink>,
    limiter: Arc<RateLimiter>,
    cancel: CancelHandle,
}

impl ScrapeOrchestrator {
    pub fn new(
        config: Config,
        client: Arc<dyn SourceClient>,
        store: Arc<dyn SkipStore>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.scrape.rate_limit_per_sec));
        Self {
            config,
            client,
            store,
            sink,
            limiter,
            cancel: CancelHandle::new(),
        }
    }

    /// Replaces the request limiter with one shared more widely
    ///
    /// Used when the source client paces extra requests (stack variants) on
    /// the same limiter, so the ceiling covers every request it issues.
    pub fn with_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    /// Handle for requesting a graceful stop from outside the scrape
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Runs the full scrape and returns its outcome
    ///
    /// A `Failed` run status is reported in the outcome rather than as an
    /// error, so callers can still persist the partial results.
    pub async fn run(&self) -> Result<ScrapeOutcome> {
        let servers = self.config.selected_servers();
        if servers.is_empty() {
            return Err(MinerError::UnknownServer(self.config.scrape.server.clone()));
        }

        let skip_cache = Arc::new(SkipCache::from_entries(self.store.load()?));
        tracing::info!(
            "Loaded skip-cache: {} entries; scraping {} server(s)",
            skip_cache.len(),
            servers.len()
        );

        let limiter = Arc::clone(&self.limiter);

        let (tx, rx) = mpsc::unbounded_channel();
        let consumer = spawn_consumer(
            rx,
            Arc::clone(&self.sink),
            self.config.range_len() * servers.len() as u64,
            servers.len() > 1,
        );

        let per_server = match self.config.scrape.multi_server_mode {
            MultiServerMode::Sequential => {
                self.run_sequential(&servers, &limiter, &skip_cache, &tx).await
            }
            MultiServerMode::Concurrent => {
                self.run_concurrent(&servers, &limiter, &skip_cache, &tx).await
            }
        };

        // Closing the channel lets the consumer drain and exit.
        drop(tx);
        let _ = consumer.await;

        self.store.save(&skip_cache.snapshot())?;
        tracing::info!("Saved skip-cache: {} entries", skip_cache.len());

        let cross_server = if servers.len() >= 2 {
            let order: Vec<String> = servers.iter().map(|s| s.name.clone()).collect();
            let by_server: HashMap<_, _> = per_server
                .iter()
                .map(|r| (r.server.name.clone(), r.records.clone()))
                .collect();
            aggregate_servers(&order, &by_server)
        } else {
            Vec::new()
        };

        let status = RunStatus::combine(per_server.iter().map(|r| r.status));

        Ok(ScrapeOutcome {
            per_server,
            cross_server,
            status,
        })
    }

    async fn run_sequential(
        &self,
        servers: &[crate::config::ServerEntry],
        limiter: &Arc<RateLimiter>,
        skip_cache: &Arc<SkipCache>,
        tx: &mpsc::UnboundedSender<ScrapeEvent>,
    ) -> Vec<ServerRunResult> {
        let mut results = Vec::with_capacity(servers.len());

        for server in servers {
            if self.cancel.is_cancelled() {
                break;
            }

            let run = ServerRun::new(
                server.clone(),
                &self.config.scrape,
                Arc::clone(&self.client),
                Arc::clone(limiter),
                Arc::clone(skip_cache),
            );
            let result = run.execute(tx.clone(), self.cancel.clone()).await;
            let status = result.status;
            results.push(result);

            // An unreachable source fails every remaining run the same way.
            if status == RunStatus::Failed {
                tracing::warn!("Skipping remaining servers after failed run");
                break;
            }
        }

        results
    }

    async fn run_concurrent(
        &self,
        servers: &[crate::config::ServerEntry],
        limiter: &Arc<RateLimiter>,
        skip_cache: &Arc<SkipCache>,
        tx: &mpsc::UnboundedSender<ScrapeEvent>,
    ) -> Vec<ServerRunResult> {
        let mut handles = Vec::with_capacity(servers.len());

        for server in servers {
            let run = ServerRun::new(
                server.clone(),
                &self.config.scrape,
                Arc::clone(&self.client),
                Arc::clone(limiter),
                Arc::clone(skip_cache),
            );
            let tx = tx.clone();
            let cancel = self.cancel.clone();
            handles.push(tokio::spawn(async move { run.execute(tx, cancel).await }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            if let Ok(result) = handle.await {
                results.push(result);
            }
        }
        results
    }
}

/// Spawns the single consumer that forwards events to the sink
///
/// When more than one server is selected, the consumer also maintains an
/// "overall" progress tracker spanning every run and emits its snapshots to
/// the sink alongside the per-server ones.
fn spawn_consumer(
    mut rx: mpsc::UnboundedReceiver<ScrapeEvent>,
    sink: Arc<dyn EventSink>,
    overall_total: u64,
    track_overall: bool,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let overall = ProgressState::new(overall_total);

        while let Some(event) = rx.recv().await {
            if track_overall {
                match &event {
                    ScrapeEvent::Record { record, .. } => overall.record_item(record.has_price()),
                    ScrapeEvent::Skipped { .. } => overall.record_skipped(),
                    ScrapeEvent::Failed { .. } => overall.record_failed(),
                    ScrapeEvent::Progress(_) => {}
                }
            }

            sink.on_event(&event);

            if track_overall && overall.scanned() % 50 == 0 && overall.scanned() > 0 {
                if !matches!(event, ScrapeEvent::Progress(_)) {
                    sink.on_event(&ScrapeEvent::Progress(overall.snapshot("overall")));
                }
            }
        }
    })
}
