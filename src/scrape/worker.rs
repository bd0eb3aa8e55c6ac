//! Fetch workers and the per-server worker pool
//!
//! A fixed number of workers pull item IDs from a shared exhaustible range,
//! short-circuit through the skip-cache, pace themselves on the shared rate
//! limiter, and apply the retry policy to transient failures. Results land
//! in a shared map; everything observable goes out as [`ScrapeEvent`]s.

use crate::client::{FetchError, SourceClient};
use crate::config::ServerEntry;
use crate::model::{ItemRecord, SkipReason};
use crate::scrape::events::{RunStatus, ScrapeEvent};
use crate::scrape::policy::RetryPolicy;
use crate::scrape::progress::ProgressState;
use crate::scrape::rate_limit::RateLimiter;
use crate::scrape::skip_cache::SkipCache;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedSender;

/// A shared, exhaustible range of item IDs
///
/// Workers claim IDs with an atomic counter; each ID in `[from, to]` is
/// handed out exactly once.
#[derive(Debug)]
pub struct IdRange {
    next: AtomicU64,
    end: u64,
}

impl IdRange {
    /// Creates a range over `[from, to]` inclusive
    pub fn new(from: u32, to: u32) -> Self {
        Self {
            next: AtomicU64::new(u64::from(from)),
            end: u64::from(to),
        }
    }

    /// Claims the next unprocessed ID, or `None` when the range is drained
    pub fn claim(&self) -> Option<u32> {
        let id = self.next.fetch_add(1, Ordering::SeqCst);
        if id > self.end {
            None
        } else {
            Some(id as u32)
        }
    }
}

/// Cooperative cancellation signal shared by every worker in a scrape
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that all workers stop claiming new IDs
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Owns a fixed number of fetch workers for one server run
pub struct WorkerPool {
    client: Arc<dyn SourceClient>,
    limiter: Arc<RateLimiter>,
    skip_cache: Arc<SkipCache>,
    policy: RetryPolicy,
    worker_count: usize,
    failure_threshold: u32,
}

/// Shared state threaded through every worker of one pool run
struct WorkerContext {
    client: Arc<dyn SourceClient>,
    limiter: Arc<RateLimiter>,
    skip_cache: Arc<SkipCache>,
    policy: RetryPolicy,
    server: ServerEntry,
    range: Arc<IdRange>,
    results: Arc<Mutex<HashMap<u32, ItemRecord>>>,
    progress: Arc<ProgressState>,
    events: UnboundedSender<ScrapeEvent>,
    cancel: CancelHandle,
    consecutive_failures: Arc<AtomicU32>,
    failure_threshold: u32,
    run_failed: Arc<AtomicBool>,
}

impl WorkerPool {
    pub fn new(
        client: Arc<dyn SourceClient>,
        limiter: Arc<RateLimiter>,
        skip_cache: Arc<SkipCache>,
        policy: RetryPolicy,
        worker_count: usize,
        failure_threshold: u32,
    ) -> Self {
        Self {
            client,
            limiter,
            skip_cache,
            policy,
            worker_count,
            failure_threshold,
        }
    }

    /// Drains the ID range with the pool's workers
    ///
    /// Blocks until the range is exhausted and every in-flight fetch
    /// (including retries) has resolved, then returns the accumulated
    /// record set and the terminal status. On cancellation workers stop
    /// claiming new IDs promptly and in-flight fetches finish under the
    /// client's own timeout.
    pub async fn run(
        &self,
        server: ServerEntry,
        range: Arc<IdRange>,
        progress: Arc<ProgressState>,
        events: UnboundedSender<ScrapeEvent>,
        cancel: CancelHandle,
    ) -> (HashMap<u32, ItemRecord>, RunStatus) {
        let run_failed = Arc::new(AtomicBool::new(false));
        let results = Arc::new(Mutex::new(HashMap::new()));

        let context = Arc::new(WorkerContext {
            client: Arc::clone(&self.client),
            limiter: Arc::clone(&self.limiter),
            skip_cache: Arc::clone(&self.skip_cache),
            policy: self.policy,
            server,
            range,
            results: Arc::clone(&results),
            progress,
            events,
            cancel: cancel.clone(),
            consecutive_failures: Arc::new(AtomicU32::new(0)),
            failure_threshold: self.failure_threshold,
            run_failed: Arc::clone(&run_failed),
        });

        let mut handles = Vec::with_capacity(self.worker_count);
        for _ in 0..self.worker_count {
            let context = Arc::clone(&context);
            handles.push(tokio::spawn(worker_loop(context)));
        }
        for handle in handles {
            // Worker tasks never panic in normal operation; a panic here
            // still lets the remaining workers drain the range.
            let _ = handle.await;
        }

        let records = std::mem::take(&mut *results.lock().expect("results poisoned"));

        let status = if run_failed.load(Ordering::SeqCst) {
            RunStatus::Failed
        } else if cancel.is_cancelled() {
            RunStatus::Cancelled
        } else {
            RunStatus::Completed
        };

        (records, status)
    }
}

/// Outcome of one item's fetch-with-retry cycle
enum FetchOutcome {
    Record(ItemRecord),
    Skip { name: String, reason: SkipReason },
    Failed(FetchError),
    /// Retries were cut short by cancellation; says nothing about the source
    Interrupted(FetchError),
}

/// Main loop of a single fetch worker
async fn worker_loop(ctx: Arc<WorkerContext>) {
    while !ctx.cancel.is_cancelled() {
        let item_id = match ctx.range.claim() {
            Some(id) => id,
            None => break,
        };

        // Skip-cache short-circuit: no token, no network request.
        if let Some(reason) = ctx.skip_cache.skip_reason(item_id) {
            ctx.progress.record_skipped();
            let _ = ctx.events.send(ScrapeEvent::Skipped {
                server: ctx.server.name.clone(),
                item_id,
                reason,
            });
            emit_progress(&ctx);
            continue;
        }

        match fetch_with_retry(&ctx, item_id).await {
            FetchOutcome::Record(record) => {
                ctx.consecutive_failures.store(0, Ordering::Relaxed);
                ctx.progress.record_item(record.has_price());
                ctx.results
                    .lock()
                    .expect("results poisoned")
                    .insert(item_id, record.clone());
                let _ = ctx.events.send(ScrapeEvent::Record {
                    server: ctx.server.name.clone(),
                    record,
                });
            }

            FetchOutcome::Skip { name, reason } => {
                ctx.consecutive_failures.store(0, Ordering::Relaxed);
                ctx.skip_cache.mark_skippable(item_id, &name, reason);
                ctx.progress.record_skipped();
                let _ = ctx.events.send(ScrapeEvent::Skipped {
                    server: ctx.server.name.clone(),
                    item_id,
                    reason: reason.as_str().to_string(),
                });
            }

            FetchOutcome::Failed(error) => {
                // A transient failure is not evidence of unsellability, so
                // the skip-cache is left untouched.
                ctx.progress.record_failed();
                let _ = ctx.events.send(ScrapeEvent::Failed {
                    server: ctx.server.name.clone(),
                    item_id,
                    error: error.to_string(),
                });

                let streak = ctx.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
                if streak >= ctx.failure_threshold {
                    tracing::error!(
                        "Aborting run on {}: {} consecutive fetch failures",
                        ctx.server.name,
                        streak
                    );
                    ctx.run_failed.store(true, Ordering::SeqCst);
                    ctx.cancel.cancel();
                }
            }

            FetchOutcome::Interrupted(error) => {
                // The stop request ended the retries, not the source, so the
                // failure streak is left alone.
                ctx.progress.record_failed();
                let _ = ctx.events.send(ScrapeEvent::Failed {
                    server: ctx.server.name.clone(),
                    item_id,
                    error: error.to_string(),
                });
            }
        }

        emit_progress(&ctx);
    }
}

/// Fetches one item, applying the retry policy to retryable failures
async fn fetch_with_retry(ctx: &WorkerContext, item_id: u32) -> FetchOutcome {
    let mut attempt = 0u32;

    loop {
        ctx.limiter.acquire().await;

        match ctx.client.fetch_item(item_id, &ctx.server).await {
            Ok(record) => return FetchOutcome::Record(record),

            Err(error) if !error.is_retryable() => {
                return match error {
                    FetchError::NotSellable { name } => FetchOutcome::Skip {
                        name,
                        reason: SkipReason::NotSellable,
                    },
                    FetchError::NotFound => FetchOutcome::Skip {
                        name: "Unknown".to_string(),
                        reason: SkipReason::Nonexistent,
                    },
                    other => FetchOutcome::Failed(other),
                };
            }

            Err(error) => {
                attempt += 1;
                if attempt >= ctx.policy.max_attempts {
                    return FetchOutcome::Failed(error);
                }
                if ctx.cancel.is_cancelled() {
                    return FetchOutcome::Interrupted(error);
                }

                tracing::debug!(
                    "Retry {}/{} for item {} on {}: {}",
                    attempt,
                    ctx.policy.max_attempts - 1,
                    item_id,
                    ctx.server.name,
                    error
                );
                tokio::time::sleep(ctx.policy.backoff(attempt - 1)).await;
            }
        }
    }
}

/// Emits a progress snapshot every 10 processed items
fn emit_progress(ctx: &WorkerContext) {
    if ctx.progress.scanned() % 10 == 0 {
        let _ = ctx
            .events
            .send(ScrapeEvent::Progress(ctx.progress.snapshot(&ctx.server.name)));
    }
}
