//! The concurrent scrape engine
//!
//! Submodules are layered bottom-up: pacing and retry policy, the shared
//! skip-cache, progress counters, the worker pool, one server's run over the
//! range, cross-server aggregation, and the orchestrator tying them all
//! together.

pub mod aggregate;
pub mod events;
pub mod orchestrator;
pub mod policy;
pub mod progress;
pub mod rate_limit;
pub mod server_run;
pub mod skip_cache;
pub mod worker;

pub use aggregate::aggregate_servers;
pub use events::{RunStatus, ScrapeEvent};
pub use orchestrator::{ScrapeOrchestrator, ScrapeOutcome};
pub use policy::RetryPolicy;
pub use progress::{ProgressSnapshot, ProgressState};
pub use rate_limit::RateLimiter;
pub use server_run::{ServerRun, ServerRunResult};
pub use skip_cache::SkipCache;
pub use worker::{CancelHandle, IdRange, WorkerPool};
