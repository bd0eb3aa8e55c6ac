//! Event stream from the scrape engine to the presentation layer
//!
//! Workers publish events onto an mpsc channel; a single consumer loop in
//! the orchestrator forwards them to the configured sink. Events arrive in
//! completion order, not item-ID order.

use crate::model::ItemRecord;
use crate::scrape::progress::ProgressSnapshot;

/// One observable occurrence during a scrape
#[derive(Debug, Clone)]
pub enum ScrapeEvent {
    /// A record was fetched and normalized
    Record {
        server: String,
        record: ItemRecord,
    },

    /// An item was skipped (cache hit or newly marked unsellable/nonexistent)
    Skipped {
        server: String,
        item_id: u32,
        reason: String,
    },

    /// An item exhausted its retries
    Failed {
        server: String,
        item_id: u32,
        error: String,
    },

    /// A periodic progress snapshot
    Progress(ProgressSnapshot),
}

/// Terminal status of a server run (or of the whole scrape)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The full ID range was drained
    Completed,

    /// A stop was requested; the result set is a partial subset
    Cancelled,

    /// Consecutive total failures exceeded the threshold
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStatus::Completed => "completed",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl RunStatus {
    /// Combines per-server statuses into an overall status
    ///
    /// Failed dominates Cancelled, which dominates Completed.
    pub fn combine(statuses: impl IntoIterator<Item = RunStatus>) -> RunStatus {
        let mut overall = RunStatus::Completed;
        for status in statuses {
            overall = match (overall, status) {
                (_, RunStatus::Failed) | (RunStatus::Failed, _) => RunStatus::Failed,
                (_, RunStatus::Cancelled) | (RunStatus::Cancelled, _) => RunStatus::Cancelled,
                _ => RunStatus::Completed,
            };
        }
        overall
    }
}
