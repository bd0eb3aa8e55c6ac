//! Live progress tracking for a server run
//!
//! Counters are bumped by workers with atomic increments and polled by the
//! presentation side; a snapshot may be slightly stale but is never torn.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Mutable progress counters for one server run
///
/// Reset (recreated) at the start of each run.
#[derive(Debug)]
pub struct ProgressState {
    total: u64,
    scanned: AtomicU64,
    with_data: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
    started: Instant,
}

impl ProgressState {
    /// Creates a fresh tracker for a run over `total` items
    pub fn new(total: u64) -> Self {
        Self {
            total,
            scanned: AtomicU64::new(0),
            with_data: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    /// Records a successfully fetched item; `has_data` marks a defined price
    pub fn record_item(&self, has_data: bool) {
        self.scanned.fetch_add(1, Ordering::Relaxed);
        if has_data {
            self.with_data.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records a skipped item
    pub fn record_skipped(&self) {
        self.scanned.fetch_add(1, Ordering::Relaxed);
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an item that exhausted its retries
    pub fn record_failed(&self) {
        self.scanned.fetch_add(1, Ordering::Relaxed);
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of items processed so far
    pub fn scanned(&self) -> u64 {
        self.scanned.load(Ordering::Relaxed)
    }

    /// Takes an eventually-consistent snapshot for display
    pub fn snapshot(&self, server: &str) -> ProgressSnapshot {
        let scanned = self.scanned.load(Ordering::Relaxed);
        let elapsed = self.started.elapsed();

        let eta = if scanned > 0 && scanned < self.total {
            let per_item = elapsed.as_secs_f64() / scanned as f64;
            let remaining = (self.total - scanned) as f64;
            Some(Duration::from_secs_f64(per_item * remaining))
        } else {
            None
        };

        ProgressSnapshot {
            server: server.to_string(),
            scanned,
            with_data: self.with_data.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            total: self.total,
            elapsed,
            eta,
        }
    }
}

/// A point-in-time view of run progress
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    /// Server the run belongs to ("overall" for cross-run aggregates)
    pub server: String,

    /// Items processed (recorded + skipped + failed)
    pub scanned: u64,

    /// Items that produced a record with a defined price
    pub with_data: u64,

    /// Items short-circuited or marked by the skip-cache
    pub skipped: u64,

    /// Items that exhausted their retries
    pub failed: u64,

    /// Items in the requested range
    pub total: u64,

    /// Time since the run started
    pub elapsed: Duration,

    /// Estimated remaining time (None before the first item or after the last)
    pub eta: Option<Duration>,
}

impl ProgressSnapshot {
    /// Processing rate in items per minute
    pub fn items_per_min(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.scanned as f64 / secs * 60.0
        } else {
            0.0
        }
    }
}
