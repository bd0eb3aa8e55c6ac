//! Console sink: renders engine events as log lines

use super::EventSink;
use crate::scrape::{ProgressSnapshot, ScrapeEvent};
use std::time::Duration;

/// Sink that writes each event through the `tracing` subscriber
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for ConsoleSink {
    fn on_event(&self, event: &ScrapeEvent) {
        match event {
            ScrapeEvent::Record { server, record } => match record.price {
                Some(price) => tracing::info!(
                    "[{}] {} ({}): {}g",
                    server,
                    record.name,
                    record.item_id,
                    price
                ),
                None => tracing::info!(
                    "[{}] {} ({}): no listings",
                    server,
                    record.name,
                    record.item_id
                ),
            },

            ScrapeEvent::Skipped {
                server,
                item_id,
                reason,
            } => {
                tracing::debug!("[{}] Skipped item {}: {}", server, item_id, reason);
            }

            ScrapeEvent::Failed {
                server,
                item_id,
                error,
            } => {
                tracing::warn!("[{}] Failed item {}: {}", server, item_id, error);
            }

            ScrapeEvent::Progress(snapshot) => {
                tracing::info!("{}", format_progress(snapshot));
            }
        }
    }
}

/// One-line progress summary, e.g.
/// `[Asura] 120/1000 (12.0%) | 45 with data, 60 skipped, 0 failed | 310 items/min | ETA 2m50s`
pub fn format_progress(snapshot: &ProgressSnapshot) -> String {
    let percent = if snapshot.total > 0 {
        snapshot.scanned as f64 / snapshot.total as f64 * 100.0
    } else {
        100.0
    };

    let eta = match snapshot.eta {
        Some(eta) => format!("ETA {}", format_duration(eta)),
        None => "ETA --".to_string(),
    };

    format!(
        "[{}] {}/{} ({:.1}%) | {} with data, {} skipped, {} failed | {:.0} items/min | {}",
        snapshot.server,
        snapshot.scanned,
        snapshot.total,
        percent,
        snapshot.with_data,
        snapshot.skipped,
        snapshot.failed,
        snapshot.items_per_min(),
        eta,
    )
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 3600 {
        format!("{}h{:02}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else {
        format!("{}s", secs)
    }
}
