//! Presentation-side interfaces

use crate::scrape::ScrapeEvent;
use thiserror::Error;

/// Errors from writing result files
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Receives engine events in completion order
///
/// Implementations must be cheap and non-blocking; the single consumer loop
/// calls them inline between channel reads.
pub trait EventSink: Send + Sync {
    fn on_event(&self, event: &ScrapeEvent);
}
