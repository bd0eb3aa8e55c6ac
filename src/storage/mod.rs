//! Persistence for the skip-cache
//!
//! The engine talks to storage through the [`SkipStore`] trait so tests can
//! substitute an in-memory store; the shipped implementation is a JSON file.

mod json;

pub use json::JsonSkipStore;

use crate::model::SkipEntry;
use thiserror::Error;

/// Errors from loading or saving the skip-cache
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Durable home for skip-cache entries between runs
pub trait SkipStore: Send + Sync {
    /// Loads all persisted entries; a store that was never written is empty
    fn load(&self) -> Result<Vec<SkipEntry>, StoreError>;

    /// Replaces the persisted entries with `entries`
    fn save(&self, entries: &[SkipEntry]) -> Result<(), StoreError>;

    /// Removes all persisted entries
    fn clear(&self) -> Result<(), StoreError>;
}

/// In-memory store for tests and dry runs
#[derive(Debug, Default)]
pub struct MemorySkipStore {
    entries: std::sync::Mutex<Vec<SkipEntry>>,
}

impl MemorySkipStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Vec<SkipEntry>) -> Self {
        Self {
            entries: std::sync::Mutex::new(entries),
        }
    }
}

impl SkipStore for MemorySkipStore {
    fn load(&self) -> Result<Vec<SkipEntry>, StoreError> {
        Ok(self.entries.lock().expect("store poisoned").clone())
    }

    fn save(&self, entries: &[SkipEntry]) -> Result<(), StoreError> {
        *self.entries.lock().expect("store poisoned") = entries.to_vec();
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.entries.lock().expect("store poisoned").clear();
        Ok(())
    }
}
