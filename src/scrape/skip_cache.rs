//! Shared skip-cache of items known not to be worth fetching
//!
//! The cache is consulted before every network request and is the main
//! difference between a cold run and a warm run over the same ID range. It
//! is shared read/write across all workers and persisted between runs via
//! the [`crate::storage::SkipStore`] collaborator.

use crate::model::{SkipEntry, SkipReason};
use std::collections::HashMap;
use std::sync::Mutex;

/// Thread-safe map from item ID to "known unsellable / nonexistent"
///
/// Entries are monotonic: the engine only ever adds or enriches them, never
/// removes them. Marking an already-marked item merges the reason strings
/// and upgrades a placeholder "Unknown" name when a real one arrives.
#[derive(Debug, Default)]
pub struct SkipCache {
    entries: Mutex<HashMap<u32, SkipEntry>>,
}

impl SkipCache {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache pre-populated from persisted entries
    pub fn from_entries(entries: Vec<SkipEntry>) -> Self {
        let map = entries.into_iter().map(|e| (e.item_id, e)).collect();
        Self {
            entries: Mutex::new(map),
        }
    }

    /// Whether fetching this item should be short-circuited
    pub fn is_skippable(&self, item_id: u32) -> bool {
        self.entries
            .lock()
            .expect("skip cache poisoned")
            .contains_key(&item_id)
    }

    /// The recorded reason for a skippable item, if any
    pub fn skip_reason(&self, item_id: u32) -> Option<String> {
        self.entries
            .lock()
            .expect("skip cache poisoned")
            .get(&item_id)
            .map(|e| e.reason.clone())
    }

    /// Marks an item as not worth fetching again
    ///
    /// Idempotent beyond reason retention: re-marking merges the new reason
    /// into the existing "; "-separated list rather than duplicating it.
    pub fn mark_skippable(&self, item_id: u32, name: &str, reason: SkipReason) {
        let mut entries = self.entries.lock().expect("skip cache poisoned");

        match entries.get_mut(&item_id) {
            Some(entry) => {
                if entry.name == "Unknown" && name != "Unknown" {
                    entry.name = name.to_string();
                }
                let reason = reason.as_str();
                let already = entry.reason.split(';').any(|p| p.trim() == reason);
                if !already {
                    if entry.reason.is_empty() {
                        entry.reason = reason.to_string();
                    } else {
                        entry.reason.push_str("; ");
                        entry.reason.push_str(reason);
                    }
                }
            }
            None => {
                entries.insert(item_id, SkipEntry::new(item_id, name, reason));
            }
        }
    }

    /// Snapshot of all entries, sorted by item ID, for persistence
    pub fn snapshot(&self) -> Vec<SkipEntry> {
        let entries = self.entries.lock().expect("skip cache poisoned");
        let mut all: Vec<SkipEntry> = entries.values().cloned().collect();
        all.sort_by_key(|e| e.item_id);
        all
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.lock().expect("skip cache poisoned").len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
