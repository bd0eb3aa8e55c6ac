//! JSON-file implementation of the skip store
//!
//! The on-disk shape is a single object keyed by item ID, so a warm cache is
//! easy to inspect and diff by hand:
//!
//! ```json
//! {
//!   "004096": { "itemid": 4096, "name": "Fire Crystal", "reason": "not sellable" }
//! }
//! ```

use super::{SkipStore, StoreError};
use crate::model::SkipEntry;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Skip store backed by a pretty-printed JSON file
#[derive(Debug, Clone)]
pub struct JsonSkipStore {
    path: PathBuf,
}

impl JsonSkipStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SkipStore for JsonSkipStore {
    fn load(&self) -> Result<Vec<SkipEntry>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let contents = std::fs::read_to_string(&self.path)?;
        let map: BTreeMap<String, SkipEntry> = serde_json::from_str(&contents)?;
        Ok(map.into_values().collect())
    }

    fn save(&self, entries: &[SkipEntry]) -> Result<(), StoreError> {
        // BTreeMap keys are zero-padded so lexicographic order matches
        // numeric item-ID order in the emitted file.
        let map: BTreeMap<String, &SkipEntry> = entries
            .iter()
            .map(|e| (format!("{:06}", e.item_id), e))
            .collect();

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(&map)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}
