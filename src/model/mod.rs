//! Data model for market records and cross-server comparisons
//!
//! # Components
//!
//! - `ItemRecord`: one normalized per-server market record
//! - `SkipEntry` / `SkipReason`: persisted knowledge that an item is not
//!   worth fetching again
//! - `CrossServerRow`: the per-item reduction across servers

mod comparison;
mod item;

// Re-export main types
pub use comparison::CrossServerRow;
pub use item::{ItemRecord, SkipEntry, SkipReason};
