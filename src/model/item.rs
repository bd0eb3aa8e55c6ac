use serde::{Deserialize, Serialize};

/// One normalized market record for an item on a single server
///
/// Created by a successful fetch and immutable once emitted. Optional price
/// fields are `None` when the auction house has no listings; the stack
/// variants are populated only for stackable items.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemRecord {
    /// Item ID (positive, unique per server)
    pub item_id: u32,

    /// Item name ("Unknown" when the fetch partially failed)
    pub name: String,

    /// Single-unit price in gil (`None` = no listings)
    pub price: Option<u32>,

    /// Stack price in gil (present only for stackable items)
    pub stack_price: Option<u32>,

    /// Single-unit sales per day
    pub sold_per_day: Option<f64>,

    /// Stack sales per day (present only for stackable items)
    pub stack_sold_per_day: Option<f64>,

    /// Category breadcrumb (may be "Unknown")
    pub category: String,

    /// Units per stack (0 = not stackable, else 12/99/...)
    pub stack_size: u32,

    /// Server this record was observed on
    pub server: String,
}

impl ItemRecord {
    /// Whether the item can be listed in stacks
    pub fn is_stackable(&self) -> bool {
        self.stack_size > 0
    }

    /// Whether the record carries at least one defined price
    pub fn has_price(&self) -> bool {
        self.price.is_some()
    }

    /// Drops stack fields when the item is not stackable
    ///
    /// Upholds the invariant that stack price/sales are present only when
    /// `stack_size > 0`, regardless of what the source page contained.
    pub fn normalized(mut self) -> Self {
        if self.stack_size == 0 {
            self.stack_price = None;
            self.stack_sold_per_day = None;
        }
        self
    }
}

/// Why an item was marked as not worth fetching again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Exclusive / No Auction / No Sale: cannot be listed
    NotSellable,

    /// The source has no item with this ID
    Nonexistent,
}

impl SkipReason {
    /// Stable string form, used in events and the skip-cache file
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::NotSellable => "not sellable",
            SkipReason::Nonexistent => "nonexistent",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted skip-cache entry
///
/// Entries are monotonically added and never removed by the engine; reasons
/// accumulate with "; " when an item is marked more than once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipEntry {
    #[serde(rename = "itemid")]
    pub item_id: u32,

    pub name: String,

    pub reason: String,
}

impl SkipEntry {
    pub fn new(item_id: u32, name: impl Into<String>, reason: SkipReason) -> Self {
        Self {
            item_id,
            name: name.into(),
            reason: reason.as_str().to_string(),
        }
    }
}
