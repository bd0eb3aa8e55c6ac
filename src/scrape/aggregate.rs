//! Cross-server price aggregation
//!
//! Reduces the per-server record sets of a multi-server scrape into one
//! comparison row per item, keyed by single-unit price.

use crate::model::{CrossServerRow, ItemRecord};
use std::collections::{BTreeSet, HashMap};

/// Builds cross-server comparison rows from per-server record sets
///
/// `server_order` fixes tie-breaking: when two servers share the lowest (or
/// highest) price, the one listed first wins. Items appear at most once, in
/// ascending item-ID order; items with no defined price on any server are
/// left out entirely.
pub fn aggregate_servers(
    server_order: &[String],
    per_server: &HashMap<String, HashMap<u32, ItemRecord>>,
) -> Vec<CrossServerRow> {
    let mut item_ids = BTreeSet::new();
    for records in per_server.values() {
        item_ids.extend(records.keys().copied());
    }

    let mut rows = Vec::new();
    for item_id in item_ids {
        if let Some(row) = aggregate_item(item_id, server_order, per_server) {
            rows.push(row);
        }
    }
    rows
}

/// Reduces one item's records across servers; None when no server priced it
fn aggregate_item(
    item_id: u32,
    server_order: &[String],
    per_server: &HashMap<String, HashMap<u32, ItemRecord>>,
) -> Option<CrossServerRow> {
    let mut lowest: Option<(u32, &str, &ItemRecord)> = None;
    let mut highest: Option<(u32, &str)> = None;
    let mut sum: u64 = 0;
    let mut count: u32 = 0;

    // Walking in server order makes strict comparisons implement
    // first-listed-wins tie-breaking.
    for server in server_order {
        let record = per_server
            .get(server)
            .and_then(|records| records.get(&item_id));
        let Some(record) = record else { continue };
        let Some(price) = record.price else { continue };

        sum += u64::from(price);
        count += 1;

        if lowest.map_or(true, |(low, _, _)| price < low) {
            lowest = Some((price, server, record));
        }
        if highest.map_or(true, |(high, _)| price > high) {
            highest = Some((price, server));
        }
    }

    let (lowest_price, lowest_server, lowest_record) = lowest?;
    let (highest_price, highest_server) = highest?;

    let average_price = (sum as f64 / f64::from(count)).round() as u32;

    Some(CrossServerRow {
        item_id,
        name: lowest_record.name.clone(),
        category: lowest_record.category.clone(),
        lowest_price,
        lowest_server: lowest_server.to_string(),
        highest_price,
        highest_server: highest_server.to_string(),
        average_price,
        price_spread: highest_price - lowest_price,
        server_count: count,
    })
}
