//! CSV writers for per-server records and cross-server comparisons
//!
//! The per-server file is merged with any existing file on disk keyed by
//! (itemid, server), so repeated or resumed runs refine one dataset instead
//! of clobbering it. The comparison file is rewritten whole each time.

use super::OutputError;
use crate::model::{CrossServerRow, ItemRecord};
use std::collections::BTreeMap;
use std::path::Path;

const ITEMS_HEADER: &str =
    "itemid,name,price,stack_price,sold_per_day,stack_sold_per_day,category,stackable,server";

const CROSS_HEADER: &str = "itemid,name,category,lowest_price,lowest_server,highest_price,\
highest_server,average_price,price_difference,server_count";

/// Writes per-server item records, merging with the existing file
///
/// Rows from this run replace existing rows with the same (itemid, server)
/// key; all other existing rows are preserved. The output is sorted by item
/// ID, then server name.
pub fn write_items_csv(path: impl AsRef<Path>, records: &[ItemRecord]) -> Result<usize, OutputError> {
    let path = path.as_ref();

    let mut merged: BTreeMap<(u32, String), String> = BTreeMap::new();

    if path.exists() {
        let existing = std::fs::read_to_string(path)?;
        for line in existing.lines().skip(1) {
            if line.trim().is_empty() {
                continue;
            }
            let fields = parse_csv_line(line);
            if fields.len() != 9 {
                tracing::warn!("Dropping malformed row in {}: {}", path.display(), line);
                continue;
            }
            if let Ok(item_id) = fields[0].parse::<u32>() {
                merged.insert((item_id, fields[8].clone()), line.to_string());
            }
        }
    }

    for record in records {
        merged.insert(
            (record.item_id, record.server.clone()),
            items_row(record),
        );
    }

    let mut out = String::with_capacity(merged.len() * 64 + ITEMS_HEADER.len());
    out.push_str(ITEMS_HEADER);
    out.push('\n');
    for line in merged.values() {
        out.push_str(line);
        out.push('\n');
    }

    ensure_parent(path)?;
    std::fs::write(path, out)?;
    Ok(merged.len())
}

/// Writes the cross-server comparison file (full rewrite)
pub fn write_cross_server_csv(
    path: impl AsRef<Path>,
    rows: &[CrossServerRow],
) -> Result<(), OutputError> {
    let path = path.as_ref();

    let mut out = String::with_capacity(rows.len() * 96 + CROSS_HEADER.len());
    out.push_str(CROSS_HEADER);
    out.push('\n');

    for row in rows {
        out.push_str(&format!(
            "{},{},{},{},{},{},{},{},{},{}\n",
            row.item_id,
            escape(&row.name),
            escape(&row.category),
            row.lowest_price,
            escape(&row.lowest_server),
            row.highest_price,
            escape(&row.highest_server),
            row.average_price,
            row.price_spread,
            row.server_count,
        ));
    }

    ensure_parent(path)?;
    std::fs::write(path, out)?;
    Ok(())
}

/// Formats one record as a CSV row
///
/// Absent prices and rates render as 0, a stack size of 0 renders the
/// stackable column as "No"; both match the long-standing file shape that
/// downstream spreadsheets expect.
fn items_row(record: &ItemRecord) -> String {
    let stackable = if record.stack_size > 0 {
        record.stack_size.to_string()
    } else {
        "No".to_string()
    };

    format!(
        "{},{},{},{},{},{},{},{},{}",
        record.item_id,
        escape(&record.name),
        record.price.unwrap_or(0),
        record.stack_price.unwrap_or(0),
        format_rate(record.sold_per_day),
        format_rate(record.stack_sold_per_day),
        escape(&record.category),
        stackable,
        escape(&record.server),
    )
}

fn format_rate(rate: Option<f64>) -> String {
    match rate {
        Some(rate) => format!("{:.2}", rate),
        None => "0".to_string(),
    }
}

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Quotes a field when it contains a delimiter or quote
///
/// Newlines are flattened to spaces: the merge reader is line-oriented, so
/// no emitted field may span lines.
fn escape(field: &str) -> String {
    let field = field.replace('\n', " ").replace('\r', " ");
    if field.contains(',') || field.contains('"') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field
    }
}

/// Splits one CSV line into unquoted fields
fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            c => current.push(c),
        }
    }
    fields.push(current);
    fields
}
