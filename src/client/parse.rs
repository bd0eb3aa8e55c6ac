//! Item-page parsing for the auction-listing source
//!
//! Extracts the item name (with its inline stack-size badge), category
//! breadcrumbs, sellability flags, best-guess price, and sales-per-day from
//! the listing site's item pages. Parsing is pure and tested against fixture
//! markup; fetching lives in the `http` module.

use scraper::{ElementRef, Html, Selector};

/// Extracted fields from a single-item page
#[derive(Debug, Clone)]
pub struct ParsedItemPage {
    /// Item name, with any inline "xN" badge stripped (`None` when the page
    /// has no item-name element, i.e. the item does not exist)
    pub name: Option<String>,

    /// Stack size from an inline "xN" badge on the name (0 = no badge)
    pub stack_size: u32,

    /// Category breadcrumb joined with " > " ("Unknown" when absent)
    pub category: String,

    /// Best-guess single-unit price (Median row, then Last row, then first
    /// plausible sales-history value)
    pub price: Option<u32>,

    /// Sales per day, rounded to two decimals
    pub sold_per_day: Option<f64>,

    /// False when the page carries Exclusive / No Auction / No Sale flags
    pub sellable: bool,

    /// Relative href of the separate stack-variant page, if linked
    pub stack_path: Option<String>,
}

/// Extracted fields from a stack-variant page
#[derive(Debug, Clone)]
pub struct ParsedStackPage {
    /// Stack size from the "xN" badge (0 when the badge is missing)
    pub stack_size: u32,

    /// Stack price
    pub price: Option<u32>,

    /// Stack sales per day
    pub sold_per_day: Option<f64>,
}

/// Parses a single-item page
pub fn parse_item_page(html: &str) -> ParsedItemPage {
    let document = Html::parse_document(html);

    let (name, stack_size) = match extract_name(&document) {
        Some(raw) => {
            let (name, badge) = split_stack_badge(&raw);
            (Some(name), badge)
        }
        None => (None, 0),
    };

    ParsedItemPage {
        name,
        stack_size,
        category: extract_category(&document),
        price: extract_price(&document),
        sold_per_day: extract_sales_per_day(&document),
        sellable: !has_unsellable_flags(&document),
        stack_path: extract_stack_path(&document),
    }
}

/// Parses a stack-variant page
pub fn parse_stack_page(html: &str) -> ParsedStackPage {
    let document = Html::parse_document(html);

    let stack_size = extract_name(&document)
        .map(|raw| split_stack_badge(&raw).1)
        .unwrap_or(0);

    ParsedStackPage {
        stack_size,
        price: extract_price(&document),
        sold_per_day: extract_sales_per_day(&document),
    }
}

/// Extracts the raw item name text
fn extract_name(document: &Html) -> Option<String> {
    let selector = Selector::parse("span.item-name").ok()?;

    document
        .select(&selector)
        .next()
        .map(|el| {
            el.text()
                .collect::<String>()
                .replace('\u{a0}', " ")
                .trim()
                .to_string()
        })
        .filter(|s| !s.is_empty())
}

/// Splits an inline stack badge off an item name
///
/// "Alexandrite x99" becomes ("Alexandrite", 99); names without a badge
/// come back unchanged with size 0.
fn split_stack_badge(raw: &str) -> (String, u32) {
    let mut size = 0u32;
    let mut parts: Vec<&str> = Vec::new();

    for token in raw.split_whitespace() {
        if size == 0 {
            let badge = token
                .strip_prefix('x')
                .or_else(|| token.strip_prefix('X'));
            if let Some(rest) = badge {
                if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
                    if let Ok(parsed) = rest.parse::<u32>() {
                        size = parsed;
                        continue;
                    }
                }
            }
        }
        parts.push(token);
    }

    (parts.join(" "), size)
}

/// Extracts the category from breadcrumb links
fn extract_category(document: &Html) -> String {
    let mut categories = Vec::new();

    if let Ok(selector) = Selector::parse(r#"a[href*="/browse/"]"#) {
        for element in document.select(&selector) {
            let text = element.text().collect::<String>().trim().to_string();
            if !text.is_empty() && !text.eq_ignore_ascii_case("root") {
                categories.push(text);
            }
        }
    }

    if categories.is_empty() {
        "Unknown".to_string()
    } else {
        categories.join(" > ")
    }
}

/// Checks for flags that make an item unlistable
///
/// Exclusive items carry a `span.ex` badge; "No Auction" / "No Sale" appear
/// in the item-stats text or elsewhere in the body.
fn has_unsellable_flags(document: &Html) -> bool {
    if let Ok(selector) = Selector::parse("span.ex") {
        if document.select(&selector).next().is_some() {
            return true;
        }
    }

    let mut stats_text = String::new();
    if let Ok(selector) = Selector::parse("span.item-stats") {
        for element in document.select(&selector) {
            stats_text.push_str(&element.text().collect::<String>());
            stats_text.push(' ');
        }
    }

    // Fall back to the whole document when the stats block is absent
    if stats_text.trim().is_empty() {
        stats_text = document.root_element().text().collect::<String>();
    }

    let lower = stats_text.to_lowercase();
    lower.contains("no auction") || lower.contains("no sale")
}

/// Extracts a best-guess price from the page tables
///
/// Priority: "Median" row, then "Last" row, then the first plausible numeric
/// cell in the sales-history table. Zero prices mean "no listings" and map
/// to `None`.
fn extract_price(document: &Html) -> Option<u32> {
    if let Some(price) = labeled_row_price(document, "Median") {
        return Some(price);
    }

    if let Some(price) = labeled_row_price(document, "Last") {
        return Some(price);
    }

    sales_history_price(document)
}

/// Finds a `<tr>` whose first cell is exactly `label` and parses the price
/// span in the second cell
fn labeled_row_price(document: &Html, label: &str) -> Option<u32> {
    let row_selector = Selector::parse("tr").ok()?;
    let cell_selector = Selector::parse("td").ok()?;
    let span_selector = Selector::parse("span").ok()?;

    for row in document.select(&row_selector) {
        let cells: Vec<ElementRef> = row.select(&cell_selector).collect();
        if cells.len() < 2 {
            continue;
        }

        let first = cells[0].text().collect::<String>();
        if first.trim() != label {
            continue;
        }

        let span = cells[1].select(&span_selector).next()?;
        let text = span.text().collect::<String>().trim().replace(',', "");
        if let Ok(value) = text.parse::<u32>() {
            if value > 0 {
                return Some(value);
            }
        }
    }

    None
}

/// Falls back to the first plausible price in the sales-history table
fn sales_history_price(document: &Html) -> Option<u32> {
    let cell_selector = Selector::parse("table.tbl-sales td").ok()?;

    for cell in document.select(&cell_selector) {
        let text = cell.text().collect::<String>().trim().replace(',', "");
        if text.len() >= 2 && text.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(value) = text.parse::<u32>() {
                if value >= 10 {
                    return Some(value);
                }
            }
        }
    }

    None
}

/// Extracts sales-per-day
///
/// The site renders "(X sold/day)" with the numeric value in the grandparent
/// row of the `#sales-per-day` span.
fn extract_sales_per_day(document: &Html) -> Option<f64> {
    let selector = Selector::parse("#sales-per-day").ok()?;
    let element = document.select(&selector).next()?;

    let grandparent = element.parent().and_then(|p| p.parent())?;
    let grandparent = ElementRef::wrap(grandparent)?;

    let text = grandparent.text().collect::<String>();
    let first = text.split_whitespace().next()?;
    let value = first.parse::<f64>().ok()?;

    Some((value * 100.0).round() / 100.0)
}

/// Extracts the href of the stack-variant link, if present
fn extract_stack_path(document: &Html) -> Option<String> {
    let selector = Selector::parse(r#"a[href*="stack=1"]"#).ok()?;

    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("href"))
        .map(|href| href.to_string())
}
