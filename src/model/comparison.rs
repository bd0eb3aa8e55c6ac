/// The reduction of per-server records for one item into a single
/// comparative summary row
///
/// Only servers with a defined single-unit price contribute; rows are never
/// emitted with `server_count == 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossServerRow {
    pub item_id: u32,

    /// Name taken from the lowest-price contributing record
    pub name: String,

    /// Category taken from the lowest-price contributing record
    pub category: String,

    pub lowest_price: u32,
    pub lowest_server: String,

    pub highest_price: u32,
    pub highest_server: String,

    /// Arithmetic mean of defined prices, rounded to the nearest gil
    pub average_price: u32,

    /// `highest_price - lowest_price` (0 when a single server contributes)
    pub price_spread: u32,

    /// Number of servers with a defined price (always >= 1)
    pub server_count: u32,
}
