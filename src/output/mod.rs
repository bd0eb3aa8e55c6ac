//! Result presentation: CSV files and the console event sink

mod console;
mod csv;
mod traits;

pub use console::{format_progress, ConsoleSink};
pub use csv::{write_cross_server_csv, write_items_csv};
pub use traits::{EventSink, OutputError};
