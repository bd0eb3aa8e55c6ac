//! Configuration module for Market-Miner
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use market_miner::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Scraping {} servers", config.selected_servers().len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, MultiServerMode, OutputConfig, ScrapeConfig, ServerEntry, SourceConfig,
};

// Re-export parser and validation entry points
pub use parser::load_config;
pub use validation::{validate, MAX_THREAD_COUNT};
