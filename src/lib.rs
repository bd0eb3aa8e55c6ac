//! Market-Miner: a concurrent auction-house market scraper
//!
//! This crate collects per-item market records from an auction-listing site
//! across one or many named game servers, normalizes them, and produces both
//! per-server records and cross-server price comparisons.

pub mod client;
pub mod config;
pub mod model;
pub mod output;
pub mod scrape;
pub mod storage;

use thiserror::Error;

/// Main error type for Market-Miner operations
#[derive(Debug, Error)]
pub enum MinerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Skip-cache store error: {0}")]
    Store(#[from] storage::StoreError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown server '{0}'")]
    UnknownServer(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Market-Miner operations
pub type Result<T> = std::result::Result<T, MinerError>;

// Re-export commonly used types
pub use client::{FetchError, SourceClient};
pub use config::Config;
pub use model::{CrossServerRow, ItemRecord, SkipEntry, SkipReason};
pub use scrape::{CancelHandle, RunStatus, ScrapeEvent, ScrapeOrchestrator};
