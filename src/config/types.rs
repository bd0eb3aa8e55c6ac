use serde::Deserialize;

/// Main configuration structure for Market-Miner
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub scrape: ScrapeConfig,
    pub source: SourceConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub servers: Vec<ServerEntry>,
}

/// Scrape engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeConfig {
    /// Server name to scrape, or "all" for every configured server
    pub server: String,

    /// First item ID in the range (inclusive)
    #[serde(rename = "from-id")]
    pub from_id: u32,

    /// Last item ID in the range (inclusive)
    #[serde(rename = "to-id")]
    pub to_id: u32,

    /// Number of concurrent fetch workers per server run
    #[serde(rename = "thread-count")]
    pub thread_count: u32,

    /// Aggregate request-rate ceiling across all workers (requests/second)
    #[serde(rename = "rate-limit-per-sec")]
    pub rate_limit_per_sec: f64,

    /// Maximum fetch attempts per item before emitting a failure
    #[serde(rename = "retry-ceiling")]
    pub retry_ceiling: u32,

    /// Base backoff delay between retries (milliseconds, doubles per attempt)
    #[serde(rename = "backoff-base-ms")]
    pub backoff_base_ms: u64,

    /// Upper bound on the backoff delay (milliseconds)
    #[serde(rename = "backoff-cap-ms")]
    pub backoff_cap_ms: u64,

    /// Consecutive total failures before the run is aborted
    #[serde(rename = "failure-threshold")]
    pub failure_threshold: u32,

    /// How to run multiple server runs when 2+ servers are selected
    #[serde(rename = "multi-server-mode", default)]
    pub multi_server_mode: MultiServerMode,
}

/// Execution mode for multi-server scrapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MultiServerMode {
    /// One server run at a time (bounds total concurrent load)
    #[default]
    Sequential,

    /// All server runs in parallel, each with its own worker pool
    Concurrent,
}

/// Remote auction-listing source configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the listing site (e.g. "https://www.ffxiah.com")
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the per-server items CSV
    #[serde(rename = "items-path")]
    pub items_path: String,

    /// Path to the cross-server comparison CSV
    #[serde(rename = "cross-server-path")]
    pub cross_server_path: String,

    /// Path to the skip-cache JSON file
    #[serde(rename = "skip-cache-path")]
    pub skip_cache_path: String,
}

/// A named server entry with its listing-site identifier
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerEntry {
    /// Server name as shown in output (e.g. "Asura")
    pub name: String,

    /// Numeric server ID used by the listing site
    pub sid: u32,
}

impl Config {
    /// Resolves the configured server selection to concrete entries
    ///
    /// Returns every configured server when the selection is "all" (in
    /// configuration order, which also fixes aggregation tie-breaks), or the
    /// single matching entry otherwise.
    pub fn selected_servers(&self) -> Vec<ServerEntry> {
        if self.scrape.server.eq_ignore_ascii_case("all") {
            self.servers.clone()
        } else {
            self.servers
                .iter()
                .filter(|s| s.name.eq_ignore_ascii_case(&self.scrape.server))
                .cloned()
                .collect()
        }
    }

    /// Number of item IDs in the configured range
    pub fn range_len(&self) -> u64 {
        u64::from(self.scrape.to_id) - u64::from(self.scrape.from_id) + 1
    }
}
