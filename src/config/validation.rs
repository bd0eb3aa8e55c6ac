use crate::config::types::{Config, OutputConfig, ScrapeConfig, ServerEntry, SourceConfig};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Hard upper bound on the worker count, to avoid overwhelming the source
pub const MAX_THREAD_COUNT: u32 = 16;

/// Validates the entire configuration
///
/// All checks run before any network request is made; an invalid
/// configuration is rejected synchronously.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_scrape_config(&config.scrape)?;
    validate_source_config(&config.source)?;
    validate_output_config(&config.output)?;
    validate_servers(&config.servers)?;
    validate_server_selection(config)?;
    Ok(())
}

/// Validates scrape engine configuration
fn validate_scrape_config(config: &ScrapeConfig) -> Result<(), ConfigError> {
    if config.from_id < 1 {
        return Err(ConfigError::Validation(
            "from_id must be >= 1".to_string(),
        ));
    }

    if config.from_id > config.to_id {
        return Err(ConfigError::Validation(format!(
            "from_id ({}) must not exceed to_id ({})",
            config.from_id, config.to_id
        )));
    }

    if config.thread_count < 1 || config.thread_count > MAX_THREAD_COUNT {
        return Err(ConfigError::Validation(format!(
            "thread_count must be between 1 and {}, got {}",
            MAX_THREAD_COUNT, config.thread_count
        )));
    }

    if !(config.rate_limit_per_sec > 0.0) || !config.rate_limit_per_sec.is_finite() {
        return Err(ConfigError::Validation(format!(
            "rate_limit_per_sec must be a positive number, got {}",
            config.rate_limit_per_sec
        )));
    }

    if config.retry_ceiling < 1 {
        return Err(ConfigError::Validation(
            "retry_ceiling must be >= 1".to_string(),
        ));
    }

    if config.backoff_base_ms < 1 {
        return Err(ConfigError::Validation(
            "backoff_base_ms must be >= 1".to_string(),
        ));
    }

    if config.backoff_cap_ms < config.backoff_base_ms {
        return Err(ConfigError::Validation(format!(
            "backoff_cap_ms ({}) must be >= backoff_base_ms ({})",
            config.backoff_cap_ms, config.backoff_base_ms
        )));
    }

    if config.failure_threshold < 1 {
        return Err(ConfigError::Validation(
            "failure_threshold must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates source configuration
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.items_path.is_empty() {
        return Err(ConfigError::Validation(
            "items_path cannot be empty".to_string(),
        ));
    }

    if config.cross_server_path.is_empty() {
        return Err(ConfigError::Validation(
            "cross_server_path cannot be empty".to_string(),
        ));
    }

    if config.skip_cache_path.is_empty() {
        return Err(ConfigError::Validation(
            "skip_cache_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the server table
fn validate_servers(servers: &[ServerEntry]) -> Result<(), ConfigError> {
    if servers.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[servers]] entry is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for entry in servers {
        if entry.name.is_empty() {
            return Err(ConfigError::Validation(
                "server name cannot be empty".to_string(),
            ));
        }

        if entry.name.eq_ignore_ascii_case("all") {
            return Err(ConfigError::Validation(
                "'all' is a reserved server selection, not a server name".to_string(),
            ));
        }

        if !seen.insert(entry.name.to_ascii_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate server name '{}'",
                entry.name
            )));
        }
    }

    Ok(())
}

/// Validates that the configured selection matches a server (or "all")
fn validate_server_selection(config: &Config) -> Result<(), ConfigError> {
    if config.scrape.server.eq_ignore_ascii_case("all") {
        return Ok(());
    }

    let known = config
        .servers
        .iter()
        .any(|s| s.name.eq_ignore_ascii_case(&config.scrape.server));

    if !known {
        return Err(ConfigError::Validation(format!(
            "selected server '{}' is not in the server table",
            config.scrape.server
        )));
    }

    Ok(())
}
