use crate::config::types::{
    Config, ContentConfig, CrawlerConfig, DistributedConfig, ScopeConfig, StateConfig,
};
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_seed(&config.seed)?;
    validate_crawler_config(&config.crawler)?;
    validate_scope_config(&config.scope)?;
    validate_content_config(&config.content)?;
    validate_state_config(&config.state)?;
    validate_distributed_config(&config.distributed)?;
    Ok(())
}

/// Validates the seed URL
fn validate_seed(seed: &str) -> Result<(), ConfigError> {
    let url = Url::parse(seed)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "Seed URL '{}' must use HTTP or HTTPS",
            seed
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "Seed URL '{}' has no host",
            seed
        )));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent < 1 || config.max_concurrent > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent must be between 1 and 100, got {}",
            config.max_concurrent
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(
            "max_pages must be >= 1".to_string(),
        ));
    }

    if config.request_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "request_timeout_ms must be > 0".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates domain lists and URL patterns
fn validate_scope_config(config: &ScopeConfig) -> Result<(), ConfigError> {
    for pattern in config
        .allowed_domains
        .iter()
        .chain(config.blocked_domains.iter())
    {
        validate_domain_pattern(pattern)?;
    }

    for pattern in config
        .url_patterns
        .iter()
        .chain(config.exclude_patterns.iter())
    {
        Regex::new(pattern).map_err(|e| ConfigError::InvalidRegex {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
    }

    Ok(())
}

/// Validates MIME allow/block lists
fn validate_content_config(config: &ContentConfig) -> Result<(), ConfigError> {
    for mime in config
        .allowed_mime_types
        .iter()
        .chain(config.blocked_mime_types.iter())
    {
        let valid = mime
            .split_once('/')
            .map(|(kind, sub)| !kind.is_empty() && !sub.is_empty())
            .unwrap_or(false);

        if !valid {
            return Err(ConfigError::Validation(format!(
                "Invalid MIME type '{}': expected 'type/subtype' or 'type/*'",
                mime
            )));
        }
    }

    Ok(())
}

/// Validates resumable-state configuration
fn validate_state_config(config: &StateConfig) -> Result<(), ConfigError> {
    if config.resumable && config.state_dir.trim().is_empty() {
        return Err(ConfigError::Validation(
            "state_dir cannot be empty when resumable is enabled".to_string(),
        ));
    }

    if config.checkpoint_interval < 1 {
        return Err(ConfigError::Validation(
            "checkpoint_interval must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates worker partitioning
fn validate_distributed_config(config: &DistributedConfig) -> Result<(), ConfigError> {
    if config.total_workers < 1 {
        return Err(ConfigError::Validation(
            "total_workers must be >= 1".to_string(),
        ));
    }

    if config.worker_id >= config.total_workers {
        return Err(ConfigError::Validation(format!(
            "worker_id must be < total_workers ({}), got {}",
            config.total_workers, config.worker_id
        )));
    }

    Ok(())
}

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    let domain = pattern.strip_prefix("*.").unwrap_or(pattern);
    validate_domain_string(domain)
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    Ok(())
}
