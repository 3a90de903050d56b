use crate::config::types::{
    Config, ContentConfig, DistributedConfig, PolicyConfig, ScopeConfig, Strategy,
};
use crate::config::validation::validate;
use crate::url::NormalizeOptions;
use crate::ConfigError;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use trawler::config::load_config;
///
/// let config = load_config(Path::new("crawl.toml")).unwrap();
/// println!("Max depth: {}", config.crawler.max_depth);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from a TOML string
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Only used for logging which file a run was started from; resume matching
/// uses [`config_fingerprint`], which ignores operational settings.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its file hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

/// The settings that shape which URLs a crawl visits and in what order
#[derive(Serialize)]
struct TraversalSettings<'a> {
    strategy: Strategy,
    max_depth: u32,
    scope: &'a ScopeConfig,
    content: &'a ContentConfig,
    policy: &'a PolicyConfig,
    distributed: &'a DistributedConfig,
    normalize: &'a NormalizeOptions,
}

/// Computes the fingerprint used to match checkpoints to a configuration
///
/// Covers strategy, depth, scope, content, policy, partitioning and
/// normalization. Page budget, delays, concurrency, timeouts, user agent and
/// state settings are excluded, so a checkpointed crawl can be resumed with a
/// larger `max-pages` or a gentler delay.
pub fn config_fingerprint(config: &Config) -> String {
    let settings = TraversalSettings {
        strategy: config.crawler.strategy,
        max_depth: config.crawler.max_depth,
        scope: &config.scope,
        content: &config.content,
        policy: &config.policy,
        distributed: &config.distributed,
        normalize: &config.normalize,
    };

    let encoded = serde_json::to_vec(&settings).unwrap_or_default();
    hex::encode(Sha256::digest(&encoded))
}
