//! Trawler: a policy-respecting web crawler engine
//!
//! This crate discovers, fetches, filters, and extracts structured data from
//! web pages. It honours robots.txt and per-domain politeness delays, can
//! checkpoint its frontier for resumable runs, and partitions URLs across
//! workers for distributed operation. Callers consume results through the
//! [`crawler::CrawlObserver`] interface.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod filter;
pub mod output;
pub mod partition;
pub mod robots;
pub mod sitemap;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Trawler operations
#[derive(Debug, Error)]
pub enum TrawlerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Failed to fetch robots.txt for {origin}: {message}")]
    RobotsFetch { origin: String, message: String },

    #[error("Failed to parse sitemap {url}: {message}")]
    SitemapParse { url: String, message: String },

    #[error("Failed to load crawl state: {0}")]
    StateLoad(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Crawler has already run")]
    AlreadyRun,
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

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid regular expression '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Trawler operations
pub type Result<T> = std::result::Result<T, TrawlerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{Config, Strategy};
pub use crawler::{
    ChannelObserver, CrawlError, CrawlErrorKind, CrawlEvent, CrawlObserver, CrawlResult,
    CrawlStats, CrawlTask, Crawler, StopHandle,
};
pub use partition::assign_owner;
pub use url::{normalize_url, url_hash, NormalizeOptions};
