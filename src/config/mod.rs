//! Configuration module for Trawler
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use trawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    Config, ContentConfig, CrawlerConfig, DistributedConfig, PolicyConfig, ScopeConfig,
    StateBackend, StateConfig, Strategy,
};

pub use parser::{
    compute_config_hash, config_fingerprint, load_config, load_config_with_hash, parse_config,
};
pub use validation::validate;
