//! URL handling module for Trawler
//!
//! This module provides URL normalization, identity hashing, domain helpers,
//! and the scope filter that decides whether a discovered URL is crawled.

mod domain;
mod hash;
mod normalize;

use crate::config::ScopeConfig;
use crate::ConfigError;
use regex::Regex;
use url::Url;

pub use domain::{domain_matches, extract_domain, origin_of};
pub use hash::url_hash;
pub use normalize::{normalize_parsed, normalize_url, resolve_url, NormalizeOptions};

/// Decides whether a URL is inside the configured crawl scope
///
/// Evaluation order:
/// 1. Blocked domains (a match always rejects)
/// 2. Allowed domains (when non-empty, one must match)
/// 3. Seed host restriction when `stay_in_domain` is set
/// 4. Include patterns (when non-empty, one must match)
/// 5. Exclude patterns (any match rejects)
#[derive(Debug, Clone)]
pub struct UrlFilter {
    allowed_domains: Vec<String>,
    blocked_domains: Vec<String>,
    seed_host: Option<String>,
    url_patterns: Vec<Regex>,
    exclude_patterns: Vec<Regex>,
}

impl UrlFilter {
    /// Builds a filter from the scope section and the normalized seed
    ///
    /// # Arguments
    ///
    /// * `scope` - The `[scope]` configuration section
    /// * `seed` - The seed URL; its host bounds the crawl when `stay_in_domain` is set
    ///
    /// # Returns
    ///
    /// * `Ok(UrlFilter)` - Ready to evaluate URLs
    /// * `Err(ConfigError)` - A pattern is not a valid regular expression
    pub fn from_config(scope: &ScopeConfig, seed: &Url) -> Result<Self, ConfigError> {
        Ok(Self {
            allowed_domains: lowercase_all(&scope.allowed_domains),
            blocked_domains: lowercase_all(&scope.blocked_domains),
            seed_host: if scope.stay_in_domain {
                extract_domain(seed)
            } else {
                None
            },
            url_patterns: compile_all(&scope.url_patterns)?,
            exclude_patterns: compile_all(&scope.exclude_patterns)?,
        })
    }

    /// Returns true if `host` passes the domain rules
    pub fn matches_domain(&self, host: &str) -> bool {
        let host = host.to_lowercase();

        if self
            .blocked_domains
            .iter()
            .any(|pattern| domain_matches(pattern, &host))
        {
            return false;
        }

        if !self.allowed_domains.is_empty()
            && !self
                .allowed_domains
                .iter()
                .any(|pattern| domain_matches(pattern, &host))
        {
            return false;
        }

        match &self.seed_host {
            Some(seed_host) => *seed_host == host,
            None => true,
        }
    }

    /// Returns true if `url` passes the include and exclude patterns
    pub fn matches_pattern(&self, url: &str) -> bool {
        if !self.url_patterns.is_empty() && !self.url_patterns.iter().any(|re| re.is_match(url)) {
            return false;
        }

        !self.exclude_patterns.iter().any(|re| re.is_match(url))
    }

    /// Returns true if the URL is in scope
    pub fn is_allowed(&self, url: &Url) -> bool {
        match url.host_str() {
            Some(host) => self.matches_domain(host) && self.matches_pattern(url.as_str()),
            None => false,
        }
    }
}

fn lowercase_all(patterns: &[String]) -> Vec<String> {
    patterns.iter().map(|p| p.to_lowercase()).collect()
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|e| ConfigError::InvalidRegex {
                pattern: pattern.clone(),
                message: e.to_string(),
            })
        })
        .collect()
}
