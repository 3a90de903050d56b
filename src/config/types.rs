use crate::url::NormalizeOptions;
use serde::{Deserialize, Serialize};

/// Main configuration structure for a crawl
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Seed URL the crawl starts from
    pub seed: String,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub scope: ScopeConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub distributed: DistributedConfig,
    #[serde(default)]
    pub normalize: NormalizeOptions,
}

impl Config {
    /// Creates a configuration for `seed` with every section at its defaults
    pub fn new(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            crawler: CrawlerConfig::default(),
            scope: ScopeConfig::default(),
            content: ContentConfig::default(),
            policy: PolicyConfig::default(),
            state: StateConfig::default(),
            distributed: DistributedConfig::default(),
            normalize: NormalizeOptions::default(),
        }
    }
}

/// Traversal order of the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Breadth-first: every depth-d task is dispatched before any depth-(d+1) task
    #[default]
    #[serde(alias = "BFS")]
    Bfs,
    /// Depth-first: the most recently discovered task is dispatched first
    #[serde(alias = "DFS")]
    Dfs,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    pub strategy: Strategy,

    /// Maximum depth to crawl from the seed (the seed is depth 0)
    pub max_depth: u32,

    /// Maximum number of fetch attempts, cumulative across resumed runs
    pub max_pages: u64,

    /// Minimum time between requests to the same domain (milliseconds)
    pub delay_ms: u64,

    /// Maximum number of concurrent fetches
    pub max_concurrent: u32,

    /// Per-request timeout (milliseconds)
    pub request_timeout_ms: u64,

    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Bfs,
            max_depth: 3,
            max_pages: 100,
            delay_ms: 1000,
            max_concurrent: 5,
            request_timeout_ms: 30_000,
            user_agent: "Trawler/1.0".to_string(),
        }
    }
}

/// Which URLs are in scope for the crawl
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ScopeConfig {
    /// Domain patterns (e.g., "example.com" or "*.example.com"); empty allows all
    pub allowed_domains: Vec<String>,

    /// Domain patterns that are never crawled; wins over `allowed_domains`
    pub blocked_domains: Vec<String>,

    /// Only follow links on the seed's host
    pub stay_in_domain: bool,

    /// Regular expressions; when non-empty a URL must match at least one
    pub url_patterns: Vec<String>,

    /// Regular expressions; a URL matching any of them is skipped
    pub exclude_patterns: Vec<String>,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            allowed_domains: Vec::new(),
            blocked_domains: Vec::new(),
            stay_in_domain: true,
            url_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
        }
    }
}

/// Content-type filtering and extraction switches
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ContentConfig {
    /// MIME types to keep (supports "type/*"); empty allows all
    pub allowed_mime_types: Vec<String>,

    /// MIME types to drop; wins over `allowed_mime_types`
    pub blocked_mime_types: Vec<String>,

    /// Extract form metadata and follow form actions
    pub extract_forms: bool,

    /// Scan inline scripts for embedded URLs
    pub extract_js_links: bool,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            allowed_mime_types: Vec::new(),
            blocked_mime_types: Vec::new(),
            extract_forms: true,
            extract_js_links: false,
        }
    }
}

/// Site policy handling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PolicyConfig {
    pub respect_robots_txt: bool,

    /// Seed the frontier from the site's XML sitemaps
    pub follow_sitemaps: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            respect_robots_txt: true,
            follow_sitemaps: false,
        }
    }
}

/// Where checkpoints are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateBackend {
    /// One JSON document per crawl identity, replaced atomically
    #[default]
    File,
    /// A shared SQLite database, one transaction per checkpoint
    Sqlite,
}

/// Resumable crawl configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct StateConfig {
    pub resumable: bool,

    pub state_dir: String,

    /// Completed pages between checkpoints
    pub checkpoint_interval: u32,

    pub backend: StateBackend,

    /// Abort instead of starting fresh when a stored checkpoint cannot be loaded
    pub strict_resume: bool,

    /// Keep a copy of the final checkpoint instead of deleting it
    pub archive_on_complete: bool,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            resumable: false,
            state_dir: "./.trawler-state".to_string(),
            checkpoint_interval: 10,
            backend: StateBackend::File,
            strict_resume: false,
            archive_on_complete: false,
        }
    }
}

/// Hash partitioning across workers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DistributedConfig {
    pub worker_id: u32,
    pub total_workers: u32,
}

impl Default for DistributedConfig {
    fn default() -> Self {
        Self {
            worker_id: 0,
            total_workers: 1,
        }
    }
}
