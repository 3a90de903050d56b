//! Task, result, and error records exchanged across the crawl boundary

use crate::extract::FormInfo;
use crate::url::{extract_domain, url_hash};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// A URL waiting to be fetched
///
/// Created when a URL is discovered (seed, sitemap, or extraction) and
/// consumed when it is dispatched. `url` is always normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlTask {
    pub url: String,

    /// SHA-256 of the normalized URL, used for dedup and partitioning
    pub hash: String,

    /// Lowercase host, the key politeness is tracked under
    pub domain: String,

    /// Link distance from the seed (the seed is depth 0)
    pub depth: u32,

    pub parent_url: Option<String>,

    pub discovered_at: DateTime<Utc>,
}

impl CrawlTask {
    /// Creates a task for an already normalized URL
    pub fn new(url: &Url, depth: u32, parent_url: Option<String>) -> Self {
        Self {
            url: url.to_string(),
            hash: url_hash(url),
            domain: extract_domain(url).unwrap_or_default(),
            depth,
            parent_url,
            discovered_at: Utc::now(),
        }
    }
}

/// A successfully fetched page and what was extracted from it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlResult {
    /// The URL that was requested
    pub url: String,

    /// The URL after redirects
    pub final_url: String,

    pub status_code: u16,

    pub content_type: Option<String>,

    pub content: String,

    pub title: Option<String>,

    /// Absolute candidate URLs in document order (HTML pages only)
    pub links: Vec<String>,

    pub forms: Vec<FormInfo>,

    pub depth: u32,

    /// Time from request start to body fully read
    pub load_time_ms: u64,

    pub timestamp: DateTime<Utc>,
}

/// Why a URL produced no result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlErrorKind {
    /// Connection, TLS, redirect, or body read failure
    Fetch,

    /// The request exceeded `request-timeout-ms`
    Timeout,

    /// The server answered with a non-success status
    HttpStatus(u16),

    /// The body could not be decoded
    Parse,

    /// robots.txt disallows the URL; it was never requested
    RobotsDenied,

    /// The response's declared content type is filtered out
    ContentFiltered,
}

impl CrawlErrorKind {
    /// Returns true if the failure happened without a request being sent
    pub fn is_policy(&self) -> bool {
        matches!(self, Self::RobotsDenied)
    }
}

/// A per-URL failure; never fatal to the run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlError {
    pub url: String,
    pub depth: u32,
    pub kind: CrawlErrorKind,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

impl CrawlError {
    pub fn new(task: &CrawlTask, kind: CrawlErrorKind, error: impl Into<String>) -> Self {
        Self {
            url: task.url.clone(),
            depth: task.depth,
            kind,
            error: error.into(),
            timestamp: Utc::now(),
        }
    }
}
