//! Running and final crawl statistics

use crate::crawler::types::{CrawlError, CrawlErrorKind, CrawlResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Counters maintained by the orchestrator and handed to `on_complete`
///
/// Every discovered URL ends up counted exactly once as successful, failed,
/// or still queued, so at completion
/// `discovered_pages == successful_pages + failed_pages + queued_pages`.
/// Counters are cumulative across resumed runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlStats {
    /// URLs accepted into the frontier
    pub discovered_pages: u64,

    /// Fetch attempts (requests sent)
    pub total_pages: u64,

    pub successful_pages: u64,

    /// Fetch failures plus URLs rejected by robots.txt or content type
    pub failed_pages: u64,

    /// Tasks left in the frontier when the run ended
    pub queued_pages: u64,

    pub robots_denied: u64,

    /// Discovered URLs owned by another worker (not fetched here)
    pub foreign_links: u64,

    pub total_links: u64,

    pub total_forms: u64,

    pub total_load_time_ms: u64,

    pub min_load_time_ms: Option<u64>,

    pub max_load_time_ms: Option<u64>,

    /// Fetch attempts per depth
    pub pages_by_depth: BTreeMap<u32, u64>,

    /// Failures per kind, keyed by a short label
    pub errors_by_kind: BTreeMap<String, u64>,

    pub started_at: Option<DateTime<Utc>>,

    pub finished_at: Option<DateTime<Utc>>,

    /// The run continued from a checkpoint
    pub resumed: bool,

    /// Why a stored checkpoint was ignored, when it was
    pub state_load_error: Option<String>,

    /// The run ended because `stop()` was called
    pub stopped: bool,
}

impl CrawlStats {
    /// Records a dispatched fetch
    pub fn record_attempt(&mut self, depth: u32) {
        self.total_pages += 1;
        *self.pages_by_depth.entry(depth).or_insert(0) += 1;
    }

    /// Records a successful fetch
    pub fn record_success(&mut self, result: &CrawlResult) {
        self.successful_pages += 1;
        self.total_links += result.links.len() as u64;
        self.total_forms += result.forms.len() as u64;

        self.total_load_time_ms += result.load_time_ms;
        self.min_load_time_ms = Some(
            self.min_load_time_ms
                .map_or(result.load_time_ms, |min| min.min(result.load_time_ms)),
        );
        self.max_load_time_ms = Some(
            self.max_load_time_ms
                .map_or(result.load_time_ms, |max| max.max(result.load_time_ms)),
        );
    }

    /// Records a failure of any kind
    pub fn record_failure(&mut self, error: &CrawlError) {
        self.failed_pages += 1;
        if error.kind == CrawlErrorKind::RobotsDenied {
            self.robots_denied += 1;
        }
        *self
            .errors_by_kind
            .entry(error_label(&error.kind))
            .or_insert(0) += 1;
    }

    /// Mean load time of successful fetches
    pub fn average_load_time_ms(&self) -> f64 {
        if self.successful_pages == 0 {
            0.0
        } else {
            self.total_load_time_ms as f64 / self.successful_pages as f64
        }
    }

    /// Successful pages as a percentage of resolved (successful + failed) pages
    pub fn success_rate(&self) -> f64 {
        let resolved = self.successful_pages + self.failed_pages;
        if resolved == 0 {
            0.0
        } else {
            self.successful_pages as f64 / resolved as f64 * 100.0
        }
    }

    /// Wall-clock duration of the run, once finished
    pub fn duration_secs(&self) -> Option<f64> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds() as f64 / 1000.0),
            _ => None,
        }
    }

    /// Checks the accounting invariant
    pub fn is_balanced(&self) -> bool {
        self.discovered_pages == self.successful_pages + self.failed_pages + self.queued_pages
    }
}

fn error_label(kind: &CrawlErrorKind) -> String {
    match kind {
        CrawlErrorKind::Fetch => "fetch".to_string(),
        CrawlErrorKind::Timeout => "timeout".to_string(),
        CrawlErrorKind::HttpStatus(code) => format!("http_{}", code),
        CrawlErrorKind::Parse => "parse".to_string(),
        CrawlErrorKind::RobotsDenied => "robots_denied".to_string(),
        CrawlErrorKind::ContentFiltered => "content_filtered".to_string(),
    }
}
