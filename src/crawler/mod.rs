//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The frontier and its traversal strategies
//! - HTTP fetching and per-URL error classification
//! - The coordinating loop that owns all crawl state
//! - The observer interface results are published through

mod coordinator;
mod fetcher;
mod frontier;
mod observer;
mod stats;
mod types;

pub use coordinator::{Crawler, StopHandle};
pub use fetcher::{build_http_client, fetch_page, FetchContext, PageOutcome, MAX_REDIRECTS};
pub use frontier::Frontier;
pub use observer::{ChannelObserver, CrawlEvent, CrawlObserver};
pub use stats::CrawlStats;
pub use types::{CrawlError, CrawlErrorKind, CrawlResult, CrawlTask};

use crate::config::Config;
use crate::TrawlerError;

/// Runs a complete crawl with the given observer
///
/// Convenience wrapper around [`Crawler::new`] and [`Crawler::run`].
///
/// # Arguments
///
/// * `config` - The crawl configuration
/// * `observer` - Receives pages, errors, and the final statistics
///
/// # Returns
///
/// * `Ok(CrawlStats)` - Crawl finished (or was stopped)
/// * `Err(TrawlerError)` - Crawl could not start
pub async fn crawl(
    config: Config,
    observer: impl CrawlObserver + 'static,
) -> Result<CrawlStats, TrawlerError> {
    Crawler::new(config, observer)?.run().await
}
