//! Robots.txt handling module
//!
//! This module fetches, parses, and caches robots.txt files. Each origin's file
//! is fetched at most once per run. A missing or unreachable robots.txt is
//! treated as allow-all with no crawl delay (fail-open), and the failure is
//! logged.

mod parser;

pub use parser::{product_token, RobotsInfo};

use crate::url::origin_of;
use crate::TrawlerError;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Fetches robots.txt for an origin
///
/// # Arguments
///
/// * `client` - The HTTP client (carries the User-Agent header and timeout)
/// * `origin` - `scheme://host[:port]` without a trailing slash
/// * `user_agent` - The user agent string rules are selected for
///
/// # Returns
///
/// * `Ok(RobotsInfo)` - Successfully fetched and parsed robots.txt
/// * `Err(TrawlerError::RobotsFetch)` - Network failure or non-success status
pub async fn fetch_robots(
    client: &reqwest::Client,
    origin: &str,
    user_agent: &str,
) -> Result<RobotsInfo, TrawlerError> {
    let robots_url = format!("{}/robots.txt", origin);
    let fetch_error = |message: String| TrawlerError::RobotsFetch {
        origin: origin.to_string(),
        message,
    };

    let response = client
        .get(&robots_url)
        .send()
        .await
        .map_err(|e| fetch_error(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(fetch_error(format!("HTTP {}", status.as_u16())));
    }

    let content = response
        .text()
        .await
        .map_err(|e| fetch_error(e.to_string()))?;

    Ok(RobotsInfo::parse(origin, &content, user_agent))
}

/// Result of a robots.txt fetch that has not been cached yet
#[derive(Debug)]
pub struct RobotsLoad {
    pub origin: String,
    pub result: Result<RobotsInfo, TrawlerError>,
}

/// Per-run robots.txt cache and policy checks
pub struct RobotsEvaluator {
    client: reqwest::Client,
    user_agent: String,
    cache: HashMap<String, Arc<RobotsInfo>>,
}

impl RobotsEvaluator {
    pub fn new(client: reqwest::Client, user_agent: impl Into<String>) -> Self {
        Self {
            client,
            user_agent: user_agent.into(),
            cache: HashMap::new(),
        }
    }

    /// Returns the robots policy for an origin, fetching it on first use
    pub async fn get_robots_info(&mut self, origin: &str) -> Arc<RobotsInfo> {
        if let Some(info) = self.cached(origin) {
            return info;
        }

        let load = self.load(origin).await;
        self.store(load)
    }

    /// Fetches an origin's robots.txt without touching the cache
    ///
    /// The returned future owns everything it needs, so it can be spawned.
    /// Hand its output to [`store`](RobotsEvaluator::store).
    pub fn load(&self, origin: &str) -> impl Future<Output = RobotsLoad> + Send + 'static {
        let client = self.client.clone();
        let user_agent = self.user_agent.clone();
        let origin = origin.to_string();

        async move {
            let result = fetch_robots(&client, &origin, &user_agent).await;
            RobotsLoad { origin, result }
        }
    }

    /// Caches a finished load, falling back to allow-all when it failed
    pub fn store(&mut self, load: RobotsLoad) -> Arc<RobotsInfo> {
        let RobotsLoad { origin, result } = load;
        let info = match result {
            Ok(info) => {
                tracing::debug!(
                    "Loaded robots.txt for {} ({} disallow, {} allow rules)",
                    origin,
                    info.disallow_rules.len(),
                    info.allow_rules.len()
                );
                info
            }
            Err(e) => {
                tracing::warn!("{}; treating origin as allow-all", e);
                RobotsInfo::allow_all(&origin)
            }
        };

        let info = Arc::new(info);
        self.cache.insert(origin, Arc::clone(&info));
        info
    }

    /// Policy of an origin that has already been loaded
    pub fn cached(&self, origin: &str) -> Option<Arc<RobotsInfo>> {
        self.cache.get(origin).map(Arc::clone)
    }

    pub fn is_cached(&self, origin: &str) -> bool {
        self.cache.contains_key(origin)
    }

    /// Checks whether our user agent may fetch the URL
    pub async fn is_allowed(&mut self, url: &Url) -> bool {
        let info = self.get_robots_info(&origin_of(url)).await;
        info.is_allowed(url, &self.user_agent)
    }

    /// Crawl delay declared for us by an origin already in the cache
    pub fn get_crawl_delay(&self, origin: &str) -> Option<Duration> {
        self.cache
            .get(origin)
            .and_then(|info| info.crawl_delay)
            .map(Duration::from_secs_f64)
    }

    /// Sitemap locations declared by an origin's robots.txt
    pub async fn get_sitemaps(&mut self, origin: &str) -> Vec<String> {
        self.get_robots_info(origin).await.sitemap_urls.clone()
    }

    /// Number of origins whose policy has been loaded
    pub fn cached_origins(&self) -> usize {
        self.cache.len()
    }
}
