//! Sitemap loading module for Trawler
//!
//! Sitemaps are discovered from robots.txt `Sitemap:` directives and the
//! conventional `/sitemap.xml` location, fetched, and flattened into a list of
//! page entries. Sitemap index files are followed recursively up to a fixed
//! nesting limit. Fetch and parse failures are logged and skipped.

mod parser;

pub use parser::{parse_document, ParsedSitemap, SitemapEntry};

use crate::url::{normalize_url, origin_of, url_hash, NormalizeOptions};
use crate::TrawlerError;
use std::collections::HashSet;
use url::Url;

/// Maximum nesting of sitemap index files below a top-level sitemap
pub const MAX_SITEMAP_DEPTH: u32 = 3;

/// Maximum number of page entries collected for one crawl
pub const MAX_SITEMAP_ENTRIES: usize = 50_000;

/// Fetches and flattens XML sitemaps
pub struct SitemapLoader {
    client: reqwest::Client,
    normalize: NormalizeOptions,
    max_entries: usize,
}

impl SitemapLoader {
    pub fn new(client: reqwest::Client, normalize: NormalizeOptions) -> Self {
        Self {
            client,
            normalize,
            max_entries: MAX_SITEMAP_ENTRIES,
        }
    }

    /// Overrides the entry cap
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Lists candidate sitemap URLs for a site
    ///
    /// # Arguments
    ///
    /// * `base_url` - Any URL on the site
    /// * `declared` - `Sitemap:` locations from the site's robots.txt
    ///
    /// # Returns
    ///
    /// The declared sitemaps followed by `{origin}/sitemap.xml`, without
    /// duplicates. Declared locations that are not valid URLs are dropped.
    pub fn discover_sitemaps(&self, base_url: &Url, declared: &[String]) -> Vec<Url> {
        let origin = origin_of(base_url);
        let conventional = format!("{}/sitemap.xml", origin);

        let mut seen = HashSet::new();
        declared
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(conventional.as_str()))
            .filter_map(|location| base_url.join(location.trim()).ok())
            .filter(|url| seen.insert(url.to_string()))
            .collect()
    }

    /// Fetches one sitemap and every index child below it
    ///
    /// Children more than [`MAX_SITEMAP_DEPTH`] levels down are ignored, a
    /// sitemap already visited is not fetched again, and collection stops at
    /// the entry cap.
    pub async fn parse_sitemap(&self, url: &Url) -> Vec<SitemapEntry> {
        let mut visited = HashSet::new();
        let mut entries = Vec::new();
        self.collect(url, &mut visited, &mut entries).await;
        entries
    }

    /// Collects entries across all of a site's sitemaps
    ///
    /// Entries are de-duplicated by normalized URL hash, keeping the first
    /// occurrence, then ordered by priority (highest first, missing last).
    pub async fn get_all_urls(&self, base_url: &Url, declared: &[String]) -> Vec<SitemapEntry> {
        let mut visited = HashSet::new();
        let mut entries = Vec::new();

        for sitemap_url in self.discover_sitemaps(base_url, declared) {
            if entries.len() >= self.max_entries {
                break;
            }
            self.collect(&sitemap_url, &mut visited, &mut entries).await;
        }

        let mut seen = HashSet::new();
        let mut unique: Vec<SitemapEntry> = entries
            .into_iter()
            .filter(|entry| match normalize_url(&entry.url, &self.normalize) {
                Ok(normalized) => seen.insert(url_hash(&normalized)),
                Err(_) => false,
            })
            .collect();

        unique.sort_by(|a, b| {
            b.priority
                .unwrap_or(-1.0)
                .total_cmp(&a.priority.unwrap_or(-1.0))
        });

        tracing::info!(
            "Loaded {} unique sitemap URLs for {}",
            unique.len(),
            origin_of(base_url)
        );
        unique
    }

    async fn collect(
        &self,
        root: &Url,
        visited: &mut HashSet<String>,
        entries: &mut Vec<SitemapEntry>,
    ) {
        let mut pending = vec![(root.clone(), 0u32)];

        while let Some((url, depth)) = pending.pop() {
            if entries.len() >= self.max_entries {
                tracing::warn!("Sitemap entry cap of {} reached", self.max_entries);
                break;
            }
            if !visited.insert(url.to_string()) {
                continue;
            }

            let body = match self.fetch_sitemap(&url).await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!("{}", e);
                    continue;
                }
            };

            let parsed = parse_document(&body);
            if parsed.errors > 0 {
                tracing::debug!("{} unparseable elements in sitemap {}", parsed.errors, url);
            }

            let room = self.max_entries - entries.len();
            entries.extend(parsed.entries.into_iter().take(room));

            if depth >= MAX_SITEMAP_DEPTH {
                if !parsed.children.is_empty() {
                    tracing::warn!("Sitemap nesting limit reached at {}", url);
                }
                continue;
            }

            // Reverse so children are processed in document order
            for child in parsed.children.iter().rev() {
                if let Ok(child_url) = Url::parse(child) {
                    pending.push((child_url, depth + 1));
                }
            }
        }
    }

    async fn fetch_sitemap(&self, url: &Url) -> Result<Vec<u8>, TrawlerError> {
        let parse_error = |message: String| TrawlerError::SitemapParse {
            url: url.to_string(),
            message,
        };

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| parse_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(parse_error(format!("HTTP {}", response.status().as_u16())));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| parse_error(e.to_string()))?;
        Ok(body.to_vec())
    }
}
