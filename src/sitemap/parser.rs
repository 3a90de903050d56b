//! XML sitemap document parsing
//!
//! Handles both `<urlset>` documents and `<sitemapindex>` documents. Index
//! entries are returned separately so the loader can recurse into them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sitemap::reader::{SiteMapEntity, SiteMapReader};
use sitemap::structs::{ChangeFreq, LastMod, Priority};
use std::io::Cursor;

/// One `<url>` entry of a sitemap; every field except `url` is a hint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SitemapEntry {
    pub url: String,
    pub lastmod: Option<DateTime<Utc>>,
    pub changefreq: Option<String>,
    pub priority: Option<f32>,
}

/// Contents of one sitemap document
#[derive(Debug, Default)]
pub struct ParsedSitemap {
    /// Page entries from a `<urlset>`
    pub entries: Vec<SitemapEntry>,

    /// Child sitemap locations from a `<sitemapindex>`
    pub children: Vec<String>,

    /// Number of elements the reader could not parse
    pub errors: usize,
}

/// Parses a sitemap XML body
///
/// Entries without a valid `<loc>` are skipped. Invalid `lastmod` or
/// `priority` values are dropped rather than rejecting the entry.
pub fn parse_document(xml: &[u8]) -> ParsedSitemap {
    let mut parsed = ParsedSitemap::default();

    for entity in SiteMapReader::new(Cursor::new(xml)) {
        match entity {
            SiteMapEntity::Url(entry) => {
                if let Some(url) = entry.loc.get_url() {
                    parsed.entries.push(SitemapEntry {
                        url: url.to_string(),
                        lastmod: match entry.lastmod {
                            LastMod::DateTime(dt) => Some(dt.with_timezone(&Utc)),
                            _ => None,
                        },
                        changefreq: change_freq_name(&entry.changefreq),
                        priority: match entry.priority {
                            Priority::Value(p) if (0.0..=1.0).contains(&p) => Some(p),
                            _ => None,
                        },
                    });
                }
            }
            SiteMapEntity::SiteMap(entry) => {
                if let Some(url) = entry.loc.get_url() {
                    parsed.children.push(url.to_string());
                }
            }
            SiteMapEntity::Err(_) => parsed.errors += 1,
        }
    }

    parsed
}

fn change_freq_name(freq: &ChangeFreq) -> Option<String> {
    let name = match freq {
        ChangeFreq::Always => "always",
        ChangeFreq::Hourly => "hourly",
        ChangeFreq::Daily => "daily",
        ChangeFreq::Weekly => "weekly",
        ChangeFreq::Monthly => "monthly",
        ChangeFreq::Yearly => "yearly",
        ChangeFreq::Never => "never",
        _ => return None,
    };
    Some(name.to_string())
}
