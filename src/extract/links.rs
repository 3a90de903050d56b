//! Link extraction from parsed HTML
//!
//! Candidates come from anchors, image maps, `<link>` references, embedded
//! resources, frames and, when enabled, form actions and inline script text.

use super::ExtractOptions;
use crate::url::resolve_url;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::OnceLock;
use url::Url;

const LINK_SELECTOR: &str =
    "a[href], area[href], link[href], img[src], script, iframe[src], frame[src], form[action]";

/// Absolute URLs and quoted root-relative paths inside script text
const SCRIPT_URL_PATTERN: &str =
    r#"https?://[^\s"'<>`\\]+|["'](/[A-Za-z0-9_\-.~%][A-Za-z0-9_\-./?=&%~+]*)["']"#;

fn script_url_regex() -> Option<&'static Regex> {
    static REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    REGEX
        .get_or_init(|| Regex::new(SCRIPT_URL_PATTERN).ok())
        .as_ref()
}

/// Extracts candidate child URLs from a parsed document
///
/// # Arguments
///
/// * `document` - The parsed page
/// * `base` - Effective base URL for relative references
/// * `options` - Whether form actions and inline script URLs are included
///
/// # Returns
///
/// Absolute HTTP(S) URLs without fragments, in document order, each URL
/// appearing once at the position of its first occurrence. URLs found in an
/// inline script take the script element's position.
pub fn extract_links(document: &Html, base: &Url, options: &ExtractOptions) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    let mut push = |candidate: Option<Url>| {
        if let Some(url) = candidate {
            let url = url.to_string();
            if seen.insert(url.clone()) {
                links.push(url);
            }
        }
    };

    let Ok(selector) = Selector::parse(LINK_SELECTOR) else {
        return links;
    };

    for element in document.select(&selector) {
        if let Some(reference) = link_reference(&element, options) {
            push(resolve_link(reference, base));
        } else if options.js_links && is_inline_script(&element) {
            let text: String = element.text().collect();
            for reference in extract_script_urls(&text) {
                push(resolve_link(&reference, base));
            }
        }
    }

    links
}

/// Returns the attribute holding the element's outgoing reference
fn link_reference<'a>(element: &ElementRef<'a>, options: &ExtractOptions) -> Option<&'a str> {
    let value = element.value();
    match value.name() {
        "a" | "area" | "link" => value.attr("href"),
        "form" if options.forms => value.attr("action"),
        "form" => None,
        _ => value.attr("src"),
    }
}

fn is_inline_script(element: &ElementRef<'_>) -> bool {
    element.value().name() == "script" && element.value().attr("src").is_none()
}

/// Finds URL-looking strings inside inline script text
///
/// ```
/// use trawler::extract::extract_script_urls;
///
/// let js = r#"fetch("/api/items"); location = 'https://example.com/next';"#;
/// assert_eq!(
///     extract_script_urls(js),
///     vec!["/api/items".to_string(), "https://example.com/next".to_string()]
/// );
/// ```
pub fn extract_script_urls(script: &str) -> Vec<String> {
    let Some(regex) = script_url_regex() else {
        return Vec::new();
    };

    regex
        .captures_iter(script)
        .filter_map(|caps| match caps.get(1) {
            Some(path) => Some(path.as_str().to_string()),
            None => caps
                .get(0)
                .map(|m| m.as_str().trim_end_matches(['.', ',', ';']).to_string()),
        })
        .collect()
}

/// Resolves a reference to an absolute URL, skipping non-navigable ones
///
/// Returns None for:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only and empty references
/// - non-HTTP(S) URLs after resolution
fn resolve_link(reference: &str, base: &Url) -> Option<Url> {
    let reference = reference.trim();

    if reference.is_empty() || reference.starts_with('#') {
        return None;
    }

    let lower = reference.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    resolve_url(base, reference)
}
