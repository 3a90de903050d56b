//! Content filter module for Trawler
//!
//! Decides whether a MIME type is worth fetching or parsing. The same
//! allow/block lists are applied twice: before the fetch, using a type inferred
//! from the URL's file extension, and after the response headers arrive, using
//! the declared `Content-Type`.

use crate::config::ContentConfig;
use url::Url;

/// File extensions with a well-known MIME type
const EXTENSION_TYPES: &[(&str, &str)] = &[
    ("html", "text/html"),
    ("htm", "text/html"),
    ("xhtml", "application/xhtml+xml"),
    ("php", "text/html"),
    ("asp", "text/html"),
    ("aspx", "text/html"),
    ("jsp", "text/html"),
    ("txt", "text/plain"),
    ("css", "text/css"),
    ("csv", "text/csv"),
    ("js", "application/javascript"),
    ("json", "application/json"),
    ("xml", "application/xml"),
    ("rss", "application/rss+xml"),
    ("pdf", "application/pdf"),
    ("zip", "application/zip"),
    ("gz", "application/gzip"),
    ("doc", "application/msword"),
    ("docx", "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
    ("xls", "application/vnd.ms-excel"),
    ("xlsx", "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("svg", "image/svg+xml"),
    ("webp", "image/webp"),
    ("ico", "image/x-icon"),
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("mp4", "video/mp4"),
    ("webm", "video/webm"),
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
];

/// MIME allow/block decision
#[derive(Debug, Clone, Default)]
pub struct ContentFilter {
    allowed: Vec<String>,
    blocked: Vec<String>,
}

impl ContentFilter {
    /// Creates a filter from the `[content]` configuration section
    pub fn new(config: &ContentConfig) -> Self {
        Self {
            allowed: config
                .allowed_mime_types
                .iter()
                .map(|m| m.trim().to_lowercase())
                .collect(),
            blocked: config
                .blocked_mime_types
                .iter()
                .map(|m| m.trim().to_lowercase())
                .collect(),
        }
    }

    /// Returns true if both lists are empty and every type passes
    pub fn is_permissive(&self) -> bool {
        self.allowed.is_empty() && self.blocked.is_empty()
    }

    /// Checks a bare MIME type (no parameters) against the lists
    ///
    /// The block-list wins over the allow-list. An empty allow-list allows
    /// every type not blocked.
    pub fn allows_mime(&self, mime: &str) -> bool {
        let mime = mime.trim().to_lowercase();

        if self.blocked.iter().any(|pattern| mime_matches(pattern, &mime)) {
            return false;
        }

        self.allowed.is_empty() || self.allowed.iter().any(|pattern| mime_matches(pattern, &mime))
    }

    /// Pre-fetch check using the URL's file extension
    ///
    /// URLs without an extension, or with one we cannot map, pass.
    pub fn allows_url(&self, url: &Url) -> bool {
        match infer_mime(url) {
            Some(mime) => self.allows_mime(mime),
            None => true,
        }
    }

    /// Post-fetch check using a `Content-Type` header value
    ///
    /// A missing header passes; parameters such as `charset` are ignored.
    pub fn allows_content_type(&self, content_type: Option<&str>) -> bool {
        match content_type {
            Some(value) => self.allows_mime(&essence(value)),
            None => true,
        }
    }
}

/// Strips parameters from a `Content-Type` value and lowercases it
///
/// ```
/// use trawler::filter::essence;
///
/// assert_eq!(essence("Text/HTML; charset=UTF-8"), "text/html");
/// ```
pub fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

/// Returns true if the content type is HTML that links can be extracted from
pub fn is_html(content_type: Option<&str>) -> bool {
    match content_type {
        Some(value) => {
            let mime = essence(value);
            mime == "text/html" || mime == "application/xhtml+xml"
        }
        None => true,
    }
}

/// Maps the URL's last path segment extension to a MIME type
fn infer_mime(url: &Url) -> Option<&'static str> {
    let segment = url.path_segments()?.last()?;
    let (_, extension) = segment.rsplit_once('.')?;
    let extension = extension.to_lowercase();

    EXTENSION_TYPES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime)| *mime)
}

fn mime_matches(pattern: &str, mime: &str) -> bool {
    match pattern.strip_suffix("/*") {
        Some(kind) => mime
            .split_once('/')
            .map(|(mime_kind, _)| mime_kind == kind)
            .unwrap_or(false),
        None => pattern == mime,
    }
}
