use crate::UrlError;
use serde::{Deserialize, Serialize};
use url::Url;

/// Tracking query parameters removed by default. A trailing `*` matches by prefix.
const TRACKING_PARAMS: &[&str] = &["utm_*", "fbclid", "gclid", "mc_eid"];

/// Query and path rules applied on top of the fixed normalization steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct NormalizeOptions {
    /// Sort query parameters by key
    pub sort_query: bool,

    /// Query parameters to drop; entries ending in `*` match by prefix
    pub strip_params: Vec<String>,

    /// Treat `/page/` and `/page` as the same URL
    pub strip_trailing_slash: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            sort_query: true,
            strip_params: TRACKING_PARAMS.iter().map(|p| p.to_string()).collect(),
            strip_trailing_slash: false,
        }
    }
}

impl NormalizeOptions {
    fn strips(&self, key: &str) -> bool {
        self.strip_params.iter().any(|param| match param.strip_suffix('*') {
            Some(prefix) => key.starts_with(prefix),
            None => key == param,
        })
    }
}

/// Normalizes a URL into the canonical form used for deduplication
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed or not HTTP(S)
/// 2. Lowercase scheme and host, drop the default port
/// 3. Resolve dot segments and collapse repeated slashes
/// 4. Optionally remove a trailing slash (never the root `/`)
/// 5. Remove the fragment
/// 6. Remove configured query parameters, sort the rest by key
/// 7. Remove an empty query string
///
/// Applying it twice yields the same URL as applying it once.
///
/// # Examples
///
/// ```
/// use trawler::url::{normalize_url, NormalizeOptions};
///
/// let options = NormalizeOptions::default();
/// let a = normalize_url("HTTP://Example.com:80/a?b=2&a=1#frag", &options).unwrap();
/// let b = normalize_url("http://example.com/a?a=1&b=2", &options).unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "http://example.com/a?a=1&b=2");
/// ```
pub fn normalize_url(url_str: &str, options: &NormalizeOptions) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_parsed(url, options)
}

/// Normalizes an already parsed URL
pub fn normalize_parsed(mut url: Url, options: &NormalizeOptions) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or(UrlError::MissingDomain)?
        .to_lowercase();
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;

    // Parsing already drops ports equal to the scheme default; this covers
    // URLs built by hand.
    if url.port() == default_port(url.scheme()) {
        let _ = url.set_port(None);
    }

    let path = normalize_path(url.path(), options.strip_trailing_slash);
    url.set_path(&path);

    url.set_fragment(None);

    if url.query().is_some() {
        let mut params: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !options.strips(key))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if options.sort_query {
            params.sort_by(|a, b| a.0.cmp(&b.0));
        }

        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params.iter());
        }
    }

    Ok(url)
}

/// Resolves `reference` against `base`, keeping only HTTP(S) results
///
/// The fragment is dropped; `None` is returned for unresolvable references.
pub fn resolve_url(base: &Url, reference: &str) -> Option<Url> {
    let mut resolved = base.join(reference.trim()).ok()?;
    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }
    resolved.set_fragment(None);
    Some(resolved)
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}

/// Collapses repeated slashes and optionally strips a trailing slash
fn normalize_path(path: &str, strip_trailing_slash: bool) -> String {
    let mut normalized = String::with_capacity(path.len().max(1));
    for ch in path.chars() {
        if ch == '/' && normalized.ends_with('/') {
            continue;
        }
        normalized.push(ch);
    }

    if !normalized.starts_with('/') {
        normalized.insert(0, '/');
    }

    if strip_trailing_slash && normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }

    normalized
}
