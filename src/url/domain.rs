use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use trawler::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the origin key (`scheme://host[:port]`) politeness and robots
/// state are tracked under
///
/// The port is only present when it differs from the scheme default.
///
/// ```
/// use url::Url;
/// use trawler::url::origin_of;
///
/// let url = Url::parse("http://Example.com:8080/a/b?c=d").unwrap();
/// assert_eq!(origin_of(&url), "http://example.com:8080");
/// ```
pub fn origin_of(url: &Url) -> String {
    let host = extract_domain(url).unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    }
}

/// Checks a host against a domain pattern
///
/// `example.com` matches only that host. `*.example.com` matches the bare
/// domain and any subdomain of it.
pub fn domain_matches(pattern: &str, host: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => {
            host == base
                || host
                    .strip_suffix(base)
                    .map(|prefix| prefix.ends_with('.'))
                    .unwrap_or(false)
        }
        None => host == pattern,
    }
}
