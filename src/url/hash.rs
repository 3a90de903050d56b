use sha2::{Digest, Sha256};
use url::Url;

/// Computes the identity hash of a normalized URL
///
/// The hash is the lowercase hex SHA-256 of the URL's serialized form. Callers
/// must normalize first so equivalent URLs share one hash.
///
/// # Examples
///
/// ```
/// use trawler::url::{normalize_url, url_hash, NormalizeOptions};
///
/// let options = NormalizeOptions::default();
/// let a = normalize_url("https://Example.com/a#top", &options).unwrap();
/// let b = normalize_url("https://example.com/a", &options).unwrap();
/// assert_eq!(url_hash(&a), url_hash(&b));
/// assert_eq!(url_hash(&a).len(), 64);
/// ```
pub fn url_hash(url: &Url) -> String {
    hex::encode(Sha256::digest(url.as_str().as_bytes()))
}
