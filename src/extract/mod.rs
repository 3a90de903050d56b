//! Content extraction module for Trawler
//!
//! A fetched HTML page is parsed once and shared by the link extractor and the
//! form extractor. Everything here is synchronous so it can run inside a
//! spawned fetch task without holding the document across an await point.

mod forms;
mod links;

use scraper::{Html, Selector};
use url::Url;

pub use forms::{extract_forms, FormField, FormInfo};
pub use links::{extract_links, extract_script_urls};

/// Extraction switches taken from the `[content]` configuration section
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    /// Extract form metadata and emit form actions as links
    pub forms: bool,

    /// Scan inline `<script>` text for URLs
    pub js_links: bool,
}

/// Everything extracted from one HTML page
#[derive(Debug, Clone, Default)]
pub struct ExtractedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Absolute candidate URLs in document order, without duplicates
    pub links: Vec<String>,

    pub forms: Vec<FormInfo>,
}

/// Parses an HTML page and runs the enabled extractors over it
///
/// # Arguments
///
/// * `html` - The page body
/// * `page_url` - The final URL of the page (after redirects)
/// * `options` - Which extractors to run
///
/// # Example
///
/// ```
/// use trawler::extract::{extract_page, ExtractOptions};
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let page_url = Url::parse("https://example.com/").unwrap();
/// let page = extract_page(html, &page_url, &ExtractOptions::default());
/// assert_eq!(page.title, Some("Test".to_string()));
/// assert_eq!(page.links, vec!["https://example.com/page".to_string()]);
/// ```
pub fn extract_page(html: &str, page_url: &Url, options: &ExtractOptions) -> ExtractedPage {
    let document = Html::parse_document(html);
    let base = document_base(&document, page_url);

    let links = extract_links(&document, &base, options);
    let forms = if options.forms {
        extract_forms(&document, &base, page_url)
    } else {
        Vec::new()
    };

    ExtractedPage {
        title: extract_title(&document),
        links,
        forms,
    }
}

/// Returns the effective base URL: `<base href>` when present and valid,
/// otherwise the page URL
pub fn document_base(document: &Html, page_url: &Url) -> Url {
    let Ok(selector) = Selector::parse("base[href]") else {
        return page_url.clone();
    };

    document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr("href"))
        .and_then(|href| page_url.join(href.trim()).ok())
        .filter(|base| base.scheme() == "http" || base.scheme() == "https")
        .unwrap_or_else(|| page_url.clone())
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_url() -> Url {
        Url::parse("https://example.com/dir/page").unwrap()
    }

    #[test]
    fn test_extract_title_with_whitespace() {
        let html = r#"<html><head><title>  Test Page  </title></head><body></body></html>"#;
        let page = extract_page(html, &page_url(), &ExtractOptions::default());
        assert_eq!(page.title, Some("Test Page".to_string()));
    }

    #[test]
    fn test_no_title() {
        let page = extract_page("<html><body></body></html>", &page_url(), &ExtractOptions::default());
        assert_eq!(page.title, None);
    }

    #[test]
    fn test_base_href_changes_resolution() {
        let html = r#"<html><head><base href="https://cdn.example.com/assets/"></head>
            <body><a href="img/logo">Logo</a></body></html>"#;
        let page = extract_page(html, &page_url(), &ExtractOptions::default());
        assert_eq!(page.links, vec!["https://cdn.example.com/assets/img/logo".to_string()]);
    }

    #[test]
    fn test_forms_only_when_enabled() {
        let html = r#"<form action="/search"><input name="q"></form>"#;

        let disabled = extract_page(html, &page_url(), &ExtractOptions::default());
        assert!(disabled.forms.is_empty());
        assert!(disabled.links.is_empty());

        let options = ExtractOptions {
            forms: true,
            js_links: false,
        };
        let enabled = extract_page(html, &page_url(), &options);
        assert_eq!(enabled.forms.len(), 1);
        assert_eq!(enabled.links, vec!["https://example.com/search".to_string()]);
    }
}
