//! HTTP fetcher implementation
//!
//! This module handles the per-page work a fetch task does off the
//! orchestrator loop:
//! - Building the HTTP client with the configured user agent and timeout
//! - Sending the GET request and classifying failures
//! - Applying the post-fetch content-type filter before reading the body
//! - Extracting links, forms, and the title from HTML bodies
//!
//! Fetch tasks never touch crawl state; they return a [`PageOutcome`] and the
//! orchestrator applies it.

use crate::config::CrawlerConfig;
use crate::crawler::types::{CrawlError, CrawlErrorKind, CrawlResult, CrawlTask};
use crate::extract::{extract_page, ExtractOptions, ExtractedPage};
use crate::filter::{is_html, ContentFilter};
use chrono::Utc;
use reqwest::header::CONTENT_TYPE;
use reqwest::{redirect::Policy, Client};
use std::time::{Duration, Instant};

/// Maximum redirect hops followed per request
pub const MAX_REDIRECTS: usize = 10;

/// Read-only context shared by all fetch tasks
#[derive(Debug, Clone)]
pub struct FetchContext {
    pub client: Client,
    pub content_filter: ContentFilter,
    pub extract: ExtractOptions,
}

/// What a fetch task hands back to the orchestrator
#[derive(Debug)]
pub enum PageOutcome {
    /// The page was fetched (and parsed, if HTML)
    Success { task: CrawlTask, result: CrawlResult },

    /// The fetch failed; the error is reported and the URL is not retried
    Failed { task: CrawlTask, error: CrawlError },
}

impl PageOutcome {
    pub fn task(&self) -> &CrawlTask {
        match self {
            Self::Success { task, .. } | Self::Failed { task, .. } => task,
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The `[crawler]` section (user agent, request timeout)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use trawler::config::CrawlerConfig;
/// use trawler::crawler::build_http_client;
///
/// let client = build_http_client(&CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    let timeout = Duration::from_millis(config.request_timeout_ms);

    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches one task's URL and extracts its content
///
/// # Request Flow
///
/// 1. Send GET (redirects followed up to [`MAX_REDIRECTS`])
/// 2. Non-success status → `HttpStatus`
/// 3. Declared content type blocked → `ContentFiltered` (body not read)
/// 4. Read the body; HTML bodies are decoded and parsed
///
/// | Condition | Error kind |
/// |-----------|------------|
/// | Request timed out | `Timeout` |
/// | Connect, TLS, redirect, or read error | `Fetch` |
/// | HTTP status outside 2xx | `HttpStatus(code)` |
/// | Content type filtered | `ContentFiltered` |
/// | HTML body not decodable | `Parse` |
pub async fn fetch_page(ctx: &FetchContext, task: CrawlTask) -> PageOutcome {
    let started = Instant::now();

    let response = match ctx.client.get(&task.url).send().await {
        Ok(response) => response,
        Err(e) => return failed(task, classify_error(&e), e.to_string()),
    };

    let status = response.status();
    let final_url = response.url().clone();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if !status.is_success() {
        let code = status.as_u16();
        return failed(task, CrawlErrorKind::HttpStatus(code), format!("HTTP {}", code));
    }

    if !ctx.content_filter.allows_content_type(content_type.as_deref()) {
        let declared = content_type.unwrap_or_default();
        return failed(
            task,
            CrawlErrorKind::ContentFiltered,
            format!("Content type '{}' is filtered", declared),
        );
    }

    let body = match response.bytes().await {
        Ok(body) => body,
        Err(e) => return failed(task, classify_error(&e), e.to_string()),
    };

    let html = is_html(content_type.as_deref());
    let content = match decode_body(&body, content_type.as_deref(), html) {
        Ok(content) => content,
        Err(message) => return failed(task, CrawlErrorKind::Parse, message),
    };

    let page = if html {
        extract_page(&content, &final_url, &ctx.extract)
    } else {
        ExtractedPage::default()
    };

    let result = CrawlResult {
        url: task.url.clone(),
        final_url: final_url.to_string(),
        status_code: status.as_u16(),
        content_type,
        content,
        title: page.title,
        links: page.links,
        forms: page.forms,
        depth: task.depth,
        load_time_ms: started.elapsed().as_millis() as u64,
        timestamp: Utc::now(),
    };

    PageOutcome::Success { task, result }
}

fn failed(task: CrawlTask, kind: CrawlErrorKind, message: String) -> PageOutcome {
    let error = CrawlError::new(&task, kind, message);
    PageOutcome::Failed { task, error }
}

fn classify_error(error: &reqwest::Error) -> CrawlErrorKind {
    if error.is_timeout() {
        CrawlErrorKind::Timeout
    } else {
        CrawlErrorKind::Fetch
    }
}

/// Decodes a response body to text
///
/// HTML must be valid UTF-8 unless the response declares another charset, in
/// which case it is decoded lossily. Other content is always decoded lossily.
fn decode_body(body: &[u8], content_type: Option<&str>, html: bool) -> Result<String, String> {
    match std::str::from_utf8(body) {
        Ok(text) => Ok(text.to_string()),
        Err(e) if html && !declares_foreign_charset(content_type) => {
            Err(format!("HTML body is not valid UTF-8: {}", e))
        }
        Err(_) => Ok(String::from_utf8_lossy(body).into_owned()),
    }
}

fn declares_foreign_charset(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|value| {
            value.split(';').skip(1).find_map(|param| {
                let (key, charset) = param.split_once('=')?;
                (key.trim().eq_ignore_ascii_case("charset"))
                    .then(|| charset.trim().trim_matches('"').to_ascii_lowercase())
            })
        })
        .map(|charset| charset != "utf-8" && charset != "utf8")
        .unwrap_or(false)
}
