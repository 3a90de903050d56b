//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use std::collections::HashSet;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use trawler::config::{Config, StateBackend, Strategy};
use trawler::crawler::{ChannelObserver, CrawlErrorKind, CrawlEvent, CrawlStats, Crawler};
use trawler::storage::{FileStateStore, SqliteStateStore, StateStore, DATABASE_FILE};
use trawler::{assign_owner, normalize_url, url_hash, NormalizeOptions, TrawlerError};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration seeded at the mock server's root
fn create_test_config(server: &MockServer) -> Config {
    let mut config = Config::new(format!("{}/", server.uri()));
    config.crawler.delay_ms = 0;
    config.crawler.max_depth = 2;
    config.crawler.max_pages = 100;
    config.crawler.max_concurrent = 4;
    config.crawler.request_timeout_ms = 5_000;
    config.crawler.user_agent = "TrawlerTest/1.0".to_string();
    config.policy.respect_robots_txt = false;
    config
}

/// Enables resumable state under a temporary directory
fn enable_state(config: &mut Config, dir: &TempDir, backend: StateBackend) {
    config.state.resumable = true;
    config.state.state_dir = dir.path().to_string_lossy().into_owned();
    config.state.checkpoint_interval = 1;
    config.state.backend = backend;
}

fn html_with_links(title: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">{}</a>"#, href, href))
        .collect();
    format!(
        "<html><head><title>{}</title></head><body>{}</body></html>",
        title, anchors
    )
}

async fn mount_page(server: &MockServer, at: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

/// Mounts a page that must be requested exactly `times` times
async fn mount_page_expect(server: &MockServer, at: &str, body: String, times: u64) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .expect(times)
        .mount(server)
        .await;
}

/// Runs a crawl to completion and returns its stats and every event
async fn run_with_events(config: Config) -> (CrawlStats, Vec<CrawlEvent>) {
    let (observer, mut receiver) = ChannelObserver::channel();
    let mut crawler = Crawler::new(config, observer).expect("Failed to create crawler");
    let stats = crawler.run().await.expect("Crawl failed");
    drop(crawler);

    let mut events = Vec::new();
    while let Some(event) = receiver.recv().await {
        events.push(event);
    }
    (stats, events)
}

fn event_path(url: &str) -> String {
    Url::parse(url).expect("Invalid URL in event").path().to_string()
}

/// Paths of dispatched tasks, in dispatch order, with their depth
fn dispatched(events: &[CrawlEvent]) -> Vec<(String, u32)> {
    events
        .iter()
        .filter_map(|event| match event {
            CrawlEvent::Dispatch(task) => Some((event_path(&task.url), task.depth)),
            _ => None,
        })
        .collect()
}

fn fetched_pages(events: &[CrawlEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            CrawlEvent::Page(result) => Some(event_path(&result.url)),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_end_to_end_bfs_with_page_budget() {
    let server = MockServer::start().await;
    let children: Vec<String> = (1..=12).map(|i| format!("/page{}", i)).collect();
    let links: Vec<&str> = children.iter().map(String::as_str).collect();

    let mut seed_links = links.clone();
    seed_links.push("https://other.example.org/offsite");
    mount_page_expect(&server, "/", html_with_links("Home", &seed_links), 1).await;
    for child in &children {
        mount_page(&server, child, html_with_links(child, &["/deeper"])).await;
    }
    Mock::given(method("GET"))
        .and(path("/deeper"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server);
    config.crawler.max_depth = 1;
    config.crawler.max_pages = 10;
    config.crawler.strategy = Strategy::Bfs;
    config.scope.stay_in_domain = true;

    let (stats, events) = run_with_events(config).await;

    assert_eq!(stats.total_pages, 10);
    assert!(stats.successful_pages <= 10);
    assert_eq!(stats.successful_pages, 10);
    assert_eq!(stats.discovered_pages, 13);
    assert_eq!(stats.queued_pages, 3);
    assert!(stats.is_balanced());
    assert_eq!(stats.pages_by_depth.get(&0), Some(&1));
    assert_eq!(stats.pages_by_depth.get(&1), Some(&9));

    let order = dispatched(&events);
    assert_eq!(order[0], ("/".to_string(), 0));
    assert!(order.iter().all(|(p, _)| p != "/offsite" && p != "/deeper"));

    let completions: Vec<&CrawlStats> = events
        .iter()
        .filter_map(|e| match e {
            CrawlEvent::Complete(stats) => Some(stats),
            _ => None,
        })
        .collect();
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].successful_pages, stats.successful_pages);
}

#[tokio::test]
async fn test_bfs_dispatches_each_depth_before_the_next() {
    let server = MockServer::start().await;
    mount_page(&server, "/", html_with_links("Home", &["/a", "/b", "/c"])).await;
    mount_page(&server, "/a", html_with_links("A", &["/a/1", "/a/2"])).await;
    mount_page(&server, "/c", html_with_links("C", &["/c/1"])).await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html_with_links("B", &["/b/1"]))
                .insert_header("content-type", "text/html")
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;
    for leaf in ["/a/1", "/a/2", "/b/1", "/c/1"] {
        mount_page(&server, leaf, html_with_links(leaf, &[])).await;
    }

    let config = create_test_config(&server);
    let (stats, events) = run_with_events(config).await;
    assert_eq!(stats.successful_pages, 8);

    let depths: Vec<u32> = dispatched(&events).iter().map(|(_, d)| *d).collect();
    let mut sorted = depths.clone();
    sorted.sort();
    assert_eq!(depths, sorted, "dispatch order must be non-decreasing in depth");
}

#[tokio::test]
async fn test_dfs_follows_most_recent_discovery() {
    let server = MockServer::start().await;
    mount_page(&server, "/", html_with_links("Home", &["/a", "/b"])).await;
    mount_page(&server, "/a", html_with_links("A", &["/a/1"])).await;
    mount_page(&server, "/b", html_with_links("B", &["/b/1"])).await;
    mount_page(&server, "/a/1", html_with_links("A1", &[])).await;
    mount_page(&server, "/b/1", html_with_links("B1", &[])).await;

    let mut config = create_test_config(&server);
    config.crawler.strategy = Strategy::Dfs;
    config.crawler.max_concurrent = 1;

    let (_, events) = run_with_events(config).await;
    let order: Vec<String> = dispatched(&events).into_iter().map(|(p, _)| p).collect();

    assert_eq!(order, vec!["/", "/b", "/b/1", "/a", "/a/1"]);
}

#[tokio::test]
async fn test_robots_disallow_is_respected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private\n"),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/", html_with_links("Home", &["/private/x", "/public"])).await;
    mount_page(&server, "/public", html_with_links("Public", &[])).await;
    mount_page_expect(&server, "/private/x", html_with_links("Secret", &[]), 0).await;

    let mut config = create_test_config(&server);
    config.policy.respect_robots_txt = true;

    let (stats, events) = run_with_events(config).await;

    assert_eq!(stats.successful_pages, 2);
    assert_eq!(stats.robots_denied, 1);
    assert_eq!(stats.total_pages, 2);
    assert!(stats.is_balanced());
    assert!(events.iter().any(|e| matches!(
        e,
        CrawlEvent::Error(error) if error.kind == CrawlErrorKind::RobotsDenied
    )));
}

#[tokio::test]
async fn test_robots_ignored_when_disabled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /\n"))
        .expect(0)
        .mount(&server)
        .await;
    mount_page(&server, "/", html_with_links("Home", &["/private/x"])).await;
    mount_page_expect(&server, "/private/x", html_with_links("Secret", &[]), 1).await;

    let config = create_test_config(&server);
    let (stats, _) = run_with_events(config).await;

    assert_eq!(stats.successful_pages, 2);
    assert_eq!(stats.robots_denied, 0);
}

#[tokio::test]
async fn test_missing_robots_is_fail_open() {
    let server = MockServer::start().await;
    mount_page(&server, "/", html_with_links("Home", &["/a"])).await;
    mount_page(&server, "/a", html_with_links("A", &[])).await;

    let mut config = create_test_config(&server);
    config.policy.respect_robots_txt = true;

    let (stats, _) = run_with_events(config).await;
    assert_eq!(stats.successful_pages, 2);
    assert_eq!(stats.robots_denied, 0);
}

#[tokio::test]
async fn test_robots_crawl_delay_is_honoured() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nCrawl-delay: 1\n"),
        )
        .mount(&server)
        .await;
    mount_page(&server, "/", html_with_links("Home", &["/a"])).await;
    mount_page(&server, "/a", html_with_links("A", &[])).await;

    let mut config = create_test_config(&server);
    config.policy.respect_robots_txt = true;

    let started = Instant::now();
    let (stats, _) = run_with_events(config).await;

    assert_eq!(stats.successful_pages, 2);
    assert!(started.elapsed() >= Duration::from_secs(1));
}

#[tokio::test]
async fn test_max_pages_bounds_fetch_attempts() {
    let server = MockServer::start().await;
    let children: Vec<String> = (0..20).map(|i| format!("/item/{}", i)).collect();
    let links: Vec<&str> = children.iter().map(String::as_str).collect();
    mount_page(&server, "/", html_with_links("Home", &links)).await;
    for child in &children {
        mount_page(&server, child, html_with_links(child, &[])).await;
    }

    let mut config = create_test_config(&server);
    config.crawler.max_pages = 5;

    let (stats, _) = run_with_events(config).await;
    let requests = server.received_requests().await.unwrap_or_default();

    assert_eq!(stats.total_pages, 5);
    assert!(requests.len() <= 5);
    assert_eq!(stats.queued_pages, 16);
    assert!(stats.is_balanced());
}

#[tokio::test]
async fn test_equivalent_urls_are_fetched_once() {
    let server = MockServer::start().await;
    let port = Url::parse(&server.uri()).unwrap().port().unwrap_or(80);
    let variant = format!("HTTP://127.0.0.1:{}/a?b=2&a=1#frag", port);

    mount_page_expect(
        &server,
        "/",
        html_with_links("Home", &["/a?a=1&b=2", &variant, "/a?a=1&b=2&utm_source=x"]),
        1,
    )
    .await;
    mount_page_expect(&server, "/a", html_with_links("A", &["/", "/a?b=2&a=1"]), 1).await;

    let config = create_test_config(&server);
    let (stats, events) = run_with_events(config).await;

    assert_eq!(stats.total_pages, 2);
    assert_eq!(fetched_pages(&events), vec!["/", "/a"]);
}

#[tokio::test]
async fn test_failures_are_reported_and_accounted() {
    let server = MockServer::start().await;
    mount_page(&server, "/", html_with_links("Home", &["/ok", "/missing", "/broken"])).await;
    mount_page(&server, "/ok", html_with_links("OK", &[])).await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server);
    let (stats, events) = run_with_events(config).await;

    assert_eq!(stats.successful_pages, 2);
    assert_eq!(stats.failed_pages, 2);
    assert_eq!(stats.errors_by_kind.get("http_404"), Some(&1));
    assert_eq!(stats.errors_by_kind.get("http_500"), Some(&1));
    assert!(stats.is_balanced());

    let errors = events
        .iter()
        .filter(|e| matches!(e, CrawlEvent::Error(_)))
        .count();
    assert_eq!(errors, 2);
}

#[tokio::test]
async fn test_content_filter_before_and_after_fetch() {
    let server = MockServer::start().await;
    mount_page(&server, "/", html_with_links("Home", &["/logo.png", "/download"])).await;
    Mock::given(method("GET"))
        .and(path("/logo.png"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "image/png"))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/download"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"%PDF-1.4".to_vec())
                .insert_header("content-type", "application/pdf"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server);
    config.content.blocked_mime_types = vec!["image/*".to_string(), "application/pdf".to_string()];

    let (stats, events) = run_with_events(config).await;

    assert_eq!(stats.successful_pages, 1);
    assert_eq!(stats.errors_by_kind.get("content_filtered"), Some(&1));
    assert!(events.iter().any(|e| matches!(
        e,
        CrawlEvent::Error(error) if error.kind == CrawlErrorKind::ContentFiltered
    )));
}

#[tokio::test]
async fn test_forms_are_extracted_and_followed() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<html><body>
        <form action="/search" method="get">
            <input type="text" name="q" required>
            <select name="lang"><option>en</option></select>
            <input type="submit" value="Go">
        </form>
        </body></html>"#
            .to_string(),
    )
    .await;
    mount_page_expect(&server, "/search", html_with_links("Search", &[]), 1).await;

    let config = create_test_config(&server);
    let (stats, events) = run_with_events(config).await;

    assert_eq!(stats.total_forms, 1);
    let home = events
        .iter()
        .find_map(|e| match e {
            CrawlEvent::Page(result) if event_path(&result.url) == "/" => Some(result),
            _ => None,
        })
        .expect("seed page result");

    let form = &home.forms[0];
    assert_eq!(form.method, "GET");
    assert!(form.action.ends_with("/search"));
    let names: Vec<&str> = form.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["q", "lang"]);
    assert!(form.fields[0].required);
}

#[tokio::test]
async fn test_sitemap_urls_seed_the_frontier() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!("User-agent: *\nSitemap: {}/custom-sitemap.xml\n", base)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/custom-sitemap.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!(
                    r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>{base}/low</loc><priority>0.2</priority></url>
  <url><loc>{base}/high</loc><priority>0.9</priority></url>
</urlset>"#
                ))
                .insert_header("content-type", "application/xml"),
        )
        .mount(&server)
        .await;
    mount_page(&server, "/", html_with_links("Home", &[])).await;
    mount_page_expect(&server, "/high", html_with_links("High", &[]), 1).await;
    mount_page_expect(&server, "/low", html_with_links("Low", &[]), 1).await;

    let mut config = create_test_config(&server);
    config.policy.follow_sitemaps = true;
    config.policy.respect_robots_txt = true;
    config.crawler.max_concurrent = 1;

    let (stats, events) = run_with_events(config).await;
    let order: Vec<String> = dispatched(&events).into_iter().map(|(p, _)| p).collect();

    assert_eq!(stats.successful_pages, 3);
    assert_eq!(order, vec!["/", "/high", "/low"]);
}

#[tokio::test]
async fn test_partitioned_workers_split_the_site() {
    let server = MockServer::start().await;
    let children: Vec<String> = (0..16).map(|i| format!("/p/{}", i)).collect();
    let links: Vec<&str> = children.iter().map(String::as_str).collect();
    mount_page(&server, "/", html_with_links("Home", &links)).await;
    for child in &children {
        mount_page(&server, child, html_with_links(child, &[])).await;
    }

    let mut fetched_by_worker = Vec::new();
    for worker_id in 0..2 {
        let mut config = create_test_config(&server);
        config.distributed.worker_id = worker_id;
        config.distributed.total_workers = 2;

        let (stats, events) = run_with_events(config).await;
        assert_eq!(stats.foreign_links + stats.discovered_pages, 17);

        let pages: HashSet<String> = fetched_pages(&events).into_iter().collect();
        for page in pages.iter().filter(|p| p.as_str() != "/") {
            let raw = format!("{}{}", server.uri(), page);
            let url = normalize_url(&raw, &NormalizeOptions::default()).unwrap();
            assert_eq!(assign_owner(&url_hash(&url), 2), worker_id);
        }
        fetched_by_worker.push(pages);
    }

    let overlap: Vec<&String> = fetched_by_worker[0]
        .intersection(&fetched_by_worker[1])
        .collect();
    assert_eq!(overlap, vec!["/"]);

    let union: HashSet<&String> = fetched_by_worker[0]
        .union(&fetched_by_worker[1])
        .collect();
    assert_eq!(union.len(), 17);
}

/// Interrupts a crawl while /b is in flight, then resumes it
async fn run_stop_and_resume(backend: StateBackend) {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page_expect(&server, "/", html_with_links("Home", &["/a", "/b", "/c"]), 1).await;
    mount_page_expect(&server, "/a", html_with_links("A", &[]), 1).await;
    mount_page_expect(&server, "/c", html_with_links("C", &[]), 1).await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html_with_links("B", &[]))
                .insert_header("content-type", "text/html")
                .set_delay(Duration::from_millis(500)),
        )
        .expect(1..=2)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server);
    config.crawler.max_concurrent = 1;
    enable_state(&mut config, &dir, backend);

    // First run: stop once the seed and /a have been fetched
    let (observer, mut receiver) = ChannelObserver::channel();
    let mut crawler = Crawler::new(config.clone(), observer).unwrap();
    let stop = crawler.stop_handle();
    let first = tokio::spawn(async move { crawler.run().await });

    let mut pages = 0;
    while let Some(event) = receiver.recv().await {
        if matches!(event, CrawlEvent::Page(_)) {
            pages += 1;
            if pages == 2 {
                stop.stop();
            }
        }
    }
    let first = first.await.unwrap().unwrap();
    assert!(first.stopped);
    assert_eq!(first.successful_pages, 2);
    assert_eq!(first.queued_pages, 2);
    assert!(first.is_balanced());

    // Second run: resumes from the checkpoint
    let (stats, events) = run_with_events(config).await;
    let fetched = fetched_pages(&events);

    assert!(stats.resumed);
    assert!(!stats.stopped);
    assert!(!fetched.contains(&"/".to_string()));
    assert!(!fetched.contains(&"/a".to_string()));
    assert!(fetched.contains(&"/b".to_string()));
    assert!(fetched.contains(&"/c".to_string()));
    assert_eq!(stats.successful_pages, 4);
    assert_eq!(stats.queued_pages, 0);
    assert!(stats.is_balanced());
}

#[tokio::test]
async fn test_resume_after_stop_with_file_state() {
    run_stop_and_resume(StateBackend::File).await;
}

#[tokio::test]
async fn test_resume_after_stop_with_sqlite_state() {
    run_stop_and_resume(StateBackend::Sqlite).await;
}

#[tokio::test]
async fn test_resume_after_page_budget() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_page_expect(&server, "/", html_with_links("Home", &["/a", "/b", "/c"]), 1).await;
    for leaf in ["/a", "/b", "/c"] {
        mount_page_expect(&server, leaf, html_with_links(leaf, &[]), 1).await;
    }

    let mut config = create_test_config(&server);
    config.crawler.max_concurrent = 1;
    config.crawler.max_pages = 3;
    enable_state(&mut config, &dir, StateBackend::Sqlite);

    let (first, _) = run_with_events(config.clone()).await;
    assert_eq!(first.total_pages, 3);
    assert_eq!(first.queued_pages, 1);

    config.crawler.max_pages = 10;
    let (second, events) = run_with_events(config.clone()).await;
    assert!(second.resumed);
    assert_eq!(fetched_pages(&events), vec!["/c"]);
    assert_eq!(second.total_pages, 4);
    assert_eq!(second.successful_pages, 4);

    // The finished crawl discarded its checkpoint
    let identity = Crawler::new(config, ())
        .unwrap()
        .identity()
        .unwrap()
        .to_string();
    let mut store = SqliteStateStore::new(&dir.path().join(DATABASE_FILE)).unwrap();
    assert!(store.load(&identity).unwrap().is_none());
}

#[tokio::test]
async fn test_fresh_start_ignores_checkpoint() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_page_expect(&server, "/", html_with_links("Home", &["/a", "/b"]), 2).await;
    mount_page(&server, "/a", html_with_links("A", &[])).await;
    mount_page(&server, "/b", html_with_links("B", &[])).await;

    let mut config = create_test_config(&server);
    config.crawler.max_concurrent = 1;
    config.crawler.max_pages = 2;
    enable_state(&mut config, &dir, StateBackend::File);

    let (first, _) = run_with_events(config.clone()).await;
    assert_eq!(first.queued_pages, 1);

    let (observer, _receiver) = ChannelObserver::channel();
    let mut crawler = Crawler::new(config, observer).unwrap().with_fresh_start(true);
    let second = crawler.run().await.unwrap();

    assert!(!second.resumed);
    assert_eq!(second.total_pages, 2);
}

#[tokio::test]
async fn test_corrupt_checkpoint_handling() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_page(&server, "/", html_with_links("Home", &[])).await;

    let mut config = create_test_config(&server);
    enable_state(&mut config, &dir, StateBackend::File);

    let identity = Crawler::new(config.clone(), ())
        .unwrap()
        .identity()
        .unwrap()
        .to_string();
    let checkpoint = FileStateStore::new(dir.path()).checkpoint_path(&identity);
    std::fs::create_dir_all(checkpoint.parent().unwrap()).unwrap();
    std::fs::write(&checkpoint, "{ not json").unwrap();

    let mut strict = config.clone();
    strict.state.strict_resume = true;
    let mut crawler = Crawler::new(strict, ()).unwrap();
    assert!(matches!(
        crawler.run().await,
        Err(TrawlerError::StateLoad(_))
    ));

    let mut crawler = Crawler::new(config, ()).unwrap();
    let stats = crawler.run().await.unwrap();
    assert!(stats.state_load_error.is_some());
    assert!(!stats.resumed);
    assert_eq!(stats.successful_pages, 1);
}
