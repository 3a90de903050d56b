//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that ties every component together:
//! - Seeding the frontier (seed URL, optional sitemaps) or resuming it
//! - Dispatching eligible tasks to a bounded pool of fetch tasks
//! - Applying robots.txt, politeness, scope, and partition decisions
//! - Applying fetch outcomes, enqueueing discovered links
//! - Checkpointing, stop handling, and final statistics
//!
//! The coordinator is the only writer of crawl state. Fetch tasks receive an
//! owned [`CrawlTask`] and hand back a [`PageOutcome`]. Robots.txt files load
//! in background tasks too; until an origin's file is stored, its tasks stay
//! queued the same way tasks of a cooling-down domain do.

use crate::config::{validate, Config};
use crate::crawler::fetcher::{build_http_client, fetch_page, FetchContext, PageOutcome};
use crate::crawler::frontier::Frontier;
use crate::crawler::observer::CrawlObserver;
use crate::crawler::stats::CrawlStats;
use crate::crawler::types::{CrawlError, CrawlErrorKind, CrawlTask};
use crate::extract::ExtractOptions;
use crate::filter::ContentFilter;
use crate::partition::Partitioner;
use crate::robots::{RobotsEvaluator, RobotsInfo, RobotsLoad};
use crate::sitemap::SitemapLoader;
use crate::state::{CrawlState, DelayManager, StateManager};
use crate::url::{extract_domain, normalize_url, origin_of, UrlFilter};
use crate::TrawlerError;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tokio::task::{JoinError, JoinSet};
use url::Url;

/// Wait used when nothing else bounds an idle scheduling pass
const IDLE_POLL: Duration = Duration::from_millis(10);

/// Completed pages between progress log lines
const PROGRESS_INTERVAL: u64 = 10;

/// Requests a running crawl to stop
///
/// Stopping halts new dispatch and abandons in-flight fetches; they produce
/// no result and stay in the checkpointed frontier.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// What woke the crawl loop
enum LoopEvent {
    Fetched(Option<Result<PageOutcome, JoinError>>),
    RobotsLoaded(Option<Result<RobotsLoad, JoinError>>),
    Wake,
    Stop,
}

/// Main crawler structure
pub struct Crawler {
    config: Config,
    seed: Url,
    scope: UrlFilter,
    content_filter: ContentFilter,
    partitioner: Partitioner,
    fetch: Arc<FetchContext>,
    robots: RobotsEvaluator,
    robots_pending: HashSet<String>,
    delays: DelayManager,
    frontier: Frontier,
    visited: HashSet<String>,
    foreign: HashSet<String>,
    in_flight: HashMap<String, CrawlTask>,
    stats: CrawlStats,
    state: Option<StateManager>,
    observer: Box<dyn CrawlObserver>,
    stop: StopHandle,
    fresh: bool,
    finished: bool,
}

impl Crawler {
    /// Creates a new crawler instance
    ///
    /// The configuration is validated here, so invalid option combinations
    /// surface before any request is made.
    ///
    /// # Arguments
    ///
    /// * `config` - The crawl configuration
    /// * `observer` - Receives pages, errors, and the final statistics
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Ready to [`run`](Crawler::run)
    /// * `Err(TrawlerError)` - Invalid configuration, HTTP client or state
    ///   backend failed to initialize
    pub fn new(
        config: Config,
        observer: impl CrawlObserver + 'static,
    ) -> Result<Self, TrawlerError> {
        validate(&config)?;

        let seed = normalize_url(&config.seed, &config.normalize)?;
        let scope = UrlFilter::from_config(&config.scope, &seed)?;
        let content_filter = ContentFilter::new(&config.content);
        let partitioner = Partitioner::new(
            config.distributed.worker_id,
            config.distributed.total_workers,
        );

        let client = build_http_client(&config.crawler)?;
        let robots = RobotsEvaluator::new(client.clone(), config.crawler.user_agent.clone());
        let fetch = Arc::new(FetchContext {
            client,
            content_filter: content_filter.clone(),
            extract: ExtractOptions {
                forms: config.content.extract_forms,
                js_links: config.content.extract_js_links,
            },
        });

        let state = if config.state.resumable {
            Some(StateManager::open(&config, seed.as_str())?)
        } else {
            None
        };

        Ok(Self {
            delays: DelayManager::new(Duration::from_millis(config.crawler.delay_ms)),
            frontier: Frontier::new(config.crawler.strategy),
            config,
            seed,
            scope,
            content_filter,
            partitioner,
            fetch,
            robots,
            robots_pending: HashSet::new(),
            visited: HashSet::new(),
            foreign: HashSet::new(),
            in_flight: HashMap::new(),
            stats: CrawlStats::default(),
            state,
            observer: Box::new(observer),
            stop: StopHandle::default(),
            fresh: false,
            finished: false,
        })
    }

    /// Discards any stored checkpoint instead of resuming from it
    pub fn with_fresh_start(mut self, fresh: bool) -> Self {
        self.fresh = fresh;
        self
    }

    /// Handle for stopping the crawl from another task
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// The normalized seed URL
    pub fn seed(&self) -> &Url {
        &self.seed
    }

    /// Checkpoint identity, when the crawl is resumable
    pub fn identity(&self) -> Option<&str> {
        self.state.as_ref().map(StateManager::identity)
    }

    /// Runs the crawl to completion
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlStats)` - Final statistics (also passed to `on_complete`)
    /// * `Err(TrawlerError)` - The run could not start (strict resume failed,
    ///   state backend error) or was already run
    pub async fn run(&mut self) -> Result<CrawlStats, TrawlerError> {
        if self.finished {
            return Err(TrawlerError::AlreadyRun);
        }

        let resumed = self.restore()?;
        self.stats.started_at = Some(Utc::now());

        if resumed {
            tracing::info!(
                "Resuming crawl of {} ({} queued, {} visited)",
                self.seed,
                self.frontier.len(),
                self.visited.len()
            );
        } else {
            tracing::info!("Starting crawl of {}", self.seed);
            self.seed_frontier().await;
        }

        self.crawl_loop().await;
        Ok(self.finish())
    }

    /// Loads a matching checkpoint; returns true if the run resumes from it
    fn restore(&mut self) -> Result<bool, TrawlerError> {
        let Some(state) = self.state.as_mut() else {
            return Ok(false);
        };

        if self.fresh {
            state.reset()?;
            tracing::info!("Discarded checkpoint {} (fresh start)", state.identity());
            return Ok(false);
        }

        match state.load() {
            Ok(Some(snapshot)) => {
                self.apply_snapshot(snapshot);
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(e) if self.config.state.strict_resume => Err(e),
            Err(e) => {
                tracing::warn!("{}; starting fresh", e);
                self.stats.state_load_error = Some(e.to_string());
                state.reset()?;
                Ok(false)
            }
        }
    }

    fn apply_snapshot(&mut self, snapshot: CrawlState) {
        self.frontier = Frontier::from_snapshot(self.config.crawler.strategy, snapshot.frontier);
        self.visited = snapshot.visited.into_iter().collect();

        let state_load_error = self.stats.state_load_error.take();
        self.stats = CrawlStats {
            resumed: true,
            stopped: false,
            queued_pages: 0,
            finished_at: None,
            state_load_error,
            ..snapshot.stats
        };
    }

    async fn seed_frontier(&mut self) {
        let seed = self.seed.to_string();
        self.enqueue(&seed, 0, None, true);

        if self.config.policy.follow_sitemaps {
            self.seed_from_sitemaps().await;
        }
    }

    async fn seed_from_sitemaps(&mut self) {
        let info = self.robots.get_robots_info(&origin_of(&self.seed)).await;
        if self.config.policy.respect_robots_txt {
            self.apply_crawl_delay(&info);
        }
        let declared = info.sitemap_urls.clone();
        let loader = SitemapLoader::new(self.fetch.client.clone(), self.config.normalize.clone());

        let mut added = 0;
        for entry in loader.get_all_urls(&self.seed, &declared).await {
            if self.enqueue(&entry.url, 0, None, false) {
                added += 1;
            }
        }
        tracing::info!("Seeded {} URLs from sitemaps", added);
    }

    /// Normalizes a discovered URL and queues it if every policy accepts it
    ///
    /// Returns true if a new task entered the frontier. The seed is exempt
    /// from the partition check so every worker has a starting point.
    fn enqueue(&mut self, raw: &str, depth: u32, parent: Option<&str>, is_seed: bool) -> bool {
        if depth > self.config.crawler.max_depth {
            return false;
        }

        let url = match normalize_url(raw, &self.config.normalize) {
            Ok(url) => url,
            Err(e) => {
                tracing::trace!("Skipping {}: {}", raw, e);
                return false;
            }
        };

        if !self.scope.is_allowed(&url) {
            tracing::trace!("Out of scope: {}", url);
            return false;
        }

        if !self.content_filter.allows_url(&url) {
            tracing::trace!("Filtered by extension: {}", url);
            return false;
        }

        let task = CrawlTask::new(&url, depth, parent.map(str::to_string));
        if self.visited.contains(&task.hash) {
            return false;
        }

        if !is_seed && !self.partitioner.owns(&task.hash) {
            if self.foreign.insert(task.hash) {
                self.stats.foreign_links += 1;
            }
            return false;
        }

        self.visited.insert(task.hash.clone());
        self.stats.discovered_pages += 1;
        self.frontier.push(task);
        true
    }

    async fn crawl_loop(&mut self) {
        let mut tasks: JoinSet<PageOutcome> = JoinSet::new();
        let mut robots_loads: JoinSet<RobotsLoad> = JoinSet::new();
        let notify = Arc::clone(&self.stop.notify);

        loop {
            if self.stop.is_stopped() {
                break;
            }

            self.dispatch_ready(&mut tasks, &mut robots_loads);

            if tasks.is_empty() {
                self.reap_orphans();
                if self.frontier.is_empty() || self.budget_exhausted() || self.stop.is_stopped() {
                    break;
                }

                if robots_loads.is_empty() {
                    let wait = self.next_wake(tasks.len()).unwrap_or(IDLE_POLL);
                    tracing::trace!("All queued domains cooling down; sleeping {:?}", wait);
                    tokio::select! {
                        _ = tokio::time::sleep(wait) => {}
                        _ = notify.notified() => {}
                    }
                    continue;
                }
            }

            let wake = self.next_wake(tasks.len());
            let event = tokio::select! {
                joined = tasks.join_next(), if !tasks.is_empty() => LoopEvent::Fetched(joined),
                loaded = robots_loads.join_next(), if !robots_loads.is_empty() => {
                    LoopEvent::RobotsLoaded(loaded)
                }
                _ = sleep_or_pending(wake) => LoopEvent::Wake,
                _ = notify.notified() => LoopEvent::Stop,
            };

            match event {
                LoopEvent::Fetched(Some(Ok(outcome))) => self.handle_outcome(outcome),
                LoopEvent::Fetched(Some(Err(e))) => {
                    tracing::error!("Fetch task failed: {}", e);
                }
                LoopEvent::RobotsLoaded(Some(Ok(load))) => self.handle_robots_load(load),
                LoopEvent::RobotsLoaded(Some(Err(e))) => {
                    // The origin is unknown; queued tasks request it again
                    tracing::error!("Robots.txt task failed: {}", e);
                    self.robots_pending.clear();
                }
                LoopEvent::Fetched(None)
                | LoopEvent::RobotsLoaded(None)
                | LoopEvent::Wake
                | LoopEvent::Stop => {}
            }
        }

        robots_loads.shutdown().await;
        if !tasks.is_empty() {
            tracing::info!("Abandoning {} in-flight fetches", tasks.len());
            tasks.shutdown().await;
        }
    }

    /// Fills free concurrency slots with eligible tasks
    ///
    /// A task is eligible once its origin's robots.txt is loaded (when robots
    /// are respected) and its domain has cooled down. Loading starts in the
    /// background for origins seen here for the first time.
    fn dispatch_ready(
        &mut self,
        tasks: &mut JoinSet<PageOutcome>,
        robots_loads: &mut JoinSet<RobotsLoad>,
    ) {
        let max_concurrent = self.config.crawler.max_concurrent as usize;
        let respect_robots = self.config.policy.respect_robots_txt;

        while tasks.len() < max_concurrent && !self.budget_exhausted() && !self.stop.is_stopped() {
            let now = Instant::now();
            let min_depth = self.in_flight_min_depth();
            let mut unloaded: Vec<String> = Vec::new();
            let delays = &self.delays;
            let robots = &self.robots;

            let popped = self.frontier.pop_eligible(min_depth, |t| {
                if respect_robots {
                    if let Some(origin) = task_origin(t) {
                        if !robots.is_cached(&origin) {
                            unloaded.push(origin);
                            return false;
                        }
                    }
                }
                delays.is_eligible(&t.domain, now)
            });

            for origin in unloaded {
                self.request_robots(origin, robots_loads);
            }

            let Some(task) = popped else {
                break;
            };

            if respect_robots && !self.check_robots(&task) {
                continue;
            }

            self.dispatch(task, tasks);
        }
    }

    fn request_robots(&mut self, origin: String, robots_loads: &mut JoinSet<RobotsLoad>) {
        if self.robots_pending.contains(&origin) {
            return;
        }
        tracing::debug!("Fetching robots.txt for {}", origin);
        robots_loads.spawn(self.robots.load(&origin));
        self.robots_pending.insert(origin);
    }

    fn handle_robots_load(&mut self, load: RobotsLoad) {
        self.robots_pending.remove(&load.origin);
        let info = self.robots.store(load);
        self.apply_crawl_delay(&info);
    }

    /// Raises the politeness delay of the origin's host to its crawl-delay
    fn apply_crawl_delay(&mut self, info: &RobotsInfo) {
        let Some(seconds) = info.crawl_delay else {
            return;
        };
        let domain = Url::parse(&info.origin)
            .ok()
            .and_then(|url| extract_domain(&url));
        if let Some(domain) = domain {
            tracing::debug!("Crawl-delay {}s for {}", seconds, domain);
            self.delays.set_crawl_delay(&domain, seconds);
        }
    }

    /// Applies the origin's loaded robots.txt to a task about to be dispatched
    ///
    /// A disallowed task is reported, dropped, and counts toward the
    /// checkpoint interval like any other resolved page.
    fn check_robots(&mut self, task: &CrawlTask) -> bool {
        let Ok(url) = Url::parse(&task.url) else {
            return true;
        };

        let origin = origin_of(&url);
        let allowed = self
            .robots
            .cached(&origin)
            .map_or(true, |info| info.is_allowed(&url, &self.config.crawler.user_agent));
        if allowed {
            return true;
        }

        tracing::debug!("Blocked by robots.txt: {}", task.url);
        let error = CrawlError::new(
            task,
            CrawlErrorKind::RobotsDenied,
            format!("Disallowed by {}/robots.txt", origin),
        );
        self.stats.record_failure(&error);
        self.observer.on_error(&error);
        self.log_progress();
        self.maybe_checkpoint();
        false
    }

    fn dispatch(&mut self, task: CrawlTask, tasks: &mut JoinSet<PageOutcome>) {
        self.delays.record_request(&task.domain, Instant::now());
        self.stats.record_attempt(task.depth);
        self.observer.on_dispatch(&task);
        tracing::debug!("Fetching {} (depth {})", task.url, task.depth);

        self.in_flight.insert(task.hash.clone(), task.clone());
        let ctx = Arc::clone(&self.fetch);
        tasks.spawn(async move { fetch_page(&ctx, task).await });
    }

    fn handle_outcome(&mut self, outcome: PageOutcome) {
        self.in_flight.remove(&outcome.task().hash);

        match outcome {
            PageOutcome::Success { task, result } => {
                self.stats.record_success(&result);
                tracing::debug!(
                    "Fetched {} ({} links, {} ms)",
                    result.url,
                    result.links.len(),
                    result.load_time_ms
                );

                let child_depth = task.depth + 1;
                if child_depth <= self.config.crawler.max_depth {
                    for link in &result.links {
                        self.enqueue(link, child_depth, Some(task.url.as_str()), false);
                    }
                }
                self.observer.on_page(&result);
            }
            PageOutcome::Failed { error, .. } => {
                tracing::debug!("Failed {}: {}", error.url, error.error);
                self.stats.record_failure(&error);
                self.observer.on_error(&error);
            }
        }

        self.log_progress();
        self.maybe_checkpoint();
    }

    /// Fails in-flight tasks whose fetch task died without an outcome
    fn reap_orphans(&mut self) {
        if self.in_flight.is_empty() || self.stop.is_stopped() {
            return;
        }

        let orphans: Vec<CrawlTask> = self.in_flight.drain().map(|(_, task)| task).collect();
        for task in orphans {
            let error = CrawlError::new(
                &task,
                CrawlErrorKind::Fetch,
                "fetch task terminated without a result",
            );
            self.stats.record_failure(&error);
            self.observer.on_error(&error);
        }
    }

    fn log_progress(&self) {
        let done = self.stats.successful_pages + self.stats.failed_pages;
        if done > 0 && done % PROGRESS_INTERVAL == 0 {
            tracing::info!(
                "Progress: {} pages crawled, {} failed, {} queued, {} in flight",
                self.stats.successful_pages,
                self.stats.failed_pages,
                self.frontier.len(),
                self.in_flight.len()
            );
        }
    }

    fn maybe_checkpoint(&mut self) {
        let due = self
            .state
            .as_mut()
            .map_or(false, StateManager::record_completion);

        if due {
            if let Err(e) = self.save_checkpoint() {
                tracing::warn!("Failed to save checkpoint: {}", e);
            }
        }
    }

    fn save_checkpoint(&mut self) -> Result<(), TrawlerError> {
        let pending = self.pending_tasks();
        let mut visited: Vec<String> = self.visited.iter().cloned().collect();
        visited.sort();

        let mut stats = self.stats.clone();
        stats.queued_pages = pending.len() as u64;

        match self.state.as_mut() {
            Some(state) => state.checkpoint(pending, visited, &stats),
            None => Ok(()),
        }
    }

    /// In-flight tasks (shallowest first) followed by the frontier
    fn pending_tasks(&self) -> Vec<CrawlTask> {
        let mut pending: Vec<CrawlTask> = self.in_flight.values().cloned().collect();
        pending.sort_by(|a, b| {
            a.depth
                .cmp(&b.depth)
                .then_with(|| a.discovered_at.cmp(&b.discovered_at))
        });
        pending.extend(self.frontier.snapshot());
        pending
    }

    fn finish(&mut self) -> CrawlStats {
        self.finished = true;
        self.stats.stopped = self.stop.is_stopped();
        self.stats.queued_pages = (self.frontier.len() + self.in_flight.len()) as u64;
        self.stats.finished_at = Some(Utc::now());

        if self.state.is_some() {
            let result = if self.stats.queued_pages == 0 {
                self.state.as_mut().map_or(Ok(()), StateManager::complete)
            } else {
                self.save_checkpoint()
            };
            if let Err(e) = result {
                tracing::warn!("Failed to finalize crawl state: {}", e);
            }
        }

        tracing::info!(
            "Crawl {}: {} successful, {} failed, {} queued",
            if self.stats.stopped { "stopped" } else { "completed" },
            self.stats.successful_pages,
            self.stats.failed_pages,
            self.stats.queued_pages
        );

        self.observer.on_complete(&self.stats);
        self.stats.clone()
    }

    fn budget_exhausted(&self) -> bool {
        self.stats.total_pages >= self.config.crawler.max_pages
    }

    fn in_flight_min_depth(&self) -> Option<u32> {
        self.in_flight.values().map(|t| t.depth).min()
    }

    /// Time until the next queued task's domain becomes eligible
    ///
    /// `None` when no wake-up is needed: every slot is busy, the page budget
    /// is spent, or nothing can be dispatched until an in-flight fetch or a
    /// robots.txt load ends.
    fn next_wake(&self, running: usize) -> Option<Duration> {
        if running >= self.config.crawler.max_concurrent as usize || self.budget_exhausted() {
            return None;
        }

        let now = Instant::now();
        self.frontier
            .candidates(self.in_flight_min_depth())
            .into_iter()
            .filter(|t| self.robots_ready(t))
            .map(|t| self.delays.time_until_eligible(&t.domain, now))
            .min()
    }

    fn robots_ready(&self, task: &CrawlTask) -> bool {
        if !self.config.policy.respect_robots_txt {
            return true;
        }
        task_origin(task).map_or(true, |origin| self.robots.is_cached(&origin))
    }
}

fn task_origin(task: &CrawlTask) -> Option<String> {
    Url::parse(&task.url).ok().map(|url| origin_of(&url))
}

async fn sleep_or_pending(wait: Option<Duration>) {
    match wait {
        Some(wait) => tokio::time::sleep(wait).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StateBackend;
    use crate::crawler::observer::{ChannelObserver, CrawlEvent};
    use std::sync::Mutex;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Records when each URL was handed to a fetch task
    #[derive(Clone, Default)]
    struct DispatchClock {
        dispatched: Arc<Mutex<Vec<(String, Instant)>>>,
    }

    impl DispatchClock {
        fn at(&self, url: &str) -> Instant {
            let dispatched = self.dispatched.lock().unwrap();
            dispatched
                .iter()
                .find(|(u, _)| u == url)
                .map(|(_, at)| *at)
                .unwrap_or_else(|| panic!("{} was never dispatched", url))
        }
    }

    impl CrawlObserver for DispatchClock {
        fn on_dispatch(&mut self, task: &CrawlTask) {
            self.dispatched
                .lock()
                .unwrap()
                .push((task.url.clone(), Instant::now()));
        }
    }

    async fn mount_robots(server: &MockServer, body: &str, delay: Duration) {
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(body.to_string())
                    .set_delay(delay),
            )
            .mount(server)
            .await;
    }

    fn create_test_config(seed: &str) -> Config {
        let mut config = Config::new(seed);
        config.crawler.delay_ms = 0;
        config.crawler.max_depth = 2;
        config.crawler.max_pages = 50;
        config.crawler.request_timeout_ms = 2_000;
        config.policy.respect_robots_txt = false;
        config
    }

    async fn mount_page(server: &MockServer, at: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(body.to_string())
                    .insert_header("content-type", "text/html"),
            )
            .mount(server)
            .await;
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = create_test_config("https://example.com/");
        config.crawler.max_concurrent = 0;
        assert!(matches!(
            Crawler::new(config, ()),
            Err(TrawlerError::Config(_))
        ));
    }

    #[test]
    fn test_enqueue_rules() {
        let config = create_test_config("https://example.com/");
        let mut crawler = Crawler::new(config, ()).unwrap();

        assert!(crawler.enqueue("https://example.com/", 0, None, true));
        assert!(!crawler.enqueue("https://EXAMPLE.com:443/#top", 1, None, false));
        assert!(!crawler.enqueue("https://other.org/", 1, None, false));
        assert!(!crawler.enqueue("https://example.com/deep", 3, None, false));
        assert!(!crawler.enqueue("not a url", 1, None, false));
        assert!(crawler.enqueue("https://example.com/a", 1, None, false));

        assert_eq!(crawler.stats.discovered_pages, 2);
        assert_eq!(crawler.frontier.len(), 2);
    }

    #[test]
    fn test_foreign_links_are_counted_once() {
        let mut config = create_test_config("https://example.com/");
        config.distributed.total_workers = 2;
        config.distributed.worker_id = 0;
        let mut crawler = Crawler::new(config, ()).unwrap();

        let mut queued = 0;
        for i in 0..40 {
            let link = format!("https://example.com/page/{}", i);
            if crawler.enqueue(&link, 1, None, false) {
                queued += 1;
            }
            crawler.enqueue(&link, 1, None, false);
        }

        assert_eq!(crawler.stats.discovered_pages, queued);
        assert_eq!(crawler.stats.foreign_links, 40 - queued);
    }

    #[tokio::test]
    async fn test_run_crawls_and_completes_once() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "/",
            r#"<a href="/a">A</a><a href="/b">B</a><a href="/a">A again</a>"#,
        )
        .await;
        mount_page(&server, "/a", r#"<a href="/">home</a>"#).await;
        mount_page(&server, "/b", "<p>leaf</p>").await;

        let (observer, mut events) = ChannelObserver::channel();
        let mut crawler = Crawler::new(create_test_config(&server.uri()), observer).unwrap();
        let stats = crawler.run().await.unwrap();

        assert_eq!(stats.successful_pages, 3);
        assert_eq!(stats.total_pages, 3);
        assert!(stats.is_balanced());

        let mut completions = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event, CrawlEvent::Complete(_)) {
                completions += 1;
            }
        }
        assert_eq!(completions, 1);
    }

    #[tokio::test]
    async fn test_second_run_is_rejected() {
        let server = MockServer::start().await;
        mount_page(&server, "/", "<p>only</p>").await;

        let mut crawler = Crawler::new(create_test_config(&server.uri()), ()).unwrap();
        crawler.run().await.unwrap();
        assert!(crawler.run().await.is_err());
    }

    #[tokio::test]
    async fn test_stop_before_run_dispatches_nothing() {
        let server = MockServer::start().await;
        mount_page(&server, "/", "<p>never</p>").await;

        let mut crawler = Crawler::new(create_test_config(&server.uri()), ()).unwrap();
        crawler.stop_handle().stop();
        let stats = crawler.run().await.unwrap();

        assert!(stats.stopped);
        assert_eq!(stats.total_pages, 0);
        assert_eq!(stats.queued_pages, 1);
        assert!(stats.is_balanced());
    }

    #[tokio::test]
    async fn test_politeness_delay_between_same_domain_requests() {
        let server = MockServer::start().await;
        mount_page(&server, "/", r#"<a href="/a">A</a>"#).await;
        mount_page(&server, "/a", "<p>leaf</p>").await;

        let mut config = create_test_config(&server.uri());
        config.crawler.delay_ms = 300;

        let started = Instant::now();
        let mut crawler = Crawler::new(config, ()).unwrap();
        let stats = crawler.run().await.unwrap();

        assert_eq!(stats.successful_pages, 2);
        assert!(started.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_slow_robots_does_not_hold_back_other_origins() {
        let fast = MockServer::start().await;
        let slow = MockServer::start().await;
        mount_robots(&slow, "User-agent: *\nAllow: /\n", Duration::from_millis(1500)).await;
        mount_page(&slow, "/s", "<p>slow origin</p>").await;

        let home = format!(
            r#"<a href="{}/s">S</a><a href="/f1">F1</a><a href="/f2">F2</a>"#,
            slow.uri()
        );
        mount_page(&fast, "/", &home).await;
        mount_page(&fast, "/f1", "<p>f1</p>").await;
        mount_page(&fast, "/f2", "<p>f2</p>").await;

        let mut config = create_test_config(&fast.uri());
        config.policy.respect_robots_txt = true;
        config.crawler.max_concurrent = 4;
        config.crawler.request_timeout_ms = 5_000;

        let clock = DispatchClock::default();
        let mut crawler = Crawler::new(config, clock.clone()).unwrap();
        let stats = crawler.run().await.unwrap();
        assert_eq!(stats.successful_pages, 4);

        let home_at = clock.at(&format!("{}/", fast.uri()));
        let f1_at = clock.at(&format!("{}/f1", fast.uri()));
        let f2_at = clock.at(&format!("{}/f2", fast.uri()));
        let slow_at = clock.at(&format!("{}/s", slow.uri()));

        assert!(f1_at.duration_since(home_at) < Duration::from_millis(1000));
        assert!(f2_at.duration_since(home_at) < Duration::from_millis(1000));
        assert!(slow_at.duration_since(home_at) >= Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn test_stop_during_robots_load_returns_promptly() {
        let server = MockServer::start().await;
        mount_robots(&server, "User-agent: *\n", Duration::from_secs(10)).await;
        mount_page(&server, "/", "<p>never</p>").await;

        let mut config = create_test_config(&server.uri());
        config.policy.respect_robots_txt = true;
        config.crawler.request_timeout_ms = 20_000;

        let mut crawler = Crawler::new(config, ()).unwrap();
        let stop = crawler.stop_handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            stop.stop();
        });

        let started = Instant::now();
        let stats = crawler.run().await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(stats.stopped);
        assert_eq!(stats.total_pages, 0);
        assert_eq!(stats.queued_pages, 1);
    }

    #[tokio::test]
    async fn test_crawl_delay_of_second_origin_on_same_host() {
        let first = MockServer::start().await;
        let second = MockServer::start().await;
        mount_robots(&second, "User-agent: *\nCrawl-delay: 1\n", Duration::ZERO).await;
        mount_page(&second, "/page", "<p>second</p>").await;
        mount_page(
            &first,
            "/",
            &format!(r#"<a href="{}/page">second</a>"#, second.uri()),
        )
        .await;

        let mut config = create_test_config(&first.uri());
        config.policy.respect_robots_txt = true;

        let clock = DispatchClock::default();
        let mut crawler = Crawler::new(config, clock.clone()).unwrap();
        let stats = crawler.run().await.unwrap();
        assert_eq!(stats.successful_pages, 2);

        // Both servers listen on 127.0.0.1, so they share one politeness slot
        let first_at = clock.at(&format!("{}/", first.uri()));
        let second_at = clock.at(&format!("{}/page", second.uri()));
        assert!(second_at.duration_since(first_at) >= Duration::from_secs(1));
    }

    #[test]
    fn test_robots_denial_counts_toward_checkpoint_interval() {
        let dir = TempDir::new().unwrap();
        let mut config = create_test_config("https://example.com/");
        config.policy.respect_robots_txt = true;
        config.state.resumable = true;
        config.state.state_dir = dir.path().to_string_lossy().into_owned();
        config.state.checkpoint_interval = 1;
        config.state.backend = StateBackend::File;

        let mut crawler = Crawler::new(config, ()).unwrap();
        crawler.robots.store(RobotsLoad {
            origin: "https://example.com".to_string(),
            result: Ok(RobotsInfo::parse(
                "https://example.com",
                "User-agent: *\nDisallow: /private\n",
                "TestBot/1.0",
            )),
        });

        assert!(crawler.enqueue("https://example.com/private/a", 1, None, false));
        let task = crawler.frontier.pop_eligible(None, |_| true).unwrap();
        assert!(!crawler.check_robots(&task));

        let saved = crawler.state.as_mut().unwrap().load().unwrap().unwrap();
        assert_eq!(saved.stats.failed_pages, 1);
        assert_eq!(saved.stats.robots_denied, 1);
        assert_eq!(saved.visited, vec![task.hash]);
    }
}
