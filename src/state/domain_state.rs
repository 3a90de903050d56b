use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Tracks the politeness state of one domain during crawling
#[derive(Debug, Clone, Default)]
pub struct DomainState {
    /// Number of requests dispatched to this domain in the current run
    pub request_count: u32,

    /// When the last request to this domain was dispatched
    pub last_request_time: Option<Instant>,

    /// Crawl-delay declared by the domain's robots.txt
    pub crawl_delay: Option<Duration>,
}

impl DomainState {
    /// Creates a new DomainState with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that a request was dispatched to this domain
    pub fn record_request(&mut self, now: Instant) {
        self.request_count += 1;
        self.last_request_time = Some(now);
    }

    /// Time left before the next request may be dispatched, given its delay
    ///
    /// Returns `Duration::ZERO` when a request can be made now.
    pub fn time_until_next_request(&self, delay: Duration, now: Instant) -> Duration {
        match self.last_request_time {
            Some(last) => delay.saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }
}

/// Per-domain rate limiting for the crawl orchestrator
///
/// The effective delay of a domain is the larger of the configured delay and
/// the crawl-delay its robots.txt declares. The manager never sleeps; the
/// orchestrator polls eligibility on every scheduling pass and skips domains
/// that are still cooling down.
#[derive(Debug, Clone)]
pub struct DelayManager {
    default_delay: Duration,
    domains: HashMap<String, DomainState>,
}

impl DelayManager {
    /// Creates a manager with the configured per-domain delay
    pub fn new(default_delay: Duration) -> Self {
        Self {
            default_delay,
            domains: HashMap::new(),
        }
    }

    /// Effective minimum interval between requests to `domain`
    pub fn get_delay(&self, domain: &str) -> Duration {
        let robots_delay = self
            .domains
            .get(domain)
            .and_then(|state| state.crawl_delay)
            .unwrap_or(Duration::ZERO);

        self.default_delay.max(robots_delay)
    }

    /// Stores the robots.txt crawl-delay for `domain`
    ///
    /// Several origins (ports, schemes) can share one host; the longest delay
    /// any of them declares is kept. Negative or non-finite values are ignored.
    pub fn set_crawl_delay(&mut self, domain: &str, seconds: f64) {
        if !seconds.is_finite() || seconds < 0.0 {
            return;
        }
        let delay = Duration::from_secs_f64(seconds);
        let state = self.domains.entry(domain.to_string()).or_default();
        state.crawl_delay = Some(state.crawl_delay.map_or(delay, |current| current.max(delay)));
    }

    /// Returns true if a request to `domain` may be dispatched at `now`
    pub fn is_eligible(&self, domain: &str, now: Instant) -> bool {
        self.time_until_eligible(domain, now).is_zero()
    }

    /// Time left before `domain` becomes eligible (zero if it already is)
    pub fn time_until_eligible(&self, domain: &str, now: Instant) -> Duration {
        match self.domains.get(domain) {
            Some(state) => state.time_until_next_request(self.get_delay(domain), now),
            None => Duration::ZERO,
        }
    }

    /// Records a dispatch to `domain` at `now`
    pub fn record_request(&mut self, domain: &str, now: Instant) {
        self.domains
            .entry(domain.to_string())
            .or_default()
            .record_request(now);
    }

    /// Number of requests dispatched to `domain` so far
    pub fn request_count(&self, domain: &str) -> u32 {
        self.domains
            .get(domain)
            .map(|state| state.request_count)
            .unwrap_or(0)
    }
}
