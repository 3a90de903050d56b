//! Robots.txt parser implementation
//!
//! Rule matching is delegated to the robotstxt crate's Google-compatible
//! matcher. The directives the matcher does not expose (crawl delay, sitemap
//! locations, and the rules of the group that applies to us) are read here.

use robotstxt::DefaultMatcher;
use url::Url;

/// Policy information from one origin's robots.txt
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RobotsInfo {
    /// `scheme://host[:port]` the file was fetched from
    pub origin: String,

    /// Disallow paths of the group that applies to our user agent
    pub disallow_rules: Vec<String>,

    /// Allow paths of the group that applies to our user agent
    pub allow_rules: Vec<String>,

    /// Crawl-delay in seconds declared for our user agent
    pub crawl_delay: Option<f64>,

    /// Sitemap locations declared anywhere in the file
    pub sitemap_urls: Vec<String>,

    /// Raw file content; empty means allow all
    pub raw: String,
}

/// A `User-agent` group being accumulated while scanning the file
#[derive(Default)]
struct Group {
    agents: Vec<String>,
    allow: Vec<String>,
    disallow: Vec<String>,
    crawl_delay: Option<f64>,
    has_rules: bool,
}

impl RobotsInfo {
    /// Creates a permissive policy for an origin without a usable robots.txt
    pub fn allow_all(origin: &str) -> Self {
        Self {
            origin: origin.to_string(),
            ..Self::default()
        }
    }

    /// Parses robots.txt content for the given user agent
    ///
    /// # Arguments
    ///
    /// * `origin` - The origin the content was fetched from
    /// * `content` - The raw robots.txt file content
    /// * `user_agent` - Our full User-Agent string
    ///
    /// # Group Selection
    ///
    /// Groups whose `User-agent` equals our product token (case-insensitive)
    /// win over the `*` group. When both a specific group and `*` exist, only
    /// the specific group's rules and crawl delay apply.
    pub fn parse(origin: &str, content: &str, user_agent: &str) -> Self {
        let token = product_token(user_agent).to_lowercase();

        let mut groups: Vec<Group> = Vec::new();
        let mut current = Group::default();
        let mut sitemap_urls = Vec::new();

        for line in content.lines() {
            let line = line.split('#').next().unwrap_or_default().trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    // A user-agent line after rules starts a new group
                    if current.has_rules {
                        groups.push(std::mem::take(&mut current));
                    }
                    current.agents.push(value.to_lowercase());
                }
                "allow" if !value.is_empty() => {
                    current.allow.push(value.to_string());
                    current.has_rules = true;
                }
                "disallow" => {
                    if !value.is_empty() {
                        current.disallow.push(value.to_string());
                    }
                    current.has_rules = true;
                }
                "crawl-delay" => {
                    if let Ok(delay) = value.parse::<f64>() {
                        if delay.is_finite() && delay >= 0.0 {
                            current.crawl_delay = Some(delay);
                        }
                    }
                    current.has_rules = true;
                }
                "sitemap" if !value.is_empty() => sitemap_urls.push(value.to_string()),
                _ => {}
            }
        }
        if !current.agents.is_empty() {
            groups.push(current);
        }

        let specific: Vec<&Group> = groups
            .iter()
            .filter(|g| g.agents.iter().any(|a| *a == token))
            .collect();
        let selected = if specific.is_empty() {
            groups
                .iter()
                .filter(|g| g.agents.iter().any(|a| a == "*"))
                .collect()
        } else {
            specific
        };

        Self {
            origin: origin.to_string(),
            disallow_rules: selected.iter().flat_map(|g| g.disallow.clone()).collect(),
            allow_rules: selected.iter().flat_map(|g| g.allow.clone()).collect(),
            crawl_delay: selected.iter().find_map(|g| g.crawl_delay),
            sitemap_urls,
            raw: content.to_string(),
        }
    }

    /// Checks if a URL is allowed for the given user agent
    ///
    /// The longest matching rule wins and Allow wins ties.
    pub fn is_allowed(&self, url: &Url, user_agent: &str) -> bool {
        if self.raw.trim().is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.raw, product_token(user_agent), url.as_str())
    }
}

/// Returns the product token of a User-Agent string (`Trawler/1.0` → `Trawler`)
pub fn product_token(user_agent: &str) -> &str {
    user_agent
        .split(|c: char| c == '/' || c.is_whitespace())
        .find(|part| !part.is_empty())
        .unwrap_or(user_agent)
}
