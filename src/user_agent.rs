//! User-Agent providers consulted once per download attempt.
//!
//! The engine asks a [`UserAgentProvider`] for a fresh string before every
//! attempt, so retries of the same URL may present different browsers.

use rand::seq::SliceRandom;

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/fetcher";

/// Source of User-Agent header values.
pub trait UserAgentProvider: Send + Sync {
    /// Returns the User-Agent for the next request.
    fn user_agent(&self) -> String;
}

/// Browser families in the built-in User-Agent table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Browser {
    /// Google Chrome.
    Chrome,
    /// Chromium-based Microsoft Edge.
    Edge,
    /// Mozilla Firefox.
    Firefox,
    /// Opera.
    Opera,
    /// Apple Safari, desktop and mobile.
    Safari,
    /// Internet Explorer 11 (`ie` on the command line).
    InternetExplorer,
}

impl Browser {
    /// All browser families, in table order.
    pub const ALL: [Browser; 6] = [
        Browser::Chrome,
        Browser::Edge,
        Browser::Firefox,
        Browser::Opera,
        Browser::Safari,
        Browser::InternetExplorer,
    ];

    fn agents(self) -> &'static [&'static str] {
        match self {
            Browser::Chrome => CHROME,
            Browser::Edge => EDGE,
            Browser::Firefox => FIREFOX,
            Browser::Opera => OPERA,
            Browser::Safari => SAFARI,
            Browser::InternetExplorer => INTERNET_EXPLORER,
        }
    }
}

impl std::str::FromStr for Browser {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "chrome" => Ok(Browser::Chrome),
            "edge" => Ok(Browser::Edge),
            "firefox" => Ok(Browser::Firefox),
            "opera" => Ok(Browser::Opera),
            "safari" => Ok(Browser::Safari),
            "internetexplorer" | "ie" => Ok(Browser::InternetExplorer),
            other => Err(format!(
                "unknown browser '{other}': expected chrome, edge, firefox, opera, safari or internetexplorer"
            )),
        }
    }
}

const CHROME: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
];

const EDGE: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36 Edg/130.0.0.0",
];

const FIREFOX: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.7; rv:132.0) Gecko/20100101 Firefox/132.0",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:133.0) Gecko/20100101 Firefox/133.0",
];

const OPERA: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36 OPR/115.0.0.0",
];

const SAFARI: &[&str] = &[
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1 Safari/605.1.15",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 18_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1 Mobile/15E148 Safari/604.1",
];

const INTERNET_EXPLORER: &[&str] =
    &["Mozilla/5.0 (Windows NT 10.0; WOW64; Trident/7.0; rv:11.0) like Gecko"];

/// Picks a User-Agent uniformly at random from the built-in browser table.
#[derive(Debug, Clone)]
pub struct RandomUserAgents {
    agents: Vec<&'static str>,
}

impl Default for RandomUserAgents {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomUserAgents {
    /// Uses every browser family.
    #[must_use]
    pub fn new() -> Self {
        Self::for_browsers(&Browser::ALL)
    }

    /// Restricts the pool to the given browser families.
    #[must_use]
    pub fn for_browsers(browsers: &[Browser]) -> Self {
        let agents = browsers
            .iter()
            .flat_map(|browser| browser.agents().iter().copied())
            .collect();
        Self { agents }
    }

    /// Number of distinct strings in the pool.
    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Returns true when the pool is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl UserAgentProvider for RandomUserAgents {
    fn user_agent(&self) -> String {
        self.agents
            .choose(&mut rand::thread_rng())
            .map_or_else(default_user_agent, |ua| (*ua).to_string())
    }
}

/// Always returns the same User-Agent.
#[derive(Debug, Clone)]
pub struct FixedUserAgent(String);

impl FixedUserAgent {
    /// Wraps a fixed string.
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self(user_agent.into())
    }
}

impl Default for FixedUserAgent {
    fn default() -> Self {
        Self(default_user_agent())
    }
}

impl UserAgentProvider for FixedUserAgent {
    fn user_agent(&self) -> String {
        self.0.clone()
    }
}

/// User-Agent identifying this tool.
#[must_use]
pub fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("fetcher/{version} (+{PROJECT_UA_URL})")
}
