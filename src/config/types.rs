use serde::Deserialize;

/// Main configuration structure for imgscrape
///
/// Every section is optional; a missing file section falls back to its defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub http: HttpConfig,
    pub crawler: CrawlerConfig,
    pub iiif: IiifConfig,
}

/// Shared HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// User agent sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Whole-request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Connection establishment timeout (seconds)
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("imgscrape/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

/// How a crawl run treats a failing worker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// The first failure cancels every other worker and fails the run
    #[default]
    FailFast,
    /// Every worker runs to completion and reports its own outcome
    BestEffort,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of page fetches in flight at once
    #[serde(rename = "max-concurrent-fetches")]
    pub max_concurrent_fetches: usize,

    /// Failure policy used by `Crawler::run_with_policy`
    #[serde(rename = "failure-policy")]
    pub failure_policy: FailurePolicy,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: 16,
            failure_policy: FailurePolicy::FailFast,
        }
    }
}

/// IIIF Image API endpoint configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IiifConfig {
    /// Service base URL; identifiers are appended as the next path segment
    #[serde(rename = "base-url")]
    pub base_url: String,
}

impl Default for IiifConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.nga.gov/iiif".to_string(),
        }
    }
}
