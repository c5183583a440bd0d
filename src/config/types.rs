use chrono::NaiveDate;
use serde::Deserialize;

/// Main configuration structure for GitHub-City
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    pub target: TargetConfig,
    pub output: OutputConfig,
}

/// OAuth application credentials appended to every API request
///
/// Either value may be omitted from the file and supplied through the
/// `GITHUB_CLIENT_ID` / `GITHUB_CLIENT_SECRET` environment variables instead.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialsConfig {
    #[serde(rename = "client-id")]
    pub client_id: Option<String>,

    #[serde(rename = "client-secret")]
    pub client_secret: Option<String>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of concurrent enrichment workers
    pub workers: u32,

    /// Retry budget for transient (non rate-limit) failures
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// First backoff delay for transient failures (milliseconds), doubled per attempt
    #[serde(rename = "retry-backoff-ms")]
    pub retry_backoff_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Base URL of the REST API
    #[serde(rename = "api-base-url")]
    pub api_base_url: String,

    /// Base URL of the website serving contribution calendars
    #[serde(rename = "web-base-url")]
    pub web_base_url: String,

    /// First day of the partitioned date domain
    #[serde(rename = "domain-start")]
    pub domain_start: NaiveDate,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: 20,
            max_retries: 5,
            retry_backoff_ms: 500,
            timeout_secs: 30,
            api_base_url: "https://api.github.com".to_string(),
            web_base_url: "https://github.com".to_string(),
            domain_start: NaiveDate::from_ymd_opt(2008, 1, 1).unwrap_or(NaiveDate::MIN),
        }
    }
}

/// The location being crawled and its exclusions
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    /// Display name of the target (e.g. the city)
    pub name: String,

    /// Location strings OR-combined into the search query.
    /// Defaults to the target name when empty.
    #[serde(default)]
    pub locations: Vec<String>,

    /// Logins never enriched nor ranked
    #[serde(rename = "excluded-users", default)]
    pub excluded_users: Vec<String>,

    /// Location substrings whose users are dropped after enrichment
    #[serde(rename = "excluded-locations", default)]
    pub excluded_locations: Vec<String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the persisted crawl state (JSON)
    #[serde(rename = "state-path")]
    pub state_path: String,

    /// Path to the exported user records (JSON)
    #[serde(rename = "results-path")]
    pub results_path: String,

    /// Path to the markdown ranking
    #[serde(rename = "summary-path")]
    pub summary_path: String,
}
