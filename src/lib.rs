//! GitHub-City: enumerate and rank the GitHub users of a location
//!
//! This crate discovers every user whose profile location matches a target,
//! working around the search API's 1000-result ceiling by partitioning the
//! account-creation date range, and enriches each user with a detail record
//! under the API's rate limits.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;

use std::fmt;
use thiserror::Error;

/// Main error type for GitHub-City operations
#[derive(Debug, Error)]
pub enum CityError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP transport error for {url}: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("Gave up on {url} after {attempts} attempts: {message}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        message: String,
    },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Malformed response from {url}: {message}")]
    MalformedResponse { url: String, message: String },

    #[error("{stage} failed: {source}")]
    Stage {
        stage: CrawlStage,
        source: Box<CityError>,
    },

    #[error("Invalid crawl phase transition: {from} -> {to}")]
    InvalidTransition {
        from: state::CrawlPhase,
        to: state::CrawlPhase,
    },

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Crawl cancelled")]
    Cancelled,

    #[error("Worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl CityError {
    /// Wraps this error with the crawl stage it happened in
    pub fn at_stage(self, stage: CrawlStage) -> Self {
        match self {
            // Keep the innermost stage and never wrap cancellation
            Self::Stage { .. } | Self::Cancelled => self,
            other => Self::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Builds a malformed-response error
    pub fn malformed(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::MalformedResponse {
            url: url.into(),
            message: message.to_string(),
        }
    }
}

/// The stage of a crawl, used to report where a fatal error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlStage {
    Partitioning,
    Paging,
    Enrichment,
    Persistence,
}

impl fmt::Display for CrawlStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Partitioning => "partitioning",
            Self::Paging => "paging",
            Self::Enrichment => "enrichment",
            Self::Persistence => "persistence",
        };
        write!(f, "{}", name)
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("Search target must contain at least one location")]
    EmptyTarget,
}

/// Result type alias for GitHub-City operations
pub type Result<T> = std::result::Result<T, CityError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Crawler, CrawlOutcome, RateLimitedClient};
pub use state::{CrawlPhase, CrawlState, DateRange, ExclusionSets, PartitionSet, SearchTarget};
