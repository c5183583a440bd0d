//! Rate-limited HTTP fetcher
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the crawler's user agent
//! - Absorbing API rate limits by sleeping until the server-provided reset time
//! - Bounded retry with exponential backoff for transient failures
//! - Error classification

use crate::config::CrawlerConfig;
use crate::{CityError, Result};
use chrono::Utc;
use reqwest::header::{HeaderMap, ACCEPT};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Accept header for REST API requests
pub const ACCEPT_JSON: &str = "application/vnd.github.v3.text-match+json";

/// Accept header for website (HTML) requests
pub const ACCEPT_HTML: &str = "text/html";

/// Upper bound for a single transient-failure backoff
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Shortest wait after a rate-limit response
const MIN_RATE_LIMIT_WAIT: Duration = Duration::from_secs(1);

/// Query parameters whose values never reach the logs
const SECRET_PARAMS: [&str; 1] = ["client_secret"];

/// Retry policy for failures that are not rate limits
///
/// | Condition | Action |
/// |-----------|--------|
/// | HTTP 200 | Return body |
/// | HTTP 403/429 with reset or retry-after | Sleep until reset, retry (unbounded) |
/// | HTTP 5xx | Backoff, retry up to `max_retries` |
/// | Timeout / connection error | Backoff, retry up to `max_retries` |
/// | Other status | Fail with `HttpStatus` |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }

    /// Backoff before retry number `attempt` (1-based), doubling each time
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .checked_mul(factor)
            .map_or(MAX_BACKOFF, |d| d.min(MAX_BACKOFF))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

/// Outcome of a single request attempt
#[derive(Debug)]
enum Attempt {
    Success(String),
    RateLimited(Duration),
    Transient(String),
    Fatal(CityError),
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &CrawlerConfig) -> std::result::Result<Client, reqwest::Error> {
    let user_agent = format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Issues GET requests until a 200 response is obtained
///
/// The client keeps no mutable state of its own; clones share the underlying
/// connection pool and can be used from any number of tasks.
#[derive(Debug, Clone)]
pub struct RateLimitedClient {
    client: Client,
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl RateLimitedClient {
    pub fn new(client: Client, policy: RetryPolicy) -> Self {
        Self {
            client,
            policy,
            cancel: CancellationToken::new(),
        }
    }

    /// Builds a client from the crawler configuration
    pub fn from_config(config: &CrawlerConfig) -> Result<Self> {
        let client = build_http_client(config)?;
        Ok(Self::new(client, RetryPolicy::from_config(config)))
    }

    /// Makes every wait inside this client end early once `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Fetches a URL and decodes its body as JSON
    ///
    /// # Returns
    ///
    /// * `Ok(Value)` - The decoded body of the 200 response
    /// * `Err(CityError::MalformedResponse)` - The body is not valid JSON
    /// * `Err(CityError)` - A non-recoverable status or exhausted retries
    pub async fn fetch_json(&self, url: &Url) -> Result<serde_json::Value> {
        let body = self.fetch_text(url, ACCEPT_JSON).await?;
        serde_json::from_str(&body).map_err(|e| CityError::malformed(redact(url), e))
    }

    /// Fetches a URL and returns its body as text
    ///
    /// Rate-limit responses are never surfaced: the call sleeps until the
    /// server-provided reset time and retries the identical URL.
    pub async fn fetch_text(&self, url: &Url, accept: &str) -> Result<String> {
        let mut transient_failures = 0u32;

        loop {
            if self.cancel.is_cancelled() {
                return Err(CityError::Cancelled);
            }

            match self.attempt(url, accept).await {
                Attempt::Success(body) => return Ok(body),

                Attempt::RateLimited(wait) => {
                    tracing::warn!(
                        "API rate limit reached. Waiting {} secs before retrying {}",
                        wait.as_secs(),
                        redact(url)
                    );
                    self.sleep(wait).await?;
                }

                Attempt::Transient(message) => {
                    transient_failures += 1;
                    if transient_failures > self.policy.max_retries {
                        return Err(CityError::RetriesExhausted {
                            url: redact(url),
                            attempts: transient_failures,
                            message,
                        });
                    }

                    let delay = self.policy.backoff(transient_failures);
                    tracing::debug!(
                        "Transient failure for {} ({}), retry {}/{} in {:?}",
                        redact(url),
                        message,
                        transient_failures,
                        self.policy.max_retries,
                        delay
                    );
                    self.sleep(delay).await?;
                }

                Attempt::Fatal(error) => return Err(error),
            }
        }
    }

    /// Sends one request and classifies the result
    async fn attempt(&self, url: &Url, accept: &str) -> Attempt {
        tracing::trace!("Getting data from {}", redact(url));

        let response = match self
            .client
            .get(url.clone())
            .header(ACCEPT, accept)
            .send()
            .await
        {
            Ok(response) => response,
            // reqwest's Display carries the full URL, credentials included
            Err(e) if e.is_timeout() || e.is_connect() || e.is_request() => {
                return Attempt::Transient(e.without_url().to_string());
            }
            Err(e) => {
                return Attempt::Fatal(CityError::Transport {
                    url: redact(url),
                    source: e.without_url(),
                });
            }
        };

        let status = response.status();

        if status == StatusCode::OK {
            return match response.text().await {
                Ok(body) => Attempt::Success(body),
                Err(e) => Attempt::Transient(format!("failed to read body: {}", e.without_url())),
            };
        }

        if let Some(wait) = rate_limit_wait(status, response.headers(), Utc::now().timestamp()) {
            return Attempt::RateLimited(wait);
        }

        if status.is_server_error() {
            return Attempt::Transient(format!("HTTP {}", status.as_u16()));
        }

        Attempt::Fatal(CityError::HttpStatus {
            url: redact(url),
            status: status.as_u16(),
        })
    }

    async fn sleep(&self, duration: Duration) -> Result<()> {
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = self.cancel.cancelled() => Err(CityError::Cancelled),
        }
    }
}

/// Interprets a rate-limit signal on a non-200 response
///
/// A 403 or 429 is a rate limit when it carries `Retry-After` (seconds) or an
/// `X-RateLimit-Reset` Unix timestamp. A reset header next to a non-zero
/// `X-RateLimit-Remaining` is an ordinary refusal, not a rate limit.
///
/// # Arguments
///
/// * `status` - Response status
/// * `headers` - Response headers
/// * `now` - Current Unix time in seconds
///
/// # Returns
///
/// The time to wait before retrying (at least one second), or None if this is
/// not a rate-limit response
pub fn rate_limit_wait(status: StatusCode, headers: &HeaderMap, now: i64) -> Option<Duration> {
    if status != StatusCode::FORBIDDEN && status != StatusCode::TOO_MANY_REQUESTS {
        return None;
    }

    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    if let Some(seconds) = header("retry-after").and_then(|v| v.trim().parse::<u64>().ok()) {
        return Some(Duration::from_secs(seconds).max(MIN_RATE_LIMIT_WAIT));
    }

    let reset = header("x-ratelimit-reset").and_then(|v| v.trim().parse::<i64>().ok())?;

    let remaining = header("x-ratelimit-remaining").and_then(|v| v.trim().parse::<u64>().ok());
    if matches!(remaining, Some(n) if n > 0) {
        return None;
    }

    let wait = Duration::from_secs(reset.saturating_sub(now).max(0) as u64);
    Some(wait.max(MIN_RATE_LIMIT_WAIT))
}

/// Renders a URL for logs and errors with credential values masked
pub fn redact(url: &Url) -> String {
    if !url.query_pairs().any(|(k, _)| SECRET_PARAMS.contains(&k.as_ref())) {
        return url.to_string();
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let value = if SECRET_PARAMS.contains(&k.as_ref()) {
                "***".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), value)
        })
        .collect();

    let mut masked = url.clone();
    masked.query_pairs_mut().clear().extend_pairs(pairs);
    masked.to_string()
}
