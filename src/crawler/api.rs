//! GitHub API access
//!
//! `SearchApi` is the seam between the crawl logic and the network: the
//! partitioner, the pager and the enrichment workers only ever talk to it.
//! `GitHubClient` implements it on top of the rate-limited fetcher.

use crate::crawler::fetcher::{RateLimitedClient, ACCEPT_HTML};
use crate::crawler::parser::parse_contributions;
use crate::crawler::user::{ActivitySummary, RepositorySummary, UserProfile, UserRecord};
use crate::state::{DateRange, SearchTarget};
use crate::{CityError, ConfigError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use url::Url;

/// Results per search page (the endpoint's maximum)
pub const PER_PAGE: u32 = 100;

/// Hard limit on organization and repository pages read per user
pub const MAX_LIST_PAGES: u32 = 10;

/// OAuth application credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    client_id: String,
    client_secret: String,
}

impl Credentials {
    /// Creates credentials, rejecting blank values
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> std::result::Result<Self, ConfigError> {
        let client_id = client_id.into();
        let client_secret = client_secret.into();

        if client_id.trim().is_empty() {
            return Err(ConfigError::MissingCredential("client-id"));
        }
        if client_secret.trim().is_empty() {
            return Err(ConfigError::MissingCredential("client-secret"));
        }

        Ok(Self {
            client_id,
            client_secret,
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

/// One page of search results
#[derive(Debug, Clone, Deserialize)]
pub struct SearchPage {
    pub total_count: u64,

    #[serde(default)]
    pub incomplete_results: bool,

    #[serde(default)]
    pub items: Vec<SearchItem>,
}

/// A single search hit; only the login is used
#[derive(Debug, Clone, Deserialize)]
pub struct SearchItem {
    pub login: String,
}

#[derive(Debug, Deserialize)]
struct RepoItem {
    #[serde(default)]
    stargazers_count: u64,

    #[serde(default)]
    language: Option<String>,

    #[serde(default)]
    fork: bool,
}

/// Operations the crawler needs from the search and detail endpoints
#[async_trait]
pub trait SearchApi: Send + Sync {
    /// Fetches one page of users matching `target`, optionally restricted to
    /// accounts created within `range`
    async fn search_page(
        &self,
        target: &SearchTarget,
        range: Option<&DateRange>,
        page: u32,
    ) -> Result<SearchPage>;

    /// Fetches the profile of one user
    async fn user_profile(&self, login: &str) -> Result<UserProfile>;

    /// Completes a profile into a full record (activity, organizations, repositories)
    async fn user_record(&self, profile: UserProfile) -> Result<UserRecord>;

    /// Returns how many users match `target` within `range`
    async fn total_count(&self, target: &SearchTarget, range: Option<&DateRange>) -> Result<u64> {
        Ok(self.search_page(target, range, 1).await?.total_count)
    }
}

/// `SearchApi` implementation for the GitHub REST API and website
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: RateLimitedClient,
    credentials: Credentials,
    api_base: Url,
    web_base: Url,
}

impl GitHubClient {
    /// Creates a client
    ///
    /// # Arguments
    ///
    /// * `http` - The rate-limited fetcher
    /// * `credentials` - Application credentials added to every API request
    /// * `api_base` - REST API root, e.g. `https://api.github.com`
    /// * `web_base` - Website root, e.g. `https://github.com`
    pub fn new(
        http: RateLimitedClient,
        credentials: Credentials,
        api_base: &str,
        web_base: &str,
    ) -> Result<Self> {
        Ok(Self {
            http,
            credentials,
            api_base: parse_base(api_base)?,
            web_base: parse_base(web_base)?,
        })
    }

    /// Builds the search URL for a page of results
    pub fn search_url(
        &self,
        target: &SearchTarget,
        range: Option<&DateRange>,
        page: u32,
    ) -> Result<Url> {
        let mut query = format!("type:user {}", target.query_fragment());
        if let Some(range) = range {
            query.push_str(&format!(" created:{}", range));
        }

        let mut url = self.api_base.join("search/users")?;
        url.query_pairs_mut()
            .append_pair("q", &query)
            .append_pair("sort", "joined")
            .append_pair("order", "asc")
            .append_pair("per_page", &PER_PAGE.to_string())
            .append_pair("page", &page.to_string());
        self.authorize(&mut url);
        Ok(url)
    }

    /// Builds an API URL for a path below `users/{login}`
    fn user_url(&self, login: &str, suffix: &str) -> Result<Url> {
        let mut url = self.api_base.join(&format!("users/{}{}", login, suffix))?;
        self.authorize(&mut url);
        Ok(url)
    }

    fn authorize(&self, url: &mut Url) {
        url.query_pairs_mut()
            .append_pair("client_id", &self.credentials.client_id)
            .append_pair("client_secret", &self.credentials.client_secret);
    }

    /// Builds the URL of one page of a per-user list
    fn list_url(&self, login: &str, suffix: &str, page: u32) -> Result<Url> {
        let mut url = self.user_url(login, suffix)?;
        url.query_pairs_mut()
            .append_pair("per_page", &PER_PAGE.to_string())
            .append_pair("page", &page.to_string());
        Ok(url)
    }

    async fn organization_count(&self, login: &str) -> Result<u64> {
        let mut count = 0u64;

        for page in 1..=MAX_LIST_PAGES {
            let url = self.list_url(login, "/orgs", page)?;
            let value = self.http.fetch_json(&url).await?;
            let orgs = value.as_array().ok_or_else(|| {
                CityError::malformed(url.path(), "expected an array of organizations")
            })?;

            count += orgs.len() as u64;
            if orgs.len() < PER_PAGE as usize {
                break;
            }
        }

        Ok(count)
    }

    async fn repository_summary(&self, login: &str) -> Result<RepositorySummary> {
        let mut stars = 0u64;
        let mut languages: HashMap<String, u32> = HashMap::new();

        for page in 1..=MAX_LIST_PAGES {
            let url = self.list_url(login, "/repos", page)?;
            let value = self.http.fetch_json(&url).await?;
            let repos: Vec<RepoItem> =
                serde_json::from_value(value).map_err(|e| CityError::malformed(url.path(), e))?;

            for repo in repos.iter().filter(|r| !r.fork) {
                stars += repo.stargazers_count;
                if let Some(language) = &repo.language {
                    *languages.entry(language.clone()).or_default() += 1;
                }
            }

            if repos.len() < PER_PAGE as usize {
                break;
            }
        }

        // Ties resolve to the alphabetically first language so the result is stable
        let language = languages
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
            .map(|(language, _)| language);

        Ok(RepositorySummary { stars, language })
    }

    async fn activity_summary(&self, login: &str) -> Result<ActivitySummary> {
        let url = self.web_base.join(&format!("users/{}/contributions", login))?;
        let html = self.http.fetch_text(&url, ACCEPT_HTML).await?;
        let days = parse_contributions(&html).map_err(|e| CityError::malformed(url.as_str(), e))?;
        Ok(ActivitySummary::from_days(&days))
    }
}

#[async_trait]
impl SearchApi for GitHubClient {
    async fn search_page(
        &self,
        target: &SearchTarget,
        range: Option<&DateRange>,
        page: u32,
    ) -> Result<SearchPage> {
        let url = self.search_url(target, range, page)?;
        let value = self.http.fetch_json(&url).await?;
        let page: SearchPage =
            serde_json::from_value(value).map_err(|e| CityError::malformed(url.path(), e))?;

        if page.incomplete_results {
            tracing::warn!(
                "Search for {} returned incomplete results",
                range.map_or_else(|| "all dates".to_string(), |r| r.to_string())
            );
        }

        Ok(page)
    }

    async fn user_profile(&self, login: &str) -> Result<UserProfile> {
        let url = self.user_url(login, "")?;
        let value = self.http.fetch_json(&url).await?;
        serde_json::from_value(value).map_err(|e| CityError::malformed(url.path(), e))
    }

    async fn user_record(&self, profile: UserProfile) -> Result<UserRecord> {
        let login = profile.login.clone();

        let organizations = self.organization_count(&login).await?;
        let repos = self.repository_summary(&login).await?;
        let activity = self.activity_summary(&login).await?;

        Ok(UserRecord::new(profile, organizations, repos, activity))
    }
}

/// Parses a base URL, making sure relative joins append to its path
fn parse_base(base: &str) -> Result<Url> {
    let mut base = base.to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    Ok(Url::parse(&base)?)
}
