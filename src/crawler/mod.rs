//! Crawler module for user discovery and enrichment
//!
//! This module contains the core crawling logic, including:
//! - Rate-limited HTTP fetching with bounded retry
//! - Date-range partitioning around the search result cap
//! - Paging search results into a queue of logins
//! - Enriching logins with a pool of workers
//! - Overall crawl coordination

mod api;
mod coordinator;
mod enrichment;
mod fetcher;
mod pager;
mod parser;
mod partitioner;
mod queue;
mod user;

pub use api::{Credentials, GitHubClient, SearchApi, SearchItem, SearchPage, MAX_LIST_PAGES, PER_PAGE};
pub use coordinator::{CrawlOptions, CrawlOutcome, Crawler};
pub use enrichment::{Claim, EnrichmentPool, ResultSet};
pub use fetcher::{build_http_client, rate_limit_wait, redact, RateLimitedClient, RetryPolicy};
pub use pager::SearchPager;
pub use parser::parse_contributions;
pub use partitioner::{CountProbe, RangePartitioner, SearchProbe, RESULT_CAP};
pub use queue::{entity_queue, EntityConsumer, EntityProducer};
pub use user::{ActivitySummary, ContributionDay, RepositorySummary, UserProfile, UserRecord};
