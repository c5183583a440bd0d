//! Output handler traits and types
//!
//! This module defines the trait interface for output handlers and the
//! ranking summary they render.

use crate::crawler::{CrawlOutcome, UserRecord};
use crate::output::sort::{sort_records, SortKey};
use crate::output::stats::StatisticsSnapshot;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output to {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Everything a report needs about a finished crawl
#[derive(Debug, Clone)]
pub struct RankingSummary {
    // Run metadata
    pub target: String,
    pub locations: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_seconds: u64,
    pub config_hash: String,

    // Partitioning
    pub partitions: usize,
    pub first_day: Option<NaiveDate>,
    pub last_day: Option<NaiveDate>,

    pub stats: StatisticsSnapshot,

    /// Records in ranking order
    pub sort_key: SortKey,
    pub records: Vec<UserRecord>,
}

impl RankingSummary {
    /// Builds the summary of a crawl, ranking its records by `sort_key`
    pub fn from_outcome(outcome: CrawlOutcome, sort_key: SortKey, config_hash: &str) -> Self {
        let span = outcome.state.partitions().span();
        let duration_seconds = outcome.duration_seconds();
        let mut records = outcome.records;
        sort_records(&mut records, sort_key);

        Self {
            target: outcome.state.target().name().to_string(),
            locations: outcome.state.target().locations().to_vec(),
            duration_seconds,
            started_at: outcome.started_at,
            finished_at: outcome.finished_at,
            config_hash: config_hash.to_string(),
            partitions: outcome.state.partitions().len(),
            first_day: span.map(|r| r.start()),
            last_day: span.map(|r| r.end()),
            stats: outcome.stats,
            sort_key,
            records,
        }
    }

    /// Total contributions of every ranked user
    pub fn total_contributions(&self) -> u64 {
        self.records.iter().map(|r| r.contributions).sum()
    }
}

/// Trait for output handlers
///
/// Each handler renders a finished crawl to one destination.
pub trait OutputHandler {
    /// Writes the summary
    ///
    /// # Arguments
    ///
    /// * `summary` - The ranked results and statistics of the crawl
    fn write(&self, summary: &RankingSummary) -> OutputResult<()>;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}
