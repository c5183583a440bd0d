//! Crawl statistics
//!
//! Counters are updated concurrently by the producer and every enrichment
//! worker, so they are plain atomics; a `StatisticsSnapshot` is taken once the
//! crawl is over for reporting.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters of a running crawl
#[derive(Debug, Default)]
pub struct CrawlStatistics {
    partitions: AtomicU64,
    skipped_partitions: AtomicU64,
    pages: AtomicU64,
    discovered: AtomicU64,
    duplicates: AtomicU64,
    excluded_users: AtomicU64,
    excluded_locations: AtomicU64,
    accepted: AtomicU64,
    failed_users: AtomicU64,
}

/// Point-in-time copy of the crawl counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    /// Partitions paged
    pub partitions: u64,

    /// Partitions abandoned after a paging error
    pub skipped_partitions: u64,

    /// Search pages fetched
    pub pages: u64,

    /// Logins emitted by the search, duplicates included
    pub discovered: u64,

    /// Logins dropped because they were already seen
    pub duplicates: u64,

    /// Logins dropped by the excluded-user list
    pub excluded_users: u64,

    /// Users dropped by the excluded-location list
    pub excluded_locations: u64,

    /// Users added to the results
    pub accepted: u64,

    /// Users whose detail fetch failed
    pub failed_users: u64,
}

impl CrawlStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_partition(&self) {
        self.partitions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped_partition(&self) {
        self.skipped_partitions.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one fetched search page and the logins it carried
    pub fn record_page(&self, logins: usize) {
        self.pages.fetch_add(1, Ordering::Relaxed);
        self.discovered.fetch_add(logins as u64, Ordering::Relaxed);
    }

    pub fn record_duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_excluded_user(&self) {
        self.excluded_users.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_excluded_location(&self) {
        self.excluded_locations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed_user(&self) {
        self.failed_users.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            partitions: self.partitions.load(Ordering::Relaxed),
            skipped_partitions: self.skipped_partitions.load(Ordering::Relaxed),
            pages: self.pages.load(Ordering::Relaxed),
            discovered: self.discovered.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            excluded_users: self.excluded_users.load(Ordering::Relaxed),
            excluded_locations: self.excluded_locations.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            failed_users: self.failed_users.load(Ordering::Relaxed),
        }
    }
}

impl StatisticsSnapshot {
    /// Share of unique users that made it into the results, as a percentage
    pub fn acceptance_rate(&self) -> f64 {
        let unique = self.discovered.saturating_sub(self.duplicates);
        if unique == 0 {
            return 0.0;
        }
        (self.accepted as f64 / unique as f64) * 100.0
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &StatisticsSnapshot) {
    println!("=== Crawl Statistics ===\n");

    println!("Search:");
    println!("  Partitions paged: {}", stats.partitions);
    println!("  Partitions skipped: {}", stats.skipped_partitions);
    println!("  Pages fetched: {}", stats.pages);
    println!("  Logins discovered: {}", stats.discovered);
    println!();

    println!("Users:");
    println!("  Duplicates: {}", stats.duplicates);
    println!("  Excluded by login: {}", stats.excluded_users);
    println!("  Excluded by location: {}", stats.excluded_locations);
    println!("  Failed: {}", stats.failed_users);
    println!("  Accepted: {}", stats.accepted);
    println!();

    println!("Acceptance Rate: {:.1}%", stats.acceptance_rate());
}
