//! Output module for ranking reports
//!
//! This module handles:
//! - Sorting the accepted users by a ranking key
//! - Exporting the ranked users as JSON
//! - Generating a markdown ranking with run statistics
//! - Recording crawl statistics

mod json;
mod markdown;
pub mod sort;
pub mod stats;
mod traits;

pub use json::JsonExporter;
pub use markdown::{format_markdown_summary, generate_markdown_summary, MarkdownReport};
pub use sort::{sort_records, SortKey};
pub use stats::{print_statistics, CrawlStatistics, StatisticsSnapshot};
pub use traits::{OutputError, OutputHandler, OutputResult, RankingSummary};

/// Writes a summary through every handler, stopping at the first failure
pub fn write_all(handlers: &[&dyn OutputHandler], summary: &RankingSummary) -> OutputResult<()> {
    for handler in handlers {
        handler.write(summary)?;
        tracing::info!("Wrote {} output", handler.name());
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::crawler::UserRecord;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn user(login: &str, name: Option<&str>, contributions: u64, streak: u32) -> UserRecord {
        UserRecord {
            login: login.to_string(),
            name: name.map(str::to_string),
            location: "Granada, Spain".to_string(),
            followers: 3,
            repositories: 4,
            organizations: 1,
            stars: 10,
            language: Some("Rust".to_string()),
            joined: Utc.with_ymd_and_hms(2011, 2, 3, 0, 0, 0).unwrap(),
            contributions,
            longest_streak: streak,
            current_streak: 0,
        }
    }

    /// A two-user ranking over the 2008..2020 domain
    pub fn summary() -> RankingSummary {
        RankingSummary {
            target: "Granada".to_string(),
            locations: vec!["Granada".to_string()],
            started_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            finished_at: Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap(),
            duration_seconds: 3600,
            config_hash: "abc123".to_string(),
            partitions: 2,
            first_day: NaiveDate::from_ymd_opt(2008, 1, 1),
            last_day: NaiveDate::from_ymd_opt(2020, 1, 1),
            stats: StatisticsSnapshot {
                partitions: 2,
                pages: 3,
                discovered: 5,
                duplicates: 1,
                accepted: 2,
                ..Default::default()
            },
            sort_key: SortKey::Contributions,
            records: vec![
                user("busy", Some("Busy | Bee"), 900, 12),
                user("idle", None, 3, 1),
            ],
        }
    }

    #[test]
    fn test_write_all_handlers() {
        let dir = tempfile::tempdir().unwrap();
        let json = JsonExporter::new(&dir.path().join("users.json"));
        let markdown = MarkdownReport::new(&dir.path().join("users.md"));

        write_all(&[&json, &markdown], &summary()).unwrap();

        assert!(dir.path().join("users.json").exists());
        assert!(dir.path().join("users.md").exists());
    }
}
