//! Markdown ranking generation
//!
//! This module generates the human-readable ranking of a crawl: run
//! information, crawl statistics and the ranking table itself.

use crate::output::traits::{OutputError, OutputHandler, OutputResult, RankingSummary};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Generates a markdown ranking from a crawl summary
///
/// # Arguments
///
/// * `summary` - The ranked crawl summary
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the ranking
/// * `Err(OutputError)` - Failed to write the ranking
pub fn generate_markdown_summary(summary: &RankingSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);
    let write_err = |source| OutputError::Write {
        path: output_path.display().to_string(),
        source,
    };

    let mut file = File::create(output_path).map_err(write_err)?;
    file.write_all(markdown.as_bytes()).map_err(write_err)?;

    Ok(())
}

/// Formats a crawl summary as markdown
pub fn format_markdown_summary(summary: &RankingSummary) -> String {
    let mut md = String::new();

    md.push_str(&format!("# GitHub users in {}\n\n", summary.target));

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!(
        "- **Locations**: {}\n",
        summary.locations.join(", ")
    ));
    md.push_str(&format!("- **Started**: {}\n", summary.started_at.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", summary.finished_at.to_rfc3339()));
    md.push_str(&format!(
        "- **Duration**: {} seconds ({:.2} minutes)\n",
        summary.duration_seconds,
        summary.duration_seconds as f64 / 60.0
    ));
    md.push_str(&format!("- **Config Hash**: {}\n", summary.config_hash));
    md.push_str(&format!("- **Ranked By**: {}\n\n", summary.sort_key));

    // Search statistics
    let stats = &summary.stats;
    md.push_str("## Crawl Statistics\n\n");
    md.push_str(&format!("- **Partitions**: {}", summary.partitions));
    if let (Some(first), Some(last)) = (summary.first_day, summary.last_day) {
        md.push_str(&format!(" (accounts created {} to {})", first, last));
    }
    md.push('\n');
    md.push_str(&format!(
        "- **Skipped Partitions**: {}\n",
        stats.skipped_partitions
    ));
    md.push_str(&format!("- **Search Pages**: {}\n", stats.pages));
    md.push_str(&format!("- **Logins Discovered**: {}\n", stats.discovered));
    md.push_str(&format!("- **Duplicates**: {}\n", stats.duplicates));
    md.push_str(&format!(
        "- **Excluded**: {} by login, {} by location\n",
        stats.excluded_users, stats.excluded_locations
    ));
    md.push_str(&format!("- **Failed**: {}\n", stats.failed_users));
    md.push_str(&format!("- **Accepted**: {}\n", stats.accepted));
    md.push_str(&format!(
        "- **Total Contributions**: {}\n\n",
        summary.total_contributions()
    ));

    // Ranking
    md.push_str("## Ranking\n\n");
    if summary.records.is_empty() {
        md.push_str("No users found.\n");
        return md;
    }

    md.push_str("| # | User | Contributions | Longest Streak | Current Streak | Language | Followers | Stars | Repositories | Organizations | Joined |\n");
    md.push_str("|---|------|---------------|----------------|----------------|----------|-----------|-------|--------------|---------------|--------|\n");

    for (position, user) in summary.records.iter().enumerate() {
        let display = match &user.name {
            Some(name) if !name.trim().is_empty() => {
                format!("[{}](https://github.com/{}) ({})", user.login, user.login, escape(name))
            }
            _ => format!("[{}](https://github.com/{})", user.login, user.login),
        };

        md.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} | {} | {} | {} | {} |\n",
            position + 1,
            display,
            user.contributions,
            user.longest_streak,
            user.current_streak,
            user.language.as_deref().map_or_else(|| "-".to_string(), escape),
            user.followers,
            user.stars,
            user.repositories,
            user.organizations,
            user.joined.format("%Y-%m-%d")
        ));
    }

    md
}

/// Keeps user-provided text from breaking the table
fn escape(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// Writes the markdown ranking to a file
#[derive(Debug, Clone)]
pub struct MarkdownReport {
    path: PathBuf,
}

impl MarkdownReport {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl OutputHandler for MarkdownReport {
    fn write(&self, summary: &RankingSummary) -> OutputResult<()> {
        generate_markdown_summary(summary, &self.path)
    }

    fn name(&self) -> &'static str {
        "markdown"
    }
}
