//! User profile and enriched user record types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The profile returned by the user detail endpoint
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserProfile {
    pub login: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub followers: u64,

    #[serde(default)]
    pub public_repos: u64,

    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    /// Returns the location, or an empty string when the user has none
    pub fn location(&self) -> &str {
        self.location.as_deref().unwrap_or("")
    }
}

/// Contributions made on one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContributionDay {
    pub date: NaiveDate,
    pub count: u32,
}

/// Aggregated contribution activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySummary {
    /// Total contributions over the calendar
    pub contributions: u64,

    /// Longest run of consecutive active days
    pub longest_streak: u32,

    /// Run of consecutive active days ending at the latest day
    pub current_streak: u32,
}

impl ActivitySummary {
    /// Summarizes calendar days (sorted by date, as the parser returns them)
    ///
    /// The latest day does not break the current streak when it has no
    /// contributions yet, since that day is still in progress.
    pub fn from_days(days: &[ContributionDay]) -> Self {
        let contributions = days.iter().map(|d| u64::from(d.count)).sum();

        let mut longest = 0u32;
        let mut run = 0u32;
        let mut previous: Option<NaiveDate> = None;

        for day in days {
            let consecutive = previous.and_then(|p| p.succ_opt()) == Some(day.date);
            if day.count > 0 {
                run = if consecutive { run + 1 } else { 1 };
                longest = longest.max(run);
            } else {
                run = 0;
            }
            previous = Some(day.date);
        }

        let mut current = 0u32;
        let mut expected: Option<NaiveDate> = None;
        let mut iter = days.iter().rev().peekable();

        if let Some(last) = iter.peek() {
            if last.count == 0 {
                expected = last.date.pred_opt();
                iter.next();
            }
        }

        for day in iter {
            if day.count == 0 || expected.is_some_and(|e| e != day.date) {
                break;
            }
            current += 1;
            expected = day.date.pred_opt();
        }

        Self {
            contributions,
            longest_streak: longest,
            current_streak: current,
        }
    }
}

/// Repository statistics of a user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySummary {
    /// Stars across the user's own (non-fork) repositories, read from at most
    /// `MAX_LIST_PAGES` pages of 100
    pub stars: u64,

    /// Most frequent primary language among the user's own repositories
    pub language: Option<String>,
}

/// The enriched record of an accepted user
///
/// Created once per accepted login and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub login: String,
    pub name: Option<String>,
    pub location: String,
    pub followers: u64,
    pub repositories: u64,
    /// Public memberships, counted over at most `MAX_LIST_PAGES` pages of 100
    pub organizations: u64,
    pub stars: u64,
    pub language: Option<String>,
    pub joined: DateTime<Utc>,
    pub contributions: u64,
    pub longest_streak: u32,
    pub current_streak: u32,
}

impl UserRecord {
    /// Combines a profile with its activity, organizations and repositories
    pub fn new(
        profile: UserProfile,
        organizations: u64,
        repos: RepositorySummary,
        activity: ActivitySummary,
    ) -> Self {
        Self {
            location: profile.location().to_string(),
            login: profile.login,
            name: profile.name,
            followers: profile.followers,
            repositories: profile.public_repos,
            organizations,
            stars: repos.stars,
            language: repos.language,
            joined: profile.created_at,
            contributions: activity.contributions,
            longest_streak: activity.longest_streak,
            current_streak: activity.current_streak,
        }
    }

    /// Builds a record from the profile alone, with no activity or repository data
    pub fn from_profile(profile: UserProfile) -> Self {
        Self::new(
            profile,
            0,
            RepositorySummary::default(),
            ActivitySummary::default(),
        )
    }
}
