//! Ranking orders for user records

use crate::crawler::UserRecord;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Field a ranking is ordered by; every order is descending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Contributions,
    Name,
    LongestStreak,
    CurrentStreak,
    Language,
    Followers,
    Join,
    Organizations,
    Repositories,
    Stars,
}

impl SortKey {
    pub const ALL: [SortKey; 10] = [
        SortKey::Contributions,
        SortKey::Name,
        SortKey::LongestStreak,
        SortKey::CurrentStreak,
        SortKey::Language,
        SortKey::Followers,
        SortKey::Join,
        SortKey::Organizations,
        SortKey::Repositories,
        SortKey::Stars,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contributions => "contributions",
            Self::Name => "name",
            Self::LongestStreak => "lstreak",
            Self::CurrentStreak => "cstreak",
            Self::Language => "language",
            Self::Followers => "followers",
            Self::Join => "join",
            Self::Organizations => "organizations",
            Self::Repositories => "repositories",
            Self::Stars => "stars",
        }
    }

    /// Compares two records so that the larger value comes first
    fn compare(&self, a: &UserRecord, b: &UserRecord) -> Ordering {
        let ascending = match self {
            Self::Contributions => a.contributions.cmp(&b.contributions),
            Self::Name => display_name(a).cmp(display_name(b)),
            Self::LongestStreak => a.longest_streak.cmp(&b.longest_streak),
            Self::CurrentStreak => a.current_streak.cmp(&b.current_streak),
            Self::Language => a.language.cmp(&b.language),
            Self::Followers => a.followers.cmp(&b.followers),
            Self::Join => a.joined.cmp(&b.joined),
            Self::Organizations => a.organizations.cmp(&b.organizations),
            Self::Repositories => a.repositories.cmp(&b.repositories),
            Self::Stars => a.stars.cmp(&b.stars),
        };
        ascending.reverse()
    }
}

fn display_name(record: &UserRecord) -> &str {
    record.name.as_deref().unwrap_or(&record.login)
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        SortKey::ALL
            .into_iter()
            .find(|k| k.as_str() == key)
            .ok_or_else(|| {
                let names: Vec<&str> = SortKey::ALL.iter().map(|k| k.as_str()).collect();
                format!("unknown sort key '{}' (expected one of: {})", s, names.join(", "))
            })
    }
}

/// Sorts records by `key`, descending; ties keep login order
pub fn sort_records(records: &mut [UserRecord], key: SortKey) {
    records.sort_by(|a, b| key.compare(a, b).then_with(|| a.login.cmp(&b.login)));
}
