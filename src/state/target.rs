use crate::ConfigError;
use std::collections::BTreeSet;

/// The location filter every search and probe request is built from
///
/// Locations are OR-combined into a single query fragment. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTarget {
    name: String,
    locations: Vec<String>,
}

impl SearchTarget {
    /// Creates a target; an empty location list falls back to the name itself
    ///
    /// # Returns
    ///
    /// * `Ok(SearchTarget)` - A target with at least one location
    /// * `Err(ConfigError::EmptyTarget)` - No usable location was given
    pub fn new(name: impl Into<String>, locations: Vec<String>) -> Result<Self, ConfigError> {
        let name = name.into();
        let mut locations: Vec<String> = locations
            .into_iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();

        if locations.is_empty() && !name.trim().is_empty() {
            locations.push(name.trim().to_string());
        }

        if locations.is_empty() {
            return Err(ConfigError::EmptyTarget);
        }

        Ok(Self { name, locations })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn locations(&self) -> &[String] {
        &self.locations
    }

    /// Builds the search qualifiers for this target, e.g. `location:"New York"`
    pub fn query_fragment(&self) -> String {
        self.locations
            .iter()
            .map(|l| format!("location:\"{}\"", l.replace('"', "")))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Users and location substrings filtered out of a crawl
///
/// Read-only while a crawl runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSets {
    users: BTreeSet<String>,
    locations: BTreeSet<String>,
}

impl ExclusionSets {
    pub fn new<U, L>(users: U, locations: L) -> Self
    where
        U: IntoIterator<Item = String>,
        L: IntoIterator<Item = String>,
    {
        Self {
            users: users.into_iter().collect(),
            locations: locations.into_iter().filter(|l| !l.is_empty()).collect(),
        }
    }

    /// Returns true if the login must never be enriched
    pub fn is_excluded_user(&self, login: &str) -> bool {
        self.users.contains(login)
    }

    /// Returns true if the location contains any excluded substring
    pub fn is_excluded_location(&self, location: &str) -> bool {
        self.locations.iter().any(|s| location.contains(s.as_str()))
    }

    pub fn users(&self) -> impl Iterator<Item = &String> {
        self.users.iter()
    }

    pub fn locations(&self) -> impl Iterator<Item = &String> {
        self.locations.iter()
    }
}
