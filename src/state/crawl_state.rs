//! Resumable crawl state
//!
//! A crawl state is built fresh on the first run, which triggers partition
//! computation, or loaded from its persisted form, which skips it. It is written
//! back with a new last-run date after every successful crawl.

use crate::state::{DateRange, ExclusionSets, PartitionSet, SearchTarget};
use crate::ConfigError;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// The on-disk record of a crawl state
///
/// Fields are declared in key order so the serialized object has sorted keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(rename = "excludedLocations", default)]
    pub excluded_locations: Vec<String>,

    #[serde(rename = "excludedUsers", default)]
    pub excluded_users: Vec<String>,

    #[serde(default)]
    pub intervals: Vec<DateRange>,

    #[serde(default)]
    pub last_date: Option<NaiveDate>,

    #[serde(default)]
    pub locations: Vec<String>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Snapshot of {target, partitions, exclusions, last-run date}
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlState {
    target: SearchTarget,
    partitions: PartitionSet<NaiveDate>,
    exclusions: ExclusionSets,
    last_run: Option<NaiveDate>,
}

impl CrawlState {
    /// Creates a state that has no partitions yet
    pub fn fresh(target: SearchTarget, exclusions: ExclusionSets) -> Self {
        Self {
            target,
            partitions: PartitionSet::new(),
            exclusions,
            last_run: None,
        }
    }

    /// Rebuilds a state from its persisted record
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlState)` - The restored state
    /// * `Err(ConfigError)` - The record has no usable location
    pub fn from_persisted(record: PersistedState) -> Result<Self, ConfigError> {
        let target = SearchTarget::new(record.name, record.locations)?;
        let exclusions = ExclusionSets::new(record.excluded_users, record.excluded_locations);

        Ok(Self {
            target,
            partitions: record.intervals.into_iter().collect(),
            exclusions,
            last_run: record.last_date,
        })
    }

    /// Produces the persisted record for this state
    pub fn to_persisted(&self) -> PersistedState {
        PersistedState {
            excluded_locations: self.exclusions.locations().cloned().collect(),
            excluded_users: self.exclusions.users().cloned().collect(),
            intervals: self.partitions.as_slice().to_vec(),
            last_date: self.last_run,
            locations: self.target.locations().to_vec(),
            name: self.target.name().to_string(),
        }
    }

    pub fn target(&self) -> &SearchTarget {
        &self.target
    }

    pub fn partitions(&self) -> &PartitionSet<NaiveDate> {
        &self.partitions
    }

    pub fn exclusions(&self) -> &ExclusionSets {
        &self.exclusions
    }

    pub fn last_run(&self) -> Option<NaiveDate> {
        self.last_run
    }

    /// Returns true if partitions have to be computed before crawling
    pub fn needs_partitioning(&self) -> bool {
        self.partitions.is_empty()
    }

    /// Returns true if this state was computed for the same locations as `target`
    ///
    /// The name is not part of any query, so partitions stay valid across a
    /// rename; see [`CrawlState::retarget`].
    pub fn matches_target(&self, target: &SearchTarget) -> bool {
        self.target.locations() == target.locations()
    }

    /// Returns true if the partitions start at `domain_start`
    pub fn starts_at(&self, domain_start: NaiveDate) -> bool {
        self.partitions
            .span()
            .map_or(false, |span| span.start() == domain_start)
    }

    /// Takes over the name of a target with the same locations
    pub fn retarget(&mut self, target: SearchTarget) {
        debug_assert!(self.matches_target(&target));
        self.target = target;
    }

    /// Replaces the partition set after a full recomputation
    pub fn set_partitions(&mut self, partitions: PartitionSet<NaiveDate>) {
        self.partitions = partitions;
    }

    /// Adds exclusions on top of the persisted ones
    pub fn merge_exclusions(&mut self, extra: &ExclusionSets) {
        self.exclusions = ExclusionSets::new(
            self.exclusions.users().chain(extra.users()).cloned(),
            self.exclusions
                .locations()
                .chain(extra.locations())
                .cloned(),
        );
    }

    /// Records the date of a successful crawl
    pub fn mark_run(&mut self, date: NaiveDate) {
        self.last_run = Some(date);
    }
}
