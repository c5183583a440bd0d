//! Ordered key ranges and partition sets
//!
//! The partitioning algorithm only needs a total order, a way to find a
//! midpoint and a successor, and a string form for the search query. `Bisect`
//! captures exactly that; dates are the key type used in practice.

use crate::CityError;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A totally ordered key that can be split at a midpoint
pub trait Bisect: Ord + Copy + fmt::Debug + fmt::Display {
    /// Returns `mid` with `lo <= mid < hi`, or None if `[lo, hi]` cannot be split
    fn midpoint(lo: Self, hi: Self) -> Option<Self>;

    /// Returns the next key after this one
    fn successor(self) -> Option<Self>;
}

impl Bisect for NaiveDate {
    fn midpoint(lo: Self, hi: Self) -> Option<Self> {
        let days = (hi - lo).num_days();
        if days < 1 {
            return None;
        }
        lo.checked_add_signed(chrono::Duration::days(days / 2))
    }

    fn successor(self) -> Option<Self> {
        self.succ_opt()
    }
}

impl Bisect for u64 {
    fn midpoint(lo: Self, hi: Self) -> Option<Self> {
        if hi <= lo {
            return None;
        }
        Some(lo + (hi - lo) / 2)
    }

    fn successor(self) -> Option<Self> {
        self.checked_add(1)
    }
}

/// An inclusive range `[start, end]` with `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range<K> {
    start: K,
    end: K,
}

/// Ranges of account-creation dates
pub type DateRange = Range<NaiveDate>;

impl<K: Bisect> Range<K> {
    /// Creates a range, rejecting `start > end`
    pub fn new(start: K, end: K) -> Result<Self, CityError> {
        if start > end {
            return Err(CityError::InvalidRange(format!("{} > {}", start, end)));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> K {
        self.start
    }

    pub fn end(&self) -> K {
        self.end
    }

    /// Returns true if the range cannot be split any further
    pub fn is_degenerate(&self) -> bool {
        K::midpoint(self.start, self.end).is_none()
    }

    /// Splits the range into two adjacent, non-overlapping halves
    ///
    /// Returns None for degenerate ranges.
    pub fn split(&self) -> Option<(Self, Self)> {
        let mid = K::midpoint(self.start, self.end)?;
        let right_start = mid.successor()?;
        Some((
            Self {
                start: self.start,
                end: mid,
            },
            Self {
                start: right_start,
                end: self.end,
            },
        ))
    }
}

impl<K: fmt::Display> fmt::Display for Range<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

// Persisted as a two-element array `[start, end]`
impl<K: Serialize> Serialize for Range<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.start, &self.end).serialize(serializer)
    }
}

impl<'de, K: Bisect + Deserialize<'de>> Deserialize<'de> for Range<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (start, end) = <(K, K)>::deserialize(deserializer)?;
        Range::new(start, end).map_err(serde::de::Error::custom)
    }
}

/// Ordered, disjoint ranges whose union is the partitioned domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
#[serde(bound(
    serialize = "K: Serialize",
    deserialize = "K: Bisect + Deserialize<'de>"
))]
pub struct PartitionSet<K> {
    ranges: Vec<Range<K>>,
}

impl<K: Bisect> PartitionSet<K> {
    pub fn new() -> Self {
        Self { ranges: Vec::new() }
    }

    /// Appends a leaf; leaves must be pushed in ascending order
    pub fn push(&mut self, range: Range<K>) {
        self.ranges.push(range);
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Range<K>> {
        self.ranges.iter()
    }

    pub fn as_slice(&self) -> &[Range<K>] {
        &self.ranges
    }

    /// Checks that the leaves reconstruct `domain` exactly, with no gaps or overlaps
    pub fn covers(&self, domain: &Range<K>) -> bool {
        let (first, last) = match (self.ranges.first(), self.ranges.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return false,
        };

        if first.start != domain.start || last.end != domain.end {
            return false;
        }

        self.ranges
            .windows(2)
            .all(|pair| pair[0].end.successor() == Some(pair[1].start))
    }

    /// Returns the range spanned by the first and last leaf
    pub fn span(&self) -> Option<Range<K>> {
        let first = self.ranges.first()?;
        let last = self.ranges.last()?;
        Some(Range {
            start: first.start,
            end: last.end,
        })
    }
}

impl<K: Bisect> Default for PartitionSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Bisect> FromIterator<Range<K>> for PartitionSet<K> {
    fn from_iter<I: IntoIterator<Item = Range<K>>>(iter: I) -> Self {
        Self {
            ranges: iter.into_iter().collect(),
        }
    }
}

impl<'a, K> IntoIterator for &'a PartitionSet<K> {
    type Item = &'a Range<K>;
    type IntoIter = std::slice::Iter<'a, Range<K>>;

    fn into_iter(self) -> Self::IntoIter {
        self.ranges.iter()
    }
}
