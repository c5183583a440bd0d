//! Adaptive range partitioning
//!
//! The search endpoint returns at most `RESULT_CAP` results per query. To see
//! every match, the creation-date domain is bisected until every sub-range
//! matches fewer than `RESULT_CAP` users.

use crate::crawler::api::SearchApi;
use crate::state::{Bisect, DateRange, PartitionSet, Range, SearchTarget};
use crate::{CityError, Result};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Maximum number of results a single search query can return
pub const RESULT_CAP: u64 = 1000;

/// Counts the matches within a range
#[async_trait]
pub trait CountProbe<K: Bisect + Send + Sync>: Send + Sync {
    async fn count(&self, range: &Range<K>) -> Result<u64>;
}

/// Probes the search endpoint for the users of one target
pub struct SearchProbe<'a, A: ?Sized> {
    api: &'a A,
    target: &'a SearchTarget,
}

impl<'a, A: SearchApi + ?Sized> SearchProbe<'a, A> {
    pub fn new(api: &'a A, target: &'a SearchTarget) -> Self {
        Self { api, target }
    }
}

#[async_trait]
impl<'a, A: SearchApi + ?Sized> CountProbe<chrono::NaiveDate> for SearchProbe<'a, A> {
    async fn count(&self, range: &DateRange) -> Result<u64> {
        self.api.total_count(self.target, Some(range)).await
    }
}

/// Splits a domain into ranges that each stay under the result cap
pub struct RangePartitioner<P> {
    probe: P,
    cap: u64,
    cancel: CancellationToken,
}

impl<P> RangePartitioner<P> {
    pub fn new(probe: P) -> Self {
        Self {
            probe,
            cap: RESULT_CAP,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cap(mut self, cap: u64) -> Self {
        self.cap = cap;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Computes the partitions of `domain`
    ///
    /// Leaves come out in domain order: the left half of a split is resolved
    /// completely before the right half. A range that cannot be split is kept
    /// as a leaf whatever its count.
    ///
    /// # Returns
    ///
    /// * `Ok(PartitionSet)` - Disjoint ranges whose union is `domain`
    /// * `Err(CityError)` - A probe failed or the crawl was cancelled
    pub async fn compute_partitions<K>(&self, domain: Range<K>) -> Result<PartitionSet<K>>
    where
        K: Bisect + Send + Sync,
        P: CountProbe<K>,
    {
        let mut partitions = PartitionSet::new();
        let mut pending = vec![domain];

        while let Some(range) = pending.pop() {
            if self.cancel.is_cancelled() {
                return Err(CityError::Cancelled);
            }

            let count = self.probe.count(&range).await?;
            tracing::debug!("{}: {} results", range, count);

            if count < self.cap {
                partitions.push(range);
                continue;
            }

            match range.split() {
                Some((left, right)) => {
                    pending.push(right);
                    pending.push(left);
                }
                None => {
                    tracing::warn!(
                        "{} has {} results but cannot be split, some will be missed",
                        range,
                        count
                    );
                    partitions.push(range);
                }
            }
        }

        tracing::info!("Domain {} split into {} partitions", domain, partitions.len());
        Ok(partitions)
    }
}
