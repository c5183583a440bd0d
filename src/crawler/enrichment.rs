//! Enrichment workers and the shared result set
//!
//! Each worker takes logins off the queue, claims them in the seen-set, fetches
//! their details and appends accepted records. The seen-set and the records
//! are guarded by two independent locks, neither held across an await.

use crate::crawler::api::SearchApi;
use crate::crawler::queue::EntityConsumer;
use crate::crawler::user::UserRecord;
use crate::output::CrawlStatistics;
use crate::state::ExclusionSets;
use crate::{CityError, Result};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Outcome of claiming a login
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// The caller owns the login and must enrich it
    Claimed,
    Duplicate,
    Excluded,
}

/// Seen-set plus accepted records
#[derive(Debug, Default)]
pub struct ResultSet {
    seen: Mutex<HashSet<String>>,
    records: Mutex<Vec<UserRecord>>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims a login for enrichment
    ///
    /// The duplicate check, the exclusion check and the insertion happen in a
    /// single critical section, so at most one caller ever gets `Claimed` for a
    /// given login.
    pub fn claim(&self, login: &str, exclusions: &ExclusionSets) -> Claim {
        let mut seen = lock(&self.seen);
        if seen.contains(login) {
            return Claim::Duplicate;
        }
        if exclusions.is_excluded_user(login) {
            return Claim::Excluded;
        }
        seen.insert(login.to_string());
        Claim::Claimed
    }

    /// Appends an enriched record
    pub fn accept(&self, record: UserRecord) {
        lock(&self.records).push(record);
    }

    pub fn seen_count(&self) -> usize {
        lock(&self.seen).len()
    }

    pub fn len(&self) -> usize {
        lock(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Takes the accepted records in insertion order, leaving the set empty
    pub fn take_records(&self) -> Vec<UserRecord> {
        std::mem::take(&mut *lock(&self.records))
    }
}

/// Locks a mutex, recovering the data if another worker panicked while holding it
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// What a worker needs to process logins
struct Worker<A: ?Sized> {
    id: usize,
    api: Arc<A>,
    queue: EntityConsumer,
    results: Arc<ResultSet>,
    exclusions: Arc<ExclusionSets>,
    stats: Arc<CrawlStatistics>,
    cancel: CancellationToken,
}

impl<A: SearchApi + ?Sized> Worker<A> {
    async fn run(self) {
        tracing::debug!("Worker {} started", self.id);

        while let Some(login) = self.queue.next(&self.cancel).await {
            match self.results.claim(&login, &self.exclusions) {
                Claim::Claimed => {}
                Claim::Duplicate => {
                    self.stats.record_duplicate();
                    continue;
                }
                Claim::Excluded => {
                    tracing::debug!("Skipping excluded user {}", login);
                    self.stats.record_excluded_user();
                    continue;
                }
            }

            match self.enrich(&login).await {
                Ok(Some(record)) => {
                    tracing::debug!("Accepted {}", login);
                    self.results.accept(record);
                    self.stats.record_accepted();
                }
                Ok(None) => self.stats.record_excluded_location(),
                Err(CityError::Cancelled) => break,
                Err(e) => {
                    tracing::warn!("Skipping user {}: {}", login, e);
                    self.stats.record_failed_user();
                }
            }
        }

        tracing::debug!("Worker {} finished", self.id);
    }

    /// Fetches the record of a claimed login, or None if its location is excluded
    async fn enrich(&self, login: &str) -> Result<Option<UserRecord>> {
        let profile = self.api.user_profile(login).await?;

        if self.exclusions.is_excluded_location(profile.location()) {
            tracing::debug!(
                "Skipping {} with excluded location {:?}",
                login,
                profile.location()
            );
            return Ok(None);
        }

        let record = self.api.user_record(profile).await?;

        // The detail record carries the authoritative location
        if self.exclusions.is_excluded_location(&record.location) {
            return Ok(None);
        }
        Ok(Some(record))
    }
}

/// A fixed-size pool of enrichment workers
pub struct EnrichmentPool {
    handles: Vec<JoinHandle<()>>,
}

impl EnrichmentPool {
    /// Spawns `workers` tasks draining `queue`
    pub fn start<A>(
        workers: usize,
        api: Arc<A>,
        queue: EntityConsumer,
        results: Arc<ResultSet>,
        exclusions: Arc<ExclusionSets>,
        stats: Arc<CrawlStatistics>,
        cancel: CancellationToken,
    ) -> Self
    where
        A: SearchApi + ?Sized + 'static,
    {
        let handles = (0..workers.max(1))
            .map(|id| {
                let worker = Worker {
                    id,
                    api: Arc::clone(&api),
                    queue: queue.clone(),
                    results: Arc::clone(&results),
                    exclusions: Arc::clone(&exclusions),
                    stats: Arc::clone(&stats),
                    cancel: cancel.clone(),
                };
                tokio::spawn(worker.run())
            })
            .collect();

        Self { handles }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Waits for every worker to exit
    pub async fn join(self) -> Result<()> {
        for handle in self.handles {
            handle.await?;
        }
        Ok(())
    }
}
