//! Crawler coordinator - main crawl orchestration logic
//!
//! The crawl runs through a fixed sequence of phases:
//!
//! 1. `Idle -> PartitioningOrLoaded`: load the partitions from the persisted
//!    state, or compute them over the date domain and checkpoint them
//! 2. `-> Crawling`: start the enrichment pool and page every partition in
//!    order, queueing each login (single producer)
//! 3. `-> Draining`: close the queue once the last partition is paged
//! 4. `-> Done`: join the workers, persist the state with a new last-run date
//!    and hand back the results

use crate::config::{Config, CrawlerConfig};
use crate::crawler::api::{GitHubClient, SearchApi};
use crate::crawler::enrichment::{EnrichmentPool, ResultSet};
use crate::crawler::fetcher::RateLimitedClient;
use crate::crawler::pager::SearchPager;
use crate::crawler::partitioner::{RangePartitioner, SearchProbe};
use crate::crawler::queue::{entity_queue, EntityProducer};
use crate::crawler::user::UserRecord;
use crate::output::{CrawlStatistics, StatisticsSnapshot};
use crate::state::{CrawlPhase, CrawlState, DateRange, ExclusionSets, PartitionSet, Range, SearchTarget};
use crate::storage::{open_state_store, JsonStateStore, StateStore};
use crate::{CityError, CrawlStage, Result};
use chrono::{DateTime, NaiveDate, Utc};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Knobs fixed for the duration of a crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlOptions {
    /// Size of the enrichment pool
    pub workers: usize,

    /// First day of the partitioned domain
    pub domain_start: NaiveDate,

    /// Last day of the partitioned domain; today when None
    pub domain_end: Option<NaiveDate>,

    /// Ignore persisted partitions and compute them again
    pub recompute: bool,
}

impl CrawlOptions {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            workers: config.workers as usize,
            domain_start: config.domain_start,
            domain_end: None,
            recompute: false,
        }
    }

    pub fn with_recompute(mut self, recompute: bool) -> Self {
        self.recompute = recompute;
        self
    }

    /// The account-creation domain to partition
    pub fn domain(&self) -> Result<DateRange> {
        let end = self.domain_end.unwrap_or_else(|| Utc::now().date_naive());
        Range::new(self.domain_start, end)
    }
}

/// The result of a completed crawl
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    /// The state as persisted at the end of the crawl
    pub state: CrawlState,

    /// Accepted records, in acceptance order
    pub records: Vec<UserRecord>,

    pub stats: StatisticsSnapshot,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CrawlOutcome {
    pub fn duration_seconds(&self) -> u64 {
        (self.finished_at - self.started_at).num_seconds().max(0) as u64
    }
}

/// Main crawler structure
pub struct Crawler<A: ?Sized, S> {
    api: Arc<A>,
    store: S,
    options: CrawlOptions,
    phase: CrawlPhase,
    stats: Arc<CrawlStatistics>,
    cancel: CancellationToken,
}

impl Crawler<GitHubClient, JsonStateStore> {
    /// Builds a crawler against the GitHub API from the configuration
    ///
    /// Credentials are resolved here, so a missing credential fails before any
    /// request is made.
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `cancel` - Token that stops the crawl (and any wait in progress) when fired
    pub fn from_config(config: &Config, cancel: CancellationToken) -> Result<Self> {
        let credentials = config.credentials()?;
        let http = RateLimitedClient::from_config(&config.crawler)?.with_cancellation(cancel.clone());
        let api = GitHubClient::new(
            http,
            credentials,
            &config.crawler.api_base_url,
            &config.crawler.web_base_url,
        )?;
        let store = open_state_store(Path::new(&config.output.state_path));

        Ok(Self::new(Arc::new(api), store, CrawlOptions::from_config(&config.crawler))
            .with_cancellation(cancel))
    }
}

impl<A, S> Crawler<A, S>
where
    A: SearchApi + ?Sized + 'static,
    S: StateStore,
{
    pub fn new(api: Arc<A>, store: S, options: CrawlOptions) -> Self {
        Self {
            api,
            store,
            options,
            phase: CrawlPhase::Idle,
            stats: Arc::new(CrawlStatistics::new()),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn options_mut(&mut self) -> &mut CrawlOptions {
        &mut self.options
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn statistics(&self) -> StatisticsSnapshot {
        self.stats.snapshot()
    }

    fn transition(&mut self, next: CrawlPhase) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            return Err(CityError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        tracing::debug!("Crawl phase {} -> {}", self.phase, next);
        self.phase = next;
        Ok(())
    }

    /// Runs a complete crawl for `target`
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlOutcome)` - Every partition was paged and every worker joined
    /// * `Err(CityError::Stage)` - A fatal error, tagged with the failing stage
    /// * `Err(CityError::Cancelled)` - The crawl was cancelled; nothing was persisted
    pub async fn run(
        &mut self,
        target: SearchTarget,
        exclusions: ExclusionSets,
    ) -> Result<CrawlOutcome> {
        let state = self.prepare(target, exclusions).await?;
        self.crawl(state).await
    }

    /// Loads or computes the partitions for `target`
    ///
    /// A persisted state is reused when it was computed for the same locations
    /// from the same domain start and recomputation was not requested. A
    /// renamed target keeps its partitions under the new name. Freshly
    /// computed partitions are saved right away so an interrupted crawl does
    /// not have to redo them. Configured exclusions are added to the persisted
    /// ones.
    pub async fn prepare(
        &mut self,
        target: SearchTarget,
        exclusions: ExclusionSets,
    ) -> Result<CrawlState> {
        self.transition(CrawlPhase::PartitioningOrLoaded)?;

        let loaded = match self.store.load() {
            Ok(loaded) => loaded,
            // The saved state is about to be replaced anyway
            Err(e) if self.options.recompute => {
                tracing::warn!("Ignoring unreadable saved state: {}", e);
                None
            }
            Err(e) => return Err(CityError::from(e).at_stage(CrawlStage::Persistence)),
        };

        let (mut state, reuse) = match loaded {
            Some(mut state) if state.matches_target(&target) => {
                if state.target().name() != target.name() {
                    tracing::info!(
                        "Saved state for {:?} renamed to {:?}",
                        state.target().name(),
                        target.name()
                    );
                    state.retarget(target);
                }

                let starts_at_domain = state.starts_at(self.options.domain_start);
                if !starts_at_domain && !state.needs_partitioning() {
                    tracing::warn!(
                        "Saved partitions do not start at {}, recomputing",
                        self.options.domain_start
                    );
                }

                let reuse =
                    !self.options.recompute && !state.needs_partitioning() && starts_at_domain;
                (state, reuse)
            }
            Some(state) => {
                tracing::warn!(
                    "Saved state was computed for {:?}, starting over for {:?}",
                    state.target().locations(),
                    target.locations()
                );
                (CrawlState::fresh(target, ExclusionSets::default()), false)
            }
            None => (CrawlState::fresh(target, ExclusionSets::default()), false),
        };
        state.merge_exclusions(&exclusions);

        if reuse {
            tracing::info!(
                "Loaded {} partitions for {} (last run: {})",
                state.partitions().len(),
                state.target().name(),
                state
                    .last_run()
                    .map_or_else(|| "never".to_string(), |d| d.to_string())
            );
            return Ok(state);
        }

        let partitions = self
            .compute_partitions(state.target())
            .await
            .map_err(|e| e.at_stage(CrawlStage::Partitioning))?;
        state.set_partitions(partitions);

        self.store
            .save(&state)
            .map_err(|e| CityError::from(e).at_stage(CrawlStage::Persistence))?;

        Ok(state)
    }

    async fn compute_partitions(&self, target: &SearchTarget) -> Result<PartitionSet<NaiveDate>> {
        let domain = self.options.domain()?;
        tracing::info!("Computing partitions of {} for {}", domain, target.name());

        RangePartitioner::new(SearchProbe::new(&*self.api, target))
            .with_cancellation(self.cancel.clone())
            .compute_partitions(domain)
            .await
    }

    /// Pages every partition of `state` and enriches the discovered users
    pub async fn crawl(&mut self, mut state: CrawlState) -> Result<CrawlOutcome> {
        self.transition(CrawlPhase::Crawling)?;
        let started_at = Utc::now();

        // Workers stop on the caller's token and on a fatal paging error
        let workers_cancel = self.cancel.child_token();
        let (producer, consumer) = entity_queue();
        let results = Arc::new(ResultSet::new());

        let pool = EnrichmentPool::start(
            self.options.workers,
            Arc::clone(&self.api),
            consumer,
            Arc::clone(&results),
            Arc::new(state.exclusions().clone()),
            Arc::clone(&self.stats),
            workers_cancel.clone(),
        );

        tracing::info!(
            "Crawling {} partitions for {} with {} workers",
            state.partitions().len(),
            state.target().name(),
            pool.size()
        );

        let paged = self.page_partitions(&state, &producer).await;

        self.transition(CrawlPhase::Draining)?;
        if paged.is_err() {
            workers_cancel.cancel();
        }
        tracing::debug!("Paging finished, {} logins still queued", producer.pending());
        producer.finish();

        let joined = pool.join().await;
        paged?;
        joined.map_err(|e| e.at_stage(CrawlStage::Enrichment))?;

        if self.cancel.is_cancelled() {
            tracing::warn!("Crawl cancelled, state not saved");
            return Err(CityError::Cancelled);
        }

        state.mark_run(Utc::now().date_naive());
        self.store
            .save(&state)
            .map_err(|e| CityError::from(e).at_stage(CrawlStage::Persistence))?;

        self.transition(CrawlPhase::Done)?;

        let records = results.take_records();
        let stats = self.stats.snapshot();
        tracing::info!(
            "Crawl complete: {} users accepted out of {} discovered",
            records.len(),
            stats.discovered
        );

        Ok(CrawlOutcome {
            state,
            records,
            stats,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Pages the partitions in order
    ///
    /// A partition whose response cannot be parsed is logged and skipped. Any
    /// other failure ends the crawl, since persisting a partial result would
    /// record it as a completed run.
    async fn page_partitions(&self, state: &CrawlState, producer: &EntityProducer) -> Result<()> {
        let total = state.partitions().len();

        for (index, range) in state.partitions().iter().enumerate() {
            match self.page_partition(state.target(), range, producer).await {
                Ok(emitted) => {
                    self.stats.record_partition();
                    tracing::info!(
                        "Partition {}/{} ({}): {} logins",
                        index + 1,
                        total,
                        range,
                        emitted
                    );
                }
                Err(e @ CityError::MalformedResponse { .. }) => {
                    tracing::warn!("Skipping partition {}: {}", range, e);
                    self.stats.record_skipped_partition();
                }
                Err(CityError::Cancelled) => return Err(CityError::Cancelled),
                Err(e) => {
                    tracing::error!("Paging partition {} failed: {}", range, e);
                    return Err(e.at_stage(CrawlStage::Paging));
                }
            }
        }

        Ok(())
    }

    /// Pages one partition, queueing every login; returns how many were queued
    async fn page_partition(
        &self,
        target: &SearchTarget,
        range: &DateRange,
        producer: &EntityProducer,
    ) -> Result<u64> {
        let mut pager =
            SearchPager::new(&*self.api, target, Some(range)).with_cancellation(self.cancel.clone());
        let mut emitted = 0u64;

        while let Some(logins) = pager.next_page().await? {
            self.stats.record_page(logins.len());
            for login in logins {
                // Only fails once every worker has exited
                if !producer.push(login) {
                    return Err(CityError::Cancelled);
                }
                emitted += 1;
            }
        }

        Ok(emitted)
    }
}
