//! State module for the crawl's data model
//!
//! # Components
//!
//! - `Range` / `PartitionSet`: ordered key ranges and the partitions computed over them
//! - `SearchTarget` / `ExclusionSets`: what is searched for and what is filtered out
//! - `CrawlState`: the resumable snapshot persisted between runs
//! - `CrawlPhase`: the orchestrator's state machine

mod crawl_state;
mod phase;
mod range;
mod target;

// Re-export main types
pub use crawl_state::{CrawlState, PersistedState};
pub use phase::CrawlPhase;
pub use range::{Bisect, DateRange, PartitionSet, Range};
pub use target::{ExclusionSets, SearchTarget};
