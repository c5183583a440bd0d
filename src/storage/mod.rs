//! Storage module for persisting crawl state
//!
//! The crawl only needs to persist enough to resume: the target, the computed
//! partitions, the exclusion sets and the last-run date. This module provides
//! the storage trait and its JSON-file and in-memory backends.

mod json;
mod memory;
mod traits;

pub use json::JsonStateStore;
pub use memory::MemoryStateStore;
pub use traits::{StateStore, StorageError, StorageResult};

use std::path::Path;

/// Opens the JSON state store at the given path
///
/// The file does not need to exist yet; it is created on first save.
pub fn open_state_store(path: &Path) -> JsonStateStore {
    JsonStateStore::new(path)
}
