//! Storage traits and error types

use crate::state::CrawlState;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid persisted state: {0}")]
    InvalidState(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for crawl state persistence backends
pub trait StateStore: Send {
    /// Loads the persisted state
    ///
    /// # Returns
    ///
    /// * `Ok(Some(CrawlState))` - A previously saved state
    /// * `Ok(None)` - Nothing has been saved yet
    /// * `Err(StorageError)` - The state exists but could not be read
    fn load(&self) -> StorageResult<Option<CrawlState>>;

    /// Saves the state, replacing any previous one
    fn save(&mut self, state: &CrawlState) -> StorageResult<()>;
}
