use crate::state::CrawlState;
use crate::storage::traits::{StateStore, StorageResult};

/// Keeps the crawl state in memory; used for dry runs and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    state: Option<CrawlState>,
    saves: usize,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds a state
    pub fn with_state(state: CrawlState) -> Self {
        Self {
            state: Some(state),
            saves: 0,
        }
    }

    /// Returns the last saved (or initial) state
    pub fn state(&self) -> Option<&CrawlState> {
        self.state.as_ref()
    }

    /// Returns how many times `save` was called
    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> StorageResult<Option<CrawlState>> {
        Ok(self.state.clone())
    }

    fn save(&mut self, state: &CrawlState) -> StorageResult<()> {
        self.state = Some(state.clone());
        self.saves += 1;
        Ok(())
    }
}
