use crate::state::{CrawlState, PersistedState};
use crate::storage::traits::{StateStore, StorageError, StorageResult};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Crawl state stored as a pretty-printed JSON file
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for JsonStateStore {
    fn load(&self) -> StorageResult<Option<CrawlState>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;
        let record: PersistedState = serde_json::from_str(&content)?;
        let state = CrawlState::from_persisted(record)
            .map_err(|e| StorageError::InvalidState(e.to_string()))?;

        tracing::debug!(
            "Loaded state for '{}' with {} partitions from {}",
            state.target().name(),
            state.partitions().len(),
            self.path.display()
        );

        Ok(Some(state))
    }

    fn save(&mut self, state: &CrawlState) -> StorageResult<()> {
        let json = serde_json::to_string_pretty(&state.to_persisted())?;

        // Write to a sibling file first so an interrupted save never truncates the old state
        let tmp_path = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(json.as_bytes())?;
            file.write_all(b"\n")?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        tracing::debug!("Saved state to {}", self.path.display());
        Ok(())
    }
}
