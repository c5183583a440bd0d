//! Configuration module for GitHub-City
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use github_city::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("city.toml")).unwrap();
//! println!("Crawler will use {} workers", config.crawler.workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, CredentialsConfig, OutputConfig, TargetConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;

use crate::crawler::Credentials;
use crate::state::{ExclusionSets, SearchTarget};
use crate::ConfigResult;

impl Config {
    /// Resolves the API credentials, failing if either value is missing
    pub fn credentials(&self) -> ConfigResult<Credentials> {
        Credentials::new(
            self.credentials.client_id.clone().unwrap_or_default(),
            self.credentials.client_secret.clone().unwrap_or_default(),
        )
    }

    /// Builds the search target described by the `[target]` table
    pub fn search_target(&self) -> ConfigResult<SearchTarget> {
        SearchTarget::new(self.target.name.clone(), self.target.locations.clone())
    }

    /// Builds the exclusion sets described by the `[target]` table
    pub fn exclusions(&self) -> ExclusionSets {
        ExclusionSets::new(
            self.target.excluded_users.iter().cloned(),
            self.target.excluded_locations.iter().cloned(),
        )
    }
}
