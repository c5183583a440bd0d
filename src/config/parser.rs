use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Environment variable consulted when `client-id` is absent from the file
pub const CLIENT_ID_ENV: &str = "GITHUB_CLIENT_ID";

/// Environment variable consulted when `client-secret` is absent from the file
pub const CLIENT_SECRET_ENV: &str = "GITHUB_CLIENT_SECRET";

/// Loads and parses a configuration file from the given path
///
/// Credentials missing from the file are taken from the environment before
/// validation runs, so a config without any credential source is rejected here,
/// before any network activity.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config = parse_config(&content)?;

    if config.credentials.client_id.is_none() {
        config.credentials.client_id = std::env::var(CLIENT_ID_ENV).ok();
    }
    if config.credentials.client_secret.is_none() {
        config.credentials.client_secret = std::env::var(CLIENT_SECRET_ENV).ok();
    }

    validate(&config)?;

    Ok(config)
}

/// Parses configuration TOML without touching the environment or validating
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// This is recorded in the ranking report so runs made with different
/// configurations can be told apart.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
