use crate::config::types::{Config, CrawlerConfig, CredentialsConfig, OutputConfig, TargetConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_credentials(&config.credentials)?;
    validate_crawler_config(&config.crawler)?;
    validate_target_config(&config.target)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates that both credentials are present and non-blank
fn validate_credentials(config: &CredentialsConfig) -> Result<(), ConfigError> {
    let present = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.trim().is_empty());

    if !present(&config.client_id) {
        return Err(ConfigError::MissingCredential("client-id"));
    }
    if !present(&config.client_secret) {
        return Err(ConfigError::MissingCredential("client-secret"));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 100 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 100, got {}",
            config.workers
        )));
    }

    if config.max_retries > 20 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= 20, got {}",
            config.max_retries
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    validate_base_url("api_base_url", &config.api_base_url)?;
    validate_base_url("web_base_url", &config.web_base_url)?;

    let today = chrono::Utc::now().date_naive();
    if config.domain_start > today {
        return Err(ConfigError::Validation(format!(
            "domain_start {} lies in the future",
            config.domain_start
        )));
    }

    Ok(())
}

/// Validates an http(s) base URL
fn validate_base_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {}: {}", field, e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            field, value
        )));
    }

    Ok(())
}

/// Validates the search target
fn validate_target_config(config: &TargetConfig) -> Result<(), ConfigError> {
    if config.name.trim().is_empty() {
        return Err(ConfigError::EmptyTarget);
    }

    if config.locations.iter().any(|l| l.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "locations cannot contain blank entries".to_string(),
        ));
    }

    if config.excluded_locations.iter().any(|l| l.is_empty()) {
        // An empty substring would exclude every user
        return Err(ConfigError::Validation(
            "excluded_locations cannot contain empty entries".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    for (field, value) in [
        ("state_path", &config.state_path),
        ("results_path", &config.results_path),
        ("summary_path", &config.summary_path),
    ] {
        if value.is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", field)));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_valid_config() -> Config {
        Config {
            credentials: CredentialsConfig {
                client_id: Some("id".to_string()),
                client_secret: Some("secret".to_string()),
            },
            crawler: CrawlerConfig::default(),
            target: TargetConfig {
                name: "Granada".to_string(),
                locations: vec!["Granada".to_string()],
                excluded_users: vec![],
                excluded_locations: vec![],
            },
            output: OutputConfig {
                state_path: "./state.json".to_string(),
                results_path: "./users.json".to_string(),
                summary_path: "./summary.md".to_string(),
            },
        }
    }

    #[test]
    fn test_valid_config() {
        let config = create_valid_config();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_missing_client_id() {
        let mut config = create_valid_config();
        config.credentials.client_id = None;
        assert!(matches!(
            validate(&config),
            Err(ConfigError::MissingCredential("client-id"))
        ));
    }

    #[test]
    fn test_blank_client_secret() {
        let mut config = create_valid_config();
        config.credentials.client_secret = Some("   ".to_string());
        assert!(matches!(
            validate(&config),
            Err(ConfigError::MissingCredential("client-secret"))
        ));
    }

    #[test]
    fn test_invalid_worker_count() {
        let mut config = create_valid_config();
        config.crawler.workers = 0;
        assert!(validate(&config).is_err());

        config.crawler.workers = 101;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_invalid_api_url() {
        let mut config = create_valid_config();
        config.crawler.api_base_url = "not a url".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));

        config.crawler.api_base_url = "ftp://api.github.com".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_empty_target_name() {
        let mut config = create_valid_config();
        config.target.name = " ".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::EmptyTarget)));
    }

    #[test]
    fn test_blank_location_entry() {
        let mut config = create_valid_config();
        config.target.locations.push("".to_string());
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_excluded_location() {
        let mut config = create_valid_config();
        config.target.excluded_locations.push(String::new());
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_domain_start_in_future() {
        let mut config = create_valid_config();
        config.crawler.domain_start = chrono::Utc::now().date_naive() + chrono::Duration::days(2);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_output_path() {
        let mut config = create_valid_config();
        config.output.results_path = String::new();
        assert!(validate(&config).is_err());
    }
}
