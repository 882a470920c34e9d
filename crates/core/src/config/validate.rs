use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Cache directory is not empty
/// - Search timeout is not 0
/// - Enabled source URLs look like http(s) endpoints
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.cache.dir.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "cache.dir cannot be empty".to_string(),
        ));
    }

    if config.search.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "search.timeout_secs cannot be 0".to_string(),
        ));
    }

    for (name, enabled, url) in [
        ("search.tosho.url", config.search.tosho.enabled, &config.search.tosho.url),
        ("search.nyaa.url", config.search.nyaa.enabled, &config.search.nyaa.url),
    ] {
        if enabled && !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::ValidationError(format!(
                "{} must be an http(s) URL, got {:?}",
                name, url
            )));
        }
    }

    Ok(())
}
