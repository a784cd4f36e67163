use crate::config::types::{
    ApiConfig, RecognitionConfig, RunConfig, SettingsConfig, SiteConfig, UrlConfig,
};
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Upper bound on concurrent car workers (one browser each)
const MAX_WORKERS_LIMIT: usize = 64;

/// Validates the entire configuration
pub fn validate(config: &RunConfig) -> Result<(), ConfigError> {
    validate_api_config(&config.api)?;
    validate_url_config(&config.url)?;
    validate_settings(&config.settings)?;
    validate_recognition_config(&config.recognition)?;
    validate_site_config(&config.site)?;
    Ok(())
}

fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    validate_http_url("PLATE_RECOGNIZER_API_URL", &config.api_url)
}

fn validate_url_config(config: &UrlConfig) -> Result<(), ConfigError> {
    validate_http_url("BASE_URL", &config.base_url)?;

    // The placeholder must be replaced before parsing
    let sample = config.main_url.replace("{page}", "1");
    validate_http_url("MAIN_URL", &sample)
}

/// Validates the page range and worker settings
fn validate_settings(config: &SettingsConfig) -> Result<(), ConfigError> {
    if config.start_page < 1 {
        return Err(ConfigError::Validation(format!(
            "START_PAGE must be >= 1, got {}",
            config.start_page
        )));
    }

    if config.end_page < config.start_page {
        return Err(ConfigError::Validation(format!(
            "END_PAGE ({}) must not be lower than START_PAGE ({})",
            config.end_page, config.start_page
        )));
    }

    if config.max_workers < 1 || config.max_workers > MAX_WORKERS_LIMIT {
        return Err(ConfigError::Validation(format!(
            "MAX_WORKERS must be between 1 and {}, got {}",
            MAX_WORKERS_LIMIT, config.max_workers
        )));
    }

    if config.start_car_number < 1 {
        return Err(ConfigError::Validation(format!(
            "START_CAR_NUMBER must be >= 1, got {}",
            config.start_car_number
        )));
    }

    Ok(())
}

fn validate_recognition_config(config: &RecognitionConfig) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&config.confidence_threshold) {
        return Err(ConfigError::Validation(format!(
            "CONFIDENCE_THRESHOLD must be between 0 and 1, got {}",
            config.confidence_threshold
        )));
    }

    Regex::new(&config.plate_pattern)
        .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", config.plate_pattern, e)))?;

    serde_json::from_str::<serde_json::Value>(&config.engine_config).map_err(|e| {
        ConfigError::Validation(format!("ENGINE_CONFIG must be valid JSON: {}", e))
    })?;

    Ok(())
}

fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    if config.listing_selector.trim().is_empty() {
        return Err(ConfigError::Validation(
            "LISTING_SELECTOR cannot be empty".to_string(),
        ));
    }

    if config.photo_selector.trim().is_empty() {
        return Err(ConfigError::Validation(
            "PHOTO_SELECTOR cannot be empty".to_string(),
        ));
    }

    if config.wait_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "WAIT_TIMEOUT_SECS must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates that a value is an absolute http(s) URL
fn validate_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", key, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            key, value
        )));
    }

    Ok(())
}
