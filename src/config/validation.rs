use crate::config::types::{
    ClassifierConfig, Config, CrawlerConfig, FetchConfig, OutputConfig, UserAgentConfig,
};
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_fetch_config(&config.fetch)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    if let Some(classifier) = &config.classifier {
        validate_classifier_config(classifier)?;
    }
    Ok(())
}

/// Validates crawl frontier configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.depth_limit < 1 {
        return Err(ConfigError::Validation(
            "depth_limit must be >= 1 (seeds sit at depth 1)".to_string(),
        ));
    }

    if config.page_budget < 1 {
        return Err(ConfigError::Validation(
            "page_budget must be >= 1".to_string(),
        ));
    }

    if config.max_concurrent_fetches < 1 || config.max_concurrent_fetches > 256 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_fetches must be between 1 and 256, got {}",
            config.max_concurrent_fetches
        )));
    }

    if config.seeds_file.is_empty() {
        return Err(ConfigError::Validation(
            "seeds_file cannot be empty".to_string(),
        ));
    }

    for pattern in &config.deny_patterns {
        Regex::new(pattern)
            .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", pattern, e)))?;
    }

    Ok(())
}

/// Validates fetch executor configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.fetch_timeout < 1 {
        return Err(ConfigError::Validation(
            "fetch_timeout must be >= 1 second".to_string(),
        ));
    }

    if config.connect_timeout < 1 {
        return Err(ConfigError::Validation(
            "connect_timeout must be >= 1 second".to_string(),
        ));
    }

    if config.retry_count > 10 {
        return Err(ConfigError::Validation(format!(
            "retry_count must be <= 10, got {}",
            config.retry_count
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates archive classification configuration
fn validate_classifier_config(config: &ClassifierConfig) -> Result<(), ConfigError> {
    if config.model_path.is_empty() {
        return Err(ConfigError::Validation(
            "model_path cannot be empty".to_string(),
        ));
    }

    if config.target_label.trim().is_empty() {
        return Err(ConfigError::Validation(
            "target_label cannot be empty".to_string(),
        ));
    }

    if !(0.0..=1.0).contains(&config.threshold) {
        return Err(ConfigError::Validation(format!(
            "threshold must be between 0 and 1, got {}",
            config.threshold
        )));
    }

    if config.worker_count < 1 {
        return Err(ConfigError::Validation(
            "worker_count must be >= 1".to_string(),
        ));
    }

    if config.segment_timeout < 1 {
        return Err(ConfigError::Validation(
            "segment_timeout must be >= 1 second".to_string(),
        ));
    }

    Url::parse(&config.archive_base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid archive_base_url: {}", e)))?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.text_path.is_empty() {
        return Err(ConfigError::Validation(
            "text_path cannot be empty".to_string(),
        ));
    }

    if config.skip_report_path.is_empty() {
        return Err(ConfigError::Validation(
            "skip_report_path cannot be empty".to_string(),
        ));
    }

    if config.records_dir.is_empty() {
        return Err(ConfigError::Validation(
            "records_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') || !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    Ok(())
}
