use crate::config::types::{ClassifierConfig, Config};
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::str::FromStr;

/// Prefix shared by every environment override
const ENV_PREFIX: &str = "HARVEST_";

/// Loads and parses a configuration file from the given path
///
/// Environment overrides (`HARVEST_DEPTH_LIMIT`, `HARVEST_PAGE_BUDGET`, ...)
/// are applied after parsing and before validation.
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

    let mut config: Config = toml::from_str(&content)?;

    apply_env_overrides(&mut config)?;

    validate(&config)?;

    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so that output produced by different runs can be traced
/// back to the configuration that produced it.
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

/// Applies `HARVEST_*` variables from the process environment
pub fn apply_env_overrides(config: &mut Config) -> Result<(), ConfigError> {
    apply_overrides(config, |key| std::env::var(key).ok())
}

/// Applies overrides from an arbitrary key lookup
///
/// Keys are the option names without the `HARVEST_` prefix: `DEPTH_LIMIT`,
/// `PAGE_BUDGET`, `RETRY_COUNT`, `FETCH_TIMEOUT`, `CLASSIFY_THRESHOLD`,
/// `TARGET_LABEL` and `WORKER_COUNT`. Classifier overrides only take effect
/// when a `[classifier]` section exists.
pub fn apply_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

    if let Some(v) = get("DEPTH_LIMIT") {
        config.crawler.depth_limit = parse_override("DEPTH_LIMIT", &v)?;
    }
    if let Some(v) = get("PAGE_BUDGET") {
        config.crawler.page_budget = parse_override("PAGE_BUDGET", &v)?;
    }
    if let Some(v) = get("RETRY_COUNT") {
        config.fetch.retry_count = parse_override("RETRY_COUNT", &v)?;
    }
    if let Some(v) = get("FETCH_TIMEOUT") {
        config.fetch.fetch_timeout = parse_override("FETCH_TIMEOUT", &v)?;
    }

    if let Some(classifier) = config.classifier.as_mut() {
        apply_classifier_overrides(classifier, &get)?;
    }

    Ok(())
}

fn apply_classifier_overrides<G>(classifier: &mut ClassifierConfig, get: &G) -> Result<(), ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    if let Some(v) = get("CLASSIFY_THRESHOLD") {
        classifier.threshold = parse_override("CLASSIFY_THRESHOLD", &v)?;
    }
    if let Some(v) = get("TARGET_LABEL") {
        classifier.target_label = v.trim().to_string();
    }
    if let Some(v) = get("WORKER_COUNT") {
        classifier.worker_count = parse_override("WORKER_COUNT", &v)?;
    }
    Ok(())
}

fn parse_override<T: FromStr>(name: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse::<T>().map_err(|_| {
        ConfigError::Validation(format!(
            "{}{} has an invalid value: '{}'",
            ENV_PREFIX, name, raw
        ))
    })
}
