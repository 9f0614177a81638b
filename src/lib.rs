//! Corpus-Harvester: a domain-specific text corpus collector
//!
//! This crate gathers plain text for one target language along two paths:
//! a depth- and budget-bounded recursive crawl seeded from a list of domains,
//! and a parallel pass over archived web snapshots (WET segments) that keeps
//! only the records a language classifier assigns to the target label.

pub mod archive;
pub mod classify;
pub mod config;
pub mod crawler;
pub mod frontier;
pub mod output;
pub mod url;

use thiserror::Error;

/// Main error type for Corpus-Harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Unexpected HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Classifier error: {0}")]
    Classify(#[from] classify::ClassifyError),

    #[error("Archive decode error: {0}")]
    Decode(#[from] archive::DecodeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid deny pattern: {0}")]
    InvalidPattern(String),

    #[error("Missing required section: [{0}]")]
    MissingSection(&'static str),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for Corpus-Harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

// Re-export commonly used types
pub use classify::{ClassificationPipeline, PipelineSummary};
pub use config::Config;
pub use frontier::{CrawlSummary, Frontier, VisitStatus};
pub use url::{extract_domain, normalize_url};
