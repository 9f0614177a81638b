//! Configuration module for Corpus-Harvester
//!
//! This module handles loading, parsing, overriding and validating TOML
//! configuration files.
//!
//! # Example
//!
//! ```no_run
//! use corpus_harvester::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Crawler will stop at depth: {}", config.crawler.depth_limit);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ClassifierConfig, Config, CrawlerConfig, FetchConfig, OutputConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{
    apply_env_overrides, apply_overrides, compute_config_hash, load_config, load_config_with_hash,
};
pub use validation::validate;
