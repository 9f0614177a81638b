//! URL handling module for Corpus-Harvester
//!
//! This module provides URL normalization (the ledger key), domain
//! extraction, allowed-domain matching and deny-pattern filtering.

mod deny;
mod domain;
mod matcher;
mod normalize;

// Re-export main functions
pub use deny::DenyPatterns;
pub use domain::{domain_of, extract_domain};
pub use matcher::matches_domain;
pub use normalize::normalize_url;
