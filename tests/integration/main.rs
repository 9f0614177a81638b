//! Integration tests for Corpus-Harvester
//!
//! Both harvest paths are exercised end-to-end against wiremock servers and
//! temporary directories.

mod crawl_tests;
mod pipeline_tests;
