//! Output module for corpus text, skip reports and run summaries
//!
//! This module handles:
//! - Appending crawled page text to a single corpus file
//! - Writing accepted archive records one file per record
//! - Writing the skip report CSV at the end of a crawl
//! - Printing and rendering (markdown) run summaries

mod markdown;
mod sink;
mod skip_report;
pub mod stats;

pub use markdown::{format_markdown_summary, write_markdown_summary, RunInfo, RunKind};
pub use sink::{AppendTextFile, RecordDir, RecordSink, TextSink};
pub use skip_report::write_skip_report;
pub use stats::{print_crawl_summary, print_pipeline_summary};

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
