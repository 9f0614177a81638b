//! Crawler module for web page fetching and processing
//!
//! This module contains the crawl path of the harvester, including:
//! - HTTP fetching with timeouts, retries and error classification
//! - HTML parsing for page text and link extraction
//! - Seed file reading and domain list building
//! - Overall crawl coordination around the frontier

mod coordinator;
mod fetcher;
mod parser;
mod seeds;

pub use coordinator::{Coordinator, CrawlOutcome};
pub use fetcher::{
    build_http_client, classify_error, FetchError, FetchExecutor, FetchOutcome, FetchedPage,
    HttpFetcher,
};
pub use parser::{extract_text, parse_html, ParsedPage};
pub use seeds::{collect_domains, read_seed_file, write_domain_csv};

use crate::config::Config;
use crate::frontier::{Frontier, FrontierLimits};
use crate::output::{write_skip_report, AppendTextFile};
use crate::url::DenyPatterns;
use crate::Result;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Read the seeds from the configured seed file
/// 2. Build the frontier and the HTTP fetch executor
/// 3. Fetch pages, appending their text to the corpus file
/// 4. Write the skip report once the frontier has drained
///
/// Cancelling `cancel` stops new fetches; the skip report and the returned
/// summary are still produced.
pub async fn crawl(config: &Config, cancel: CancellationToken) -> Result<CrawlOutcome> {
    let seeds = read_seed_file(Path::new(&config.crawler.seeds_file))?;

    let deny = DenyPatterns::new(&config.crawler.deny_patterns)?;
    if deny.is_empty() {
        tracing::warn!("No deny patterns configured, every in-domain link is eligible");
    } else {
        tracing::debug!("Compiled {} deny patterns", deny.len());
    }
    let frontier = Arc::new(Frontier::new(
        FrontierLimits {
            depth_limit: config.crawler.depth_limit,
            page_budget: config.crawler.page_budget,
        },
        deny,
    ));

    let executor = Arc::new(HttpFetcher::from_config(&config.fetch, &config.user_agent)?);
    let sink = Arc::new(AppendTextFile::new(&config.output.text_path));

    let coordinator = Coordinator::new(
        frontier,
        executor,
        sink,
        config.crawler.max_concurrent_fetches,
    )
    .with_cancellation(cancel);

    let outcome = coordinator.run(&seeds).await;

    write_skip_report(
        Path::new(&config.output.skip_report_path),
        &outcome.report.skips,
    )?;

    Ok(outcome)
}
