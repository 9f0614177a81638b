//! Crawler coordinator - main crawl orchestration logic
//!
//! The coordinator is the scheduling substrate around the [`Frontier`]:
//! - Keeps a queue of admitted fetch requests
//! - Runs up to `max_in_flight` fetches concurrently
//! - Hands every completion back to the frontier and writes page text
//! - Stops issuing fetches on cancellation or when the frontier closes
//! - Drains the frontier once in-flight fetches have finished

use crate::crawler::{FetchExecutor, FetchOutcome};
use crate::frontier::{CrawlReport, FetchRequest, Frontier};
use crate::output::TextSink;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Number of completions between progress log lines
const PROGRESS_INTERVAL: usize = 50;

/// Result of a finished crawl
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub report: CrawlReport,

    /// True if the crawl was cancelled before running out of work
    pub interrupted: bool,

    /// Pages whose text could not be written to the sink
    pub write_failures: usize,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    frontier: Arc<Frontier>,
    executor: Arc<dyn FetchExecutor>,
    sink: Arc<dyn TextSink>,
    max_in_flight: usize,
    cancel: CancellationToken,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `frontier` - The frontier owning the ledger
    /// * `executor` - Performs the actual fetches
    /// * `sink` - Receives the text of fetched pages
    /// * `max_in_flight` - Upper bound on concurrent fetches (at least 1)
    pub fn new(
        frontier: Arc<Frontier>,
        executor: Arc<dyn FetchExecutor>,
        sink: Arc<dyn TextSink>,
        max_in_flight: usize,
    ) -> Self {
        Self {
            frontier,
            executor,
            sink,
            max_in_flight: max_in_flight.max(1),
            cancel: CancellationToken::new(),
        }
    }

    /// Uses an externally owned token to stop the crawl
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn spawn_fetch(
        &self,
        in_flight: &mut JoinSet<(FetchRequest, FetchOutcome)>,
        request: FetchRequest,
    ) {
        let executor = Arc::clone(&self.executor);
        tracing::debug!("Fetching {} (depth {})", request.url, request.depth);
        in_flight.spawn(async move {
            let outcome = executor.fetch(&request.url).await;
            (request, outcome)
        });
    }

    /// Runs the crawl from the given seeds until the frontier is exhausted,
    /// closed by the page budget, or the crawl is cancelled
    pub async fn run<S: AsRef<str>>(&self, seeds: &[S]) -> CrawlOutcome {
        let start_time = Instant::now();
        let mut queue: VecDeque<FetchRequest> = self.frontier.submit_seeds(seeds).into();
        let mut in_flight = JoinSet::new();
        let mut completed = 0usize;
        let mut write_failures = 0usize;
        let mut interrupted = false;

        tracing::info!(
            "Starting crawl with {} seeds, up to {} concurrent fetches",
            queue.len(),
            self.max_in_flight
        );

        loop {
            if !interrupted && self.cancel.is_cancelled() {
                tracing::info!(
                    "Crawl cancelled, waiting for {} in-flight fetches",
                    in_flight.len()
                );
                interrupted = true;
                self.frontier.close();
            }

            let stopping = interrupted || self.frontier.is_closed();
            if stopping && !queue.is_empty() {
                tracing::debug!("Dropping {} queued requests", queue.len());
                queue.clear();
            }

            while in_flight.len() < self.max_in_flight {
                let Some(request) = queue.pop_front() else {
                    break;
                };
                self.spawn_fetch(&mut in_flight, request);
            }

            if in_flight.is_empty() {
                break;
            }

            let joined = tokio::select! {
                biased;
                _ = self.cancel.cancelled(), if !interrupted => {
                    tracing::info!(
                        "Crawl cancelled, waiting for {} in-flight fetches",
                        in_flight.len()
                    );
                    interrupted = true;
                    self.frontier.close();
                    continue;
                }
                joined = in_flight.join_next() => joined,
            };

            let Some(joined) = joined else {
                continue;
            };

            let (request, outcome) = match joined {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::error!("Fetch task failed: {}", e);
                    continue;
                }
            };

            let update = self.frontier.on_fetch_result(&request.url, outcome);

            if let Some(page) = update.text {
                if let Err(e) = self.sink.append_page(&page.url, &page.text) {
                    tracing::error!("Failed to write text for {}: {}", page.url, e);
                    write_failures += 1;
                }
            }
            queue.extend(update.admitted);

            completed += 1;
            if completed % PROGRESS_INTERVAL == 0 {
                let rate = completed as f64 / start_time.elapsed().as_secs_f64().max(0.001);
                tracing::info!(
                    "Progress: {} fetches completed, {} queued, {} in flight, {:.2} pages/sec",
                    completed,
                    queue.len(),
                    in_flight.len(),
                    rate
                );
            }
        }

        let report = self.frontier.drain();
        tracing::info!(
            "Crawl finished in {:.1}s: {} visited, {} fetched, {} skipped, {} failed",
            start_time.elapsed().as_secs_f64(),
            report.summary.visited,
            report.summary.fetched,
            report.summary.skipped,
            report.summary.failed
        );

        CrawlOutcome {
            report,
            interrupted,
            write_failures,
        }
    }
}
