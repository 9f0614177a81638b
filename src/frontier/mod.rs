//! Crawl frontier and visit ledger
//!
//! The frontier owns every piece of mutable crawl state: the ledger of
//! discovered URLs, the allowed-domain set derived from the seeds, the skip
//! entries and the outcome counters. All of it sits behind a single lock, so
//! a result handler that checks "is this URL new?" and then records it can
//! never race another handler discovering the same link.
//!
//! Fetching is not done here. The frontier hands out [`FetchRequest`]s and
//! consumes exactly one [`FetchOutcome`] per request.

mod admission;
mod record;

pub use admission::{evaluate, Admission, FrontierLimits, Link, Rejection};
pub use record::{SkipEntry, SkipReason, VisitRecord, VisitStatus};

use crate::crawler::{parse_html, FetchOutcome};
use crate::url::{extract_domain, normalize_url, DenyPatterns};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use url::Url;

/// A URL the coordinator should fetch next
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: Url,
    pub depth: u32,
}

/// Extracted text ready to be written to the text sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub url: String,
    pub text: String,
}

/// What happened when a fetch result was recorded
#[derive(Debug, Clone, Default)]
pub struct FrontierUpdate {
    /// Terminal status recorded, or `None` if the result was ignored
    pub status: Option<VisitStatus>,

    /// Page text to emit, present only for fetched pages
    pub text: Option<PageText>,

    /// Newly admitted children
    pub admitted: Vec<FetchRequest>,
}

/// Aggregate outcome counts of a crawl
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// URLs ever admitted to the ledger, redirect targets included
    pub visited: usize,
    pub fetched: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Final state handed back by [`Frontier::drain`]
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    pub summary: CrawlSummary,
    pub skips: Vec<SkipEntry>,
}

#[derive(Debug, Default)]
struct FrontierState {
    ledger: HashMap<String, VisitRecord>,
    allowed_domains: HashSet<String>,
    skips: Vec<SkipEntry>,
    fetched: usize,
    skipped: usize,
    failed: usize,
    /// Responses received with HTTP 200, counted against the page budget
    successful: usize,
    closed: bool,
}

impl FrontierState {
    fn settle(&mut self, url: &str, reason: SkipReason) -> VisitStatus {
        let status = reason.status();
        let reason = reason.to_string();

        if let Some(record) = self.ledger.get_mut(url) {
            record.status = status;
            record.reason = Some(reason.clone());
        }

        match status {
            VisitStatus::Failed => self.failed += 1,
            _ => self.skipped += 1,
        }

        self.skips.push(SkipEntry {
            url: url.to_string(),
            reason,
        });
        status
    }

    /// Ledgers the URL a request was redirected to under the requested
    /// URL's outcome, so the target is never admitted and fetched again
    fn record_redirect(&mut self, key: &str, final_url: &Url) {
        let Ok(target) = normalize_url(final_url.as_str()) else {
            return;
        };
        let target = target.to_string();
        if target == key || self.ledger.contains_key(&target) {
            return;
        }

        let Some(record) = self.ledger.get(key) else {
            return;
        };
        let alias = VisitRecord {
            url: target.clone(),
            depth: record.depth,
            status: record.status,
            reason: record.reason.clone(),
        };

        tracing::debug!("{} redirected to {}", key, target);
        self.ledger.insert(target, alias);
    }

    fn summary(&self) -> CrawlSummary {
        CrawlSummary {
            visited: self.ledger.len(),
            fetched: self.fetched,
            skipped: self.skipped,
            failed: self.failed,
        }
    }
}

/// Thread-safe crawl frontier
pub struct Frontier {
    limits: FrontierLimits,
    deny: DenyPatterns,
    state: Mutex<FrontierState>,
}

impl Frontier {
    pub fn new(limits: FrontierLimits, deny: DenyPatterns) -> Self {
        Self {
            limits,
            deny,
            state: Mutex::new(FrontierState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, FrontierState> {
        // A panicking holder cannot leave the ledger half-updated
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records the seed URLs at depth 1 and returns those to fetch
    ///
    /// The domains of the seeds form the allowed-domain set for the whole
    /// crawl. Seeds that fail to normalize are logged and ignored. Seeds
    /// already in the ledger and seeds beyond the page budget are not
    /// returned again.
    pub fn submit_seeds<S: AsRef<str>>(&self, seeds: &[S]) -> Vec<FetchRequest> {
        let mut state = self.state();
        let mut requests = Vec::new();

        for seed in seeds {
            let seed = seed.as_ref();
            let url = match normalize_url(seed) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!("Ignoring seed {:?}: {}", seed, e);
                    continue;
                }
            };

            let Some(domain) = extract_domain(&url) else {
                tracing::warn!("Ignoring seed {:?}: no host", seed);
                continue;
            };
            state.allowed_domains.insert(domain);

            if state.closed
                || state.ledger.contains_key(url.as_str())
                || state.ledger.len() >= self.limits.page_budget
            {
                continue;
            }

            state
                .ledger
                .insert(url.to_string(), VisitRecord::pending(url.to_string(), 1));
            requests.push(FetchRequest { url, depth: 1 });
        }

        tracing::info!(
            "Seeded frontier with {} URLs across {} allowed domains",
            requests.len(),
            state.allowed_domains.len()
        );
        requests
    }

    /// Records the terminal outcome of a fetch and admits discovered links
    ///
    /// HTML is parsed before the lock is taken. Results for URLs that are not
    /// pending in the ledger are ignored. Once the number of successful
    /// fetches reaches the page budget the frontier closes and no further
    /// links are admitted.
    pub fn on_fetch_result(&self, url: &Url, outcome: FetchOutcome) -> FrontierUpdate {
        let key = url.as_str();

        let parsed = match &outcome {
            Ok(page) if page.status == 200 => Some(parse_html(&page.body, &page.final_url)),
            _ => None,
        };
        let final_url = outcome.as_ref().ok().map(|page| page.final_url.clone());

        let mut state = self.state();

        let depth = match state.ledger.get(key) {
            Some(record) if record.status == VisitStatus::Pending => record.depth,
            Some(record) => {
                tracing::debug!("Ignoring duplicate result for {} ({})", key, record.status);
                return FrontierUpdate::default();
            }
            None => {
                tracing::warn!("Ignoring result for unknown URL {}", key);
                return FrontierUpdate::default();
            }
        };

        let mut update = FrontierUpdate::default();

        let parsed = match (outcome, parsed) {
            (Err(e), _) => {
                tracing::warn!("Failed {}: {}", key, e);
                update.status = Some(state.settle(key, SkipReason::Fetch(e)));
                return update;
            }
            (Ok(page), None) => {
                tracing::warn!("Skipping {}: HTTP {}", key, page.status);
                update.status = Some(state.settle(key, SkipReason::HttpStatus(page.status)));
                state.record_redirect(key, &page.final_url);
                return update;
            }
            (Ok(_), Some(parsed)) => parsed,
        };

        state.successful += 1;

        if parsed.text.is_empty() {
            tracing::warn!("No text content at {}", key);
            update.status = Some(state.settle(key, SkipReason::EmptyContent));
        } else {
            if let Some(record) = state.ledger.get_mut(key) {
                record.status = VisitStatus::Fetched;
            }
            state.fetched += 1;
            update.status = Some(VisitStatus::Fetched);
            update.text = Some(PageText {
                url: key.to_string(),
                text: parsed.text,
            });
        }

        if let Some(final_url) = &final_url {
            state.record_redirect(key, final_url);
        }

        // Only fetched pages expand the crawl
        let child_depth = depth + 1;
        if update.text.is_some() && !state.closed && child_depth <= self.limits.depth_limit {
            let state = &mut *state;
            for target in parsed.links {
                let link = Link {
                    target,
                    source: key.to_string(),
                    depth: child_depth,
                };

                match evaluate(
                    &link,
                    &state.ledger,
                    &state.allowed_domains,
                    &self.deny,
                    &self.limits,
                ) {
                    Admission::Admit(child) => {
                        state.ledger.insert(
                            child.to_string(),
                            VisitRecord::pending(child.to_string(), child_depth),
                        );
                        update.admitted.push(FetchRequest {
                            url: child,
                            depth: child_depth,
                        });
                    }
                    Admission::Reject(Rejection::BudgetExhausted) => break,
                    Admission::Reject(rejection) => {
                        tracing::trace!("Not following {}: {:?}", link.target, rejection);
                    }
                }
            }
        }

        if !state.closed && state.successful >= self.limits.page_budget {
            tracing::info!(
                "Page budget of {} reached, closing frontier",
                self.limits.page_budget
            );
            state.closed = true;
        }

        update
    }

    /// Stops admitting new URLs
    pub fn close(&self) {
        self.state().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    /// Returns a copy of the ledger entry for a normalized URL
    pub fn record(&self, url: &str) -> Option<VisitRecord> {
        self.state().ledger.get(url).cloned()
    }

    pub fn summary(&self) -> CrawlSummary {
        self.state().summary()
    }

    /// Closes the frontier and returns the final report
    ///
    /// URLs that never received a result are recorded as skipped with the
    /// "not fetched" reason. Skip entries are handed out once; a second
    /// drain returns the same summary with no entries.
    pub fn drain(&self) -> CrawlReport {
        let mut state = self.state();
        state.closed = true;

        let mut unfinished: Vec<String> = state
            .ledger
            .values()
            .filter(|record| record.status == VisitStatus::Pending)
            .map(|record| record.url.clone())
            .collect();
        unfinished.sort();

        if !unfinished.is_empty() {
            tracing::info!("{} URLs were never fetched", unfinished.len());
        }
        for url in unfinished {
            state.settle(&url, SkipReason::NotFetched);
        }

        CrawlReport {
            summary: state.summary(),
            skips: std::mem::take(&mut state.skips),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CrawlerConfig;
    use crate::crawler::{FetchError, FetchedPage};

    fn frontier(depth_limit: u32, page_budget: usize) -> Frontier {
        let deny = DenyPatterns::new(&CrawlerConfig::default().deny_patterns).unwrap();
        Frontier::new(
            FrontierLimits {
                depth_limit,
                page_budget,
            },
            deny,
        )
    }

    fn page(url: &str, body: &str) -> FetchOutcome {
        Ok(FetchedPage {
            status: 200,
            final_url: Url::parse(url).unwrap(),
            body: body.to_string(),
        })
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_seeds_recorded_at_depth_one() {
        let f = frontier(3, 10);
        let requests = f.submit_seeds(&["http://a.mn/", "http://b.mn"]);

        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.depth == 1));
        assert_eq!(f.record("http://b.mn/").unwrap().status, VisitStatus::Pending);
    }

    #[test]
    fn test_resubmitted_seed_is_noop() {
        let f = frontier(3, 10);
        assert_eq!(f.submit_seeds(&["http://a.mn/"]).len(), 1);
        assert!(f.submit_seeds(&["http://A.mn/#x"]).is_empty());
        assert_eq!(f.summary().visited, 1);
    }

    #[test]
    fn test_invalid_seed_ignored() {
        let f = frontier(3, 10);
        let requests = f.submit_seeds(&["not a url", "http://a.mn/"]);
        assert_eq!(requests.len(), 1);
    }

    #[test]
    fn test_depth_limit_one_fetches_only_seed() {
        let f = frontier(1, 10);
        f.submit_seeds(&["http://a.mn/"]);

        let update = f.on_fetch_result(
            &url("http://a.mn/"),
            page(
                "http://a.mn/",
                r#"<body><p>Сайн уу</p><a href="/x">x link</a></body>"#,
            ),
        );

        assert_eq!(update.status, Some(VisitStatus::Fetched));
        assert!(update.admitted.is_empty());
        assert_eq!(update.text.unwrap().text, "Сайн уу x link");

        let report = f.drain();
        assert_eq!(report.summary.visited, 1);
        assert_eq!(report.summary.fetched, 1);
        assert!(report.skips.is_empty());
    }

    #[test]
    fn test_children_filtered() {
        let f = frontier(3, 100);
        f.submit_seeds(&["http://a.mn/"]);

        let body = r#"<body><p>text here</p>
            <a href="/news">n</a>
            <a href="http://sub.a.mn/page">s</a>
            <a href="http://b.mn/">foreign</a>
            <a href="/file.pdf">pdf</a>
            <a href="/search?q=1">query</a>
            <a href="/tag/x">tag</a>
            <a href="/news#again">dup</a>
            <a href="/">self</a>
            </body>"#;
        let update = f.on_fetch_result(&url("http://a.mn/"), page("http://a.mn/", body));

        let admitted: Vec<String> = update.admitted.iter().map(|r| r.url.to_string()).collect();
        assert_eq!(
            admitted,
            vec!["http://a.mn/news".to_string(), "http://sub.a.mn/page".to_string()]
        );
        assert!(update.admitted.iter().all(|r| r.depth == 2));
    }

    #[test]
    fn test_redirect_target_is_not_fetched_again() {
        let f = frontier(3, 10);
        f.submit_seeds(&["http://a.mn/"]);

        let redirected = Ok(FetchedPage {
            status: 200,
            final_url: url("http://a.mn/home"),
            body: r#"<p>home page</p><a href="/home">home</a><a href="/news">news</a>"#
                .to_string(),
        });
        let update = f.on_fetch_result(&url("http://a.mn/"), redirected);

        let admitted: Vec<&str> = update.admitted.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(admitted, vec!["http://a.mn/news"]);

        let alias = f.record("http://a.mn/home").unwrap();
        assert_eq!(alias.status, VisitStatus::Fetched);
        assert_eq!(alias.depth, 1);

        let summary = f.summary();
        assert_eq!(summary.fetched, 1);
        assert_eq!(summary.visited, 3);
    }

    #[test]
    fn test_redirect_to_error_page_is_ledgered() {
        let f = frontier(3, 10);
        f.submit_seeds(&["http://a.mn/old"]);

        let gone = Ok(FetchedPage {
            status: 404,
            final_url: url("http://a.mn/missing"),
            body: String::new(),
        });
        f.on_fetch_result(&url("http://a.mn/old"), gone);

        let alias = f.record("http://a.mn/missing").unwrap();
        assert_eq!(alias.status, VisitStatus::Skipped);
        assert_eq!(alias.reason.as_deref(), Some("HTTP 404"));

        let report = f.drain();
        assert_eq!(report.skips.len(), 1);
    }

    #[test]
    fn test_non_200_is_skipped() {
        let f = frontier(3, 10);
        f.submit_seeds(&["http://a.mn/"]);

        let outcome = Ok(FetchedPage {
            status: 404,
            final_url: url("http://a.mn/"),
            body: String::new(),
        });
        let update = f.on_fetch_result(&url("http://a.mn/"), outcome);
        assert_eq!(update.status, Some(VisitStatus::Skipped));

        let report = f.drain();
        assert_eq!(report.summary.skipped, 1);
        assert_eq!(report.skips[0].reason, "HTTP 404");
    }

    #[test]
    fn test_empty_text_is_skipped_without_children() {
        let f = frontier(3, 10);
        f.submit_seeds(&["http://a.mn/"]);

        let update = f.on_fetch_result(
            &url("http://a.mn/"),
            page("http://a.mn/", r#"<body><a href="/next"></a></body>"#),
        );
        assert_eq!(update.status, Some(VisitStatus::Skipped));
        assert!(update.text.is_none());
        assert!(update.admitted.is_empty());

        let report = f.drain();
        assert_eq!(report.skips[0].reason, "No text content");
    }

    #[test]
    fn test_transport_failure_is_failed() {
        let f = frontier(3, 10);
        f.submit_seeds(&["http://a.mn/"]);

        let update = f.on_fetch_result(&url("http://a.mn/"), Err(FetchError::DnsFailure));
        assert_eq!(update.status, Some(VisitStatus::Failed));

        let record = f.record("http://a.mn/").unwrap();
        assert_eq!(record.reason.as_deref(), Some("DNS Failure"));

        let report = f.drain();
        assert_eq!(report.summary.failed, 1);
    }

    #[test]
    fn test_duplicate_result_ignored() {
        let f = frontier(3, 10);
        f.submit_seeds(&["http://a.mn/"]);

        f.on_fetch_result(&url("http://a.mn/"), page("http://a.mn/", "<p>ok ok</p>"));
        let second = f.on_fetch_result(&url("http://a.mn/"), Err(FetchError::Timeout));

        assert!(second.status.is_none());
        assert_eq!(f.record("http://a.mn/").unwrap().status, VisitStatus::Fetched);
    }

    #[test]
    fn test_budget_caps_ledger_and_closes() {
        let f = frontier(3, 2);
        f.submit_seeds(&["http://a.mn/"]);

        let body = r#"<body><p>text</p><a href="/1">1</a><a href="/2">2</a><a href="/3">3</a></body>"#;
        let update = f.on_fetch_result(&url("http://a.mn/"), page("http://a.mn/", body));
        assert_eq!(update.admitted.len(), 1);
        assert!(!f.is_closed());

        f.on_fetch_result(&url("http://a.mn/1"), page("http://a.mn/1", "<p>one</p>"));
        assert!(f.is_closed());
        assert_eq!(f.summary().visited, 2);
    }

    #[test]
    fn test_drain_marks_pending_not_fetched() {
        let f = frontier(3, 10);
        f.submit_seeds(&["http://a.mn/", "http://b.mn/"]);
        f.on_fetch_result(&url("http://a.mn/"), page("http://a.mn/", "<p>text</p>"));

        let report = f.drain();
        assert_eq!(report.summary.visited, 2);
        assert_eq!(report.summary.fetched, 1);
        assert_eq!(report.summary.skipped, 1);
        assert_eq!(report.skips.len(), 1);
        assert_eq!(report.skips[0].url, "http://b.mn/");
        assert_eq!(report.skips[0].reason, "Not fetched (crawl stopped)");

        let again = f.drain();
        assert_eq!(again.summary, report.summary);
        assert!(again.skips.is_empty());
    }

    #[test]
    fn test_concurrent_discovery_admits_once() {
        let f = frontier(3, 100);
        let seeds: Vec<String> = (0..8).map(|i| format!("http://a.mn/p{}", i)).collect();
        f.submit_seeds(&seeds);

        let body = r#"<body><p>shared</p><a href="/shared">s</a></body>"#;
        let admitted: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = seeds
                .iter()
                .map(|seed| {
                    let f = &f;
                    scope.spawn(move || {
                        f.on_fetch_result(&url(seed), page(seed, body))
                            .admitted
                            .len()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        assert_eq!(admitted, 1);
        assert_eq!(f.summary().visited, 9);
    }
}
