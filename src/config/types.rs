use serde::Deserialize;

/// Main configuration structure for Corpus-Harvester
///
/// Every section is optional; missing sections fall back to their defaults.
/// The `[classifier]` section is only required by the archive pass.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub classifier: Option<ClassifierConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawl frontier configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum depth to crawl; seeds sit at depth 1
    #[serde(rename = "depth-limit", default = "default_depth_limit")]
    pub depth_limit: u32,

    /// Maximum number of pages the frontier will ever admit
    #[serde(rename = "page-budget", default = "default_page_budget")]
    pub page_budget: usize,

    /// Maximum number of fetches in flight at once
    #[serde(
        rename = "max-concurrent-fetches",
        default = "default_max_concurrent_fetches"
    )]
    pub max_concurrent_fetches: usize,

    /// CSV file whose first column holds the seed URLs
    #[serde(rename = "seeds-file", default = "default_seeds_file")]
    pub seeds_file: String,

    /// Regex patterns matched against a link's path and query
    #[serde(rename = "deny-patterns", default = "default_deny_patterns")]
    pub deny_patterns: Vec<String>,
}

/// Fetch executor configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Extra attempts after the first one fails
    #[serde(rename = "retry-count", default = "default_retry_count")]
    pub retry_count: u32,

    /// Whole-request timeout (seconds)
    #[serde(rename = "fetch-timeout", default = "default_fetch_timeout")]
    pub fetch_timeout: u64,

    /// TCP connect timeout (seconds)
    #[serde(rename = "connect-timeout", default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// Pause between attempts (milliseconds)
    #[serde(rename = "retry-delay-ms", default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name", default = "default_crawler_name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version", default = "default_crawler_version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url", default = "default_contact_url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email", default = "default_contact_email")]
    pub contact_email: String,
}

/// Archive classification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// Path to the language model file
    #[serde(rename = "model-path")]
    pub model_path: String,

    /// Label a record must be assigned to be kept (e.g. `__label__mn`)
    #[serde(rename = "target-label")]
    pub target_label: String,

    /// Minimum confidence for the target label
    #[serde(default = "default_threshold")]
    pub threshold: f32,

    /// Upper bound on the worker pool; the pool never exceeds the CPU count
    #[serde(rename = "worker-count", default = "default_worker_count")]
    pub worker_count: usize,

    /// Prefix joined with each segment locator to form its download URL
    #[serde(rename = "archive-base-url", default = "default_archive_base_url")]
    pub archive_base_url: String,

    /// File listing segment locators, one per line (may be gzip-compressed)
    #[serde(rename = "paths-file", default = "default_paths_file")]
    pub paths_file: String,

    /// Whole-download timeout for one segment in seconds
    #[serde(rename = "segment-timeout", default = "default_segment_timeout")]
    pub segment_timeout: u64,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Append-only file receiving crawled page text
    #[serde(rename = "text-path", default = "default_text_path")]
    pub text_path: String,

    /// CSV report of skipped and failed URLs, overwritten each run
    #[serde(rename = "skip-report-path", default = "default_skip_report_path")]
    pub skip_report_path: String,

    /// Directory receiving one file per accepted archive record
    #[serde(rename = "records-dir", default = "default_records_dir")]
    pub records_dir: String,

    /// Optional markdown summary written at the end of a run
    #[serde(rename = "summary-path", default)]
    pub summary_path: Option<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            depth_limit: default_depth_limit(),
            page_budget: default_page_budget(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            seeds_file: default_seeds_file(),
            deny_patterns: default_deny_patterns(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            retry_count: default_retry_count(),
            fetch_timeout: default_fetch_timeout(),
            connect_timeout: default_connect_timeout(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: default_crawler_name(),
            crawler_version: default_crawler_version(),
            contact_url: default_contact_url(),
            contact_email: default_contact_email(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            text_path: default_text_path(),
            skip_report_path: default_skip_report_path(),
            records_dir: default_records_dir(),
            summary_path: None,
        }
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    ///
    /// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

impl ClassifierConfig {
    /// Number of workers actually started: `min(available CPUs, worker_count)`
    pub fn effective_worker_count(&self) -> usize {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        cpus.min(self.worker_count).max(1)
    }
}

fn default_depth_limit() -> u32 {
    3
}

fn default_page_budget() -> usize {
    1000
}

fn default_max_concurrent_fetches() -> usize {
    16
}

fn default_seeds_file() -> String {
    "domain.csv".to_string()
}

pub(crate) fn default_deny_patterns() -> Vec<String> {
    vec![
        r"\?".to_string(),
        r"\.(pdf|docx|zip|jpg|png|gif)$".to_string(),
        r"/tag/".to_string(),
        r"/user/".to_string(),
    ]
}

fn default_retry_count() -> u32 {
    2
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_crawler_name() -> String {
    "corpus-harvester".to_string()
}

fn default_crawler_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_contact_url() -> String {
    "https://example.org/corpus-harvester".to_string()
}

fn default_contact_email() -> String {
    "harvester@example.org".to_string()
}

fn default_threshold() -> f32 {
    0.8
}

fn default_worker_count() -> usize {
    8
}

fn default_archive_base_url() -> String {
    crate::archive::DEFAULT_ARCHIVE_BASE_URL.to_string()
}

fn default_paths_file() -> String {
    "wet.paths".to_string()
}

fn default_segment_timeout() -> u64 {
    3600
}

fn default_text_path() -> String {
    "combined_text.txt".to_string()
}

fn default_skip_report_path() -> String {
    "skipped_urls.csv".to_string()
}

fn default_records_dir() -> String {
    "corpus_text".to_string()
}
