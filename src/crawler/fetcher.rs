//! HTTP fetcher implementation
//!
//! This module is the boundary between the crawl frontier and the network:
//! - Building HTTP clients with a proper user agent and bounded timeouts
//! - Retrying transient failures a fixed number of times
//! - Classifying terminal failures into a closed error taxonomy
//!
//! Whatever happens inside, `fetch` resolves to exactly one terminal
//! [`FetchOutcome`] per call.

use crate::config::{FetchConfig, UserAgentConfig};
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Terminal transport failure of a fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The request as a whole exceeded its timeout
    Timeout,

    /// The TCP connection could not be established in time
    ConnectionTimeout,

    /// The host name could not be resolved
    DnsFailure,

    /// The transport layer rejected the response status
    HttpStatus(u16),

    /// Anything else (connection refused, TLS failure, body decode, ...)
    Other(String),
}

impl FetchError {
    /// Human-readable reason recorded in the skip report
    pub fn reason(&self) -> String {
        match self {
            Self::Timeout => "Timeout".to_string(),
            Self::ConnectionTimeout => "TCP Timeout".to_string(),
            Self::DnsFailure => "DNS Failure".to_string(),
            Self::HttpStatus(code) => format!("HTTP Error ({})", code),
            Self::Other(message) => message.clone(),
        }
    }

    /// Returns true if another attempt might succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::ConnectionTimeout | Self::DnsFailure => true,
            Self::HttpStatus(code) => is_retryable_status(*code),
            Self::Other(_) => true,
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason())
    }
}

impl std::error::Error for FetchError {}

/// A response received over a working transport, whatever its status
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// HTTP status code
    pub status: u16,

    /// Final URL after redirects
    pub final_url: Url,

    /// Response body decoded as text
    pub body: String,
}

/// Terminal result of fetching one URL
pub type FetchOutcome = Result<FetchedPage, FetchError>;

/// Issues network requests on behalf of the crawl frontier
///
/// Implementations must resolve every call to exactly one terminal outcome,
/// must bound every attempt with a timeout, and perform any retries
/// internally.
#[async_trait]
pub trait FetchExecutor: Send + Sync {
    async fn fetch(&self, url: &Url) -> FetchOutcome;
}

/// Builds an HTTP client with proper configuration
///
/// Redirects are followed (up to 10 hops) so that the frontier only ever sees
/// final responses.
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    timeout: Duration,
    connect_timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(timeout)
        .connect_timeout(connect_timeout)
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetch executor backed by a reqwest client
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | HTTP 2xx/3xx/4xx (except 408, 429) | Return immediately |
/// | HTTP 408, 429, 5xx | Retry; the last response is returned |
/// | Timeout / connect timeout | Retry; then `Timeout` / `ConnectionTimeout` |
/// | DNS failure | Retry; then `DnsFailure` |
/// | Other transport error | Retry; then `Other` |
pub struct HttpFetcher {
    client: Client,
    retry_count: u32,
    retry_delay: Duration,
}

impl HttpFetcher {
    /// Creates a fetcher around an existing client
    pub fn new(client: Client, retry_count: u32, retry_delay: Duration) -> Self {
        Self {
            client,
            retry_count,
            retry_delay,
        }
    }

    /// Creates a fetcher from configuration
    pub fn from_config(
        fetch: &FetchConfig,
        user_agent: &UserAgentConfig,
    ) -> Result<Self, reqwest::Error> {
        let client = build_http_client(
            user_agent,
            Duration::from_secs(fetch.fetch_timeout),
            Duration::from_secs(fetch.connect_timeout),
        )?;
        Ok(Self::new(
            client,
            fetch.retry_count,
            Duration::from_millis(fetch.retry_delay_ms),
        ))
    }

    /// Total attempts made for one URL before giving up
    pub fn max_attempts(&self) -> u32 {
        self.retry_count + 1
    }

    async fn attempt(&self, url: &Url) -> FetchOutcome {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_error(&e))?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let body = response.text().await.map_err(|e| classify_error(&e))?;

        Ok(FetchedPage {
            status,
            final_url,
            body,
        })
    }
}

#[async_trait]
impl FetchExecutor for HttpFetcher {
    async fn fetch(&self, url: &Url) -> FetchOutcome {
        let attempts = self.max_attempts();
        let mut attempt = 1;

        loop {
            let outcome = self.attempt(url).await;

            let retry = match &outcome {
                Ok(page) => is_retryable_status(page.status),
                Err(e) => e.is_retryable(),
            };

            if !retry || attempt >= attempts {
                if attempt > 1 {
                    tracing::debug!("{} settled after {} attempts", url, attempt);
                }
                return outcome;
            }

            match &outcome {
                Ok(page) => tracing::debug!(
                    "Retrying {} (HTTP {}, attempt {}/{})",
                    url,
                    page.status,
                    attempt,
                    attempts
                ),
                Err(e) => tracing::debug!(
                    "Retrying {} ({}, attempt {}/{})",
                    url,
                    e,
                    attempt,
                    attempts
                ),
            }

            attempt += 1;
            if !self.retry_delay.is_zero() {
                tokio::time::sleep(self.retry_delay).await;
            }
        }
    }
}

/// Statuses worth another attempt
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500..=599)
}

/// Maps a reqwest error onto the fetch error taxonomy
pub fn classify_error(error: &reqwest::Error) -> FetchError {
    if error.is_timeout() {
        return if error.is_connect() {
            FetchError::ConnectionTimeout
        } else {
            FetchError::Timeout
        };
    }

    if error.is_connect() && is_dns_error(error) {
        return FetchError::DnsFailure;
    }

    if let Some(status) = error.status() {
        return FetchError::HttpStatus(status.as_u16());
    }

    if error.is_connect() {
        return FetchError::Other(format!("Connection failed: {}", root_cause(error)));
    }

    FetchError::Other(root_cause(error))
}

/// Walks the source chain looking for a resolver failure
fn is_dns_error(error: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(error);
    while let Some(err) = current {
        let message = err.to_string().to_lowercase();
        if message.contains("dns error")
            || message.contains("failed to lookup address")
            || message.contains("name or service not known")
            || message.contains("no such host")
        {
            return true;
        }
        current = err.source();
    }
    false
}

fn root_cause(error: &(dyn StdError + 'static)) -> String {
    let mut current: &(dyn StdError + 'static) = error;
    while let Some(source) = current.source() {
        current = source;
    }
    current.to_string()
}
