/// Visit state definitions for the crawl ledger
///
/// Every discovered URL gets one `VisitRecord`; its status moves from
/// `Pending` to exactly one terminal status and never changes again.
use crate::crawler::FetchError;
use std::fmt;

/// Represents the current state of a URL in the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisitStatus {
    /// Admitted and waiting for its fetch result
    Pending,

    /// Fetched with HTTP 200 and text was extracted
    Fetched,

    /// Fetched over a working transport but not usable (non-200, no text)
    Skipped,

    /// The fetch failed terminally (timeout, DNS, connection, ...)
    Failed,
}

impl VisitStatus {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Converts the status to its report string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetched => "fetched",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from its report string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "fetched" => Some(Self::Fetched),
            "skipped" => Some(Self::Skipped),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for VisitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a URL ended up skipped or failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Terminal transport failure reported by the fetch executor
    Fetch(FetchError),

    /// The response arrived but its status was not 200
    HttpStatus(u16),

    /// The page had no usable text
    EmptyContent,

    /// The crawl stopped before the URL was fetched
    NotFetched,
}

impl SkipReason {
    /// Status recorded in the ledger for this reason
    pub fn status(&self) -> VisitStatus {
        match self {
            Self::Fetch(_) => VisitStatus::Failed,
            Self::HttpStatus(_) | Self::EmptyContent | Self::NotFetched => VisitStatus::Skipped,
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch(e) => write!(f, "{}", e.reason()),
            Self::HttpStatus(code) => write!(f, "HTTP {}", code),
            Self::EmptyContent => write!(f, "No text content"),
            Self::NotFetched => write!(f, "Not fetched (crawl stopped)"),
        }
    }
}

/// One ledger entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitRecord {
    /// Normalized URL (the ledger key)
    pub url: String,

    /// Distance from the seed; seeds sit at depth 1
    pub depth: u32,

    pub status: VisitStatus,

    /// Human-readable reason for skipped and failed entries
    pub reason: Option<String>,
}

impl VisitRecord {
    pub fn pending(url: String, depth: u32) -> Self {
        Self {
            url,
            depth,
            status: VisitStatus::Pending,
            reason: None,
        }
    }
}

/// A row of the skip report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipEntry {
    pub url: String,
    pub reason: String,
}
