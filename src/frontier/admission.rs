//! Link admission policy
//!
//! Admission is a pure function of the link, a view of the ledger, the
//! allowed-domain set, the deny patterns and the frontier limits. The
//! frontier evaluates it and inserts the admitted URL while holding its state
//! lock, so check-and-insert is one step.

use crate::frontier::record::VisitRecord;
use crate::url::{extract_domain, matches_domain, normalize_url, DenyPatterns};
use std::collections::{HashMap, HashSet};
use url::Url;

/// Depth and size bounds of a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontierLimits {
    /// Deepest level that may be fetched; seeds are level 1
    pub depth_limit: u32,

    /// Maximum number of URLs the ledger will ever hold
    pub page_budget: usize,
}

impl Default for FrontierLimits {
    fn default() -> Self {
        Self {
            depth_limit: 3,
            page_budget: 1000,
        }
    }
}

/// A link found on a fetched page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Absolute target URL as found on the page
    pub target: String,

    /// URL of the page the link was found on
    pub source: String,

    /// Depth the target would be fetched at
    pub depth: u32,
}

/// Why a link was not admitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Malformed,
    TooDeep,
    ForeignDomain(String),
    Denied(String),
    AlreadySeen,
    BudgetExhausted,
}

/// Outcome of evaluating one link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Admit the link under this normalized URL
    Admit(Url),
    Reject(Rejection),
}

/// Decides whether a discovered link becomes a new fetch target
///
/// Checks, in order: depth bound, URL validity, allowed domain, deny
/// patterns, ledger membership, and the page budget.
pub fn evaluate(
    link: &Link,
    ledger: &HashMap<String, VisitRecord>,
    allowed_domains: &HashSet<String>,
    deny: &DenyPatterns,
    limits: &FrontierLimits,
) -> Admission {
    if link.depth > limits.depth_limit {
        return Admission::Reject(Rejection::TooDeep);
    }

    let Ok(url) = normalize_url(&link.target) else {
        return Admission::Reject(Rejection::Malformed);
    };

    let Some(domain) = extract_domain(&url) else {
        return Admission::Reject(Rejection::Malformed);
    };

    if !allowed_domains
        .iter()
        .any(|allowed| matches_domain(allowed, &domain))
    {
        return Admission::Reject(Rejection::ForeignDomain(domain));
    }

    if let Some(pattern) = deny.matching(&url) {
        return Admission::Reject(Rejection::Denied(pattern.to_string()));
    }

    if ledger.contains_key(url.as_str()) {
        return Admission::Reject(Rejection::AlreadySeen);
    }

    if ledger.len() >= limits.page_budget {
        return Admission::Reject(Rejection::BudgetExhausted);
    }

    Admission::Admit(url)
}
