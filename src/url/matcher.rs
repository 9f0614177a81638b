/// Checks if a host belongs to an allowed domain
///
/// A host matches when it equals the domain or is any subdomain of it, so an
/// allowed domain of `a.mn` admits `a.mn`, `news.a.mn` and `m.news.a.mn`
/// but not `aa.mn`. Both arguments are expected in lowercase.
///
/// # Examples
///
/// ```
/// use corpus_harvester::url::matches_domain;
///
/// assert!(matches_domain("a.mn", "a.mn"));
/// assert!(matches_domain("a.mn", "news.a.mn"));
/// assert!(!matches_domain("a.mn", "aa.mn"));
/// assert!(!matches_domain("news.a.mn", "a.mn"));
/// ```
pub fn matches_domain(allowed: &str, host: &str) -> bool {
    if allowed.is_empty() {
        return false;
    }
    host == allowed
        || (host.len() > allowed.len()
            && host.ends_with(allowed)
            && host.as_bytes()[host.len() - allowed.len() - 1] == b'.')
}
