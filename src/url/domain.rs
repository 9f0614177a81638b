use url::Url;

/// Extracts the domain from a URL
///
/// Returns the lowercase host without any port. URLs without a host yield
/// `None`.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use corpus_harvester::url::extract_domain;
///
/// let url = Url::parse("https://News.Example.MN:8080/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("news.example.mn".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Extracts the domain from a raw URL string
///
/// Used when building seed lists from URL dumps, where entries that do not
/// parse are simply dropped.
pub fn domain_of(raw: &str) -> Option<String> {
    Url::parse(raw.trim())
        .ok()
        .as_ref()
        .and_then(extract_domain)
        .filter(|d| !d.is_empty())
}
